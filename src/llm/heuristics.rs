//! Deterministic local rubric analysis
//!
//! Each category gets a fraction in [0, 1] from surface features of the text,
//! scaled by the ceiling of whatever rubric the request carries. The reply has
//! the same JSON shape a remote model is asked for.

use crate::error::Result;
use crate::llm::provider::{AnalysisRequest, QualitativeProvider};
use crate::llm::rubric::RubricKind;
use crate::processing::document::{Document, DocumentKind, SectionType};
use crate::processing::skill_matcher::{match_skills, SkillExtractor};
use crate::processing::text_processor::TextProcessor;
use async_trait::async_trait;
use chrono::Datelike;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

const SENIORITY_LEVELS: &[(&str, u8)] = &[
    ("intern", 1),
    ("trainee", 1),
    ("junior", 1),
    ("senior", 2),
    ("lead", 3),
    ("principal", 3),
    ("staff", 3),
    ("architect", 3),
    ("manager", 4),
    ("head", 4),
    ("director", 4),
    ("vp", 5),
    ("chief", 5),
    ("cto", 5),
    ("ceo", 5),
];

pub struct HeuristicProvider {
    skills: Arc<SkillExtractor>,
    processor: TextProcessor,
    explicit_years: Regex,
    year_range: Regex,
    quantified: Regex,
    doctorate: Regex,
    masters: Regex,
    bachelors: Regex,
    associate: Regex,
    motivation: Regex,
    action: Regex,
    company_focus: Regex,
    greeting: Regex,
    closing: Regex,
}

#[derive(Debug, Default)]
struct Evaluation {
    fractions: BTreeMap<&'static str, f64>,
    matched_skills: Vec<String>,
    missing_skills: Vec<String>,
}

impl HeuristicProvider {
    pub fn new(skills: Arc<SkillExtractor>) -> Self {
        let compile = |pattern: &str| Regex::new(pattern).expect("Invalid heuristic regex");

        Self {
            skills,
            processor: TextProcessor::new(),
            explicit_years: compile(r"(?i)\b(\d{1,2})\s*\+?\s*(?:years?|yrs?)\b"),
            year_range: compile(
                r"(?i)\b((?:19|20)\d{2})\s*(?:-|to)\s*((?:19|20)\d{2}|present|current|now)\b",
            ),
            quantified: compile(
                r"(?i)\d+(?:\.\d+)?\s?%|\$\s?\d[\d,]*(?:\.\d+)?\s?[kmb]?\b|\b\d+x\b|\b\d{2,}[\d,]*\+?\s+(?:users|customers|clients|engineers|people|projects|requests)\b",
            ),
            doctorate: compile(r"(?i)\b(?:phd|ph\.d|doctorate|doctoral)\b"),
            masters: compile(r"(?i)\b(?:master'?s|msc|m\.sc|mba|m\.eng)\b"),
            bachelors: compile(r"(?i)\b(?:bachelor'?s?|bsc|b\.sc|b\.eng|beng|b\.s\.|b\.a\.)"),
            associate: compile(r"(?i)\b(?:associate degree|diploma)\b"),
            motivation: compile(
                r"(?i)\b(?:excited|passionate|passion|eager|enthusiastic|motivated|thrilled|inspired|keen|drawn to|love)\b",
            ),
            action: compile(
                r"(?i)\b(?:for example|for instance|led|built|delivered|launched|designed|improved|reduced)\b",
            ),
            company_focus: compile(
                r"(?i)\byour (?:company|team|mission|organization|organisation|product|values)\b",
            ),
            greeting: compile(r"(?i)^\s*(?:dear|hello|hi|to whom)\b"),
            closing: compile(r"(?i)\b(?:sincerely|regards|best wishes|thank you|yours truly)\b"),
        }
    }

    fn evaluate_cv(&self, text: &str, job_text: Option<&str>) -> Evaluation {
        let doc = Document::new(text, DocumentKind::Resume);
        let normalized = self.processor.normalize_unicode(text);
        let mut eval = self.skill_gap(text, job_text);

        let years = self.years_of_experience(&normalized);
        let experience = (years.min(10.0) / 10.0) * 0.8 + section_bonus(&doc, SectionType::Experience, 0.2);

        let candidate_skills = self.skills.extract_skills(text);
        let skill_fraction = match job_text {
            Some(_) if !(eval.matched_skills.is_empty() && eval.missing_skills.is_empty()) => {
                let total = eval.matched_skills.len() + eval.missing_skills.len();
                eval.matched_skills.len() as f64 / total as f64
            }
            _ => candidate_skills.len().min(10) as f64 / 10.0,
        };
        let skills = skill_fraction * 0.8 + section_bonus(&doc, SectionType::Skills, 0.2);

        let degree = if self.doctorate.is_match(&normalized) {
            1.0
        } else if self.masters.is_match(&normalized) {
            0.8
        } else if self.bachelors.is_match(&normalized) {
            0.6
        } else if self.associate.is_match(&normalized) {
            0.4
        } else if doc.has_section(SectionType::Education) {
            0.3
        } else {
            0.0
        };
        let education = degree + section_bonus(&doc, SectionType::Certifications, 0.2);

        let levels = self.seniority_levels(&normalized);
        let highest = levels.iter().copied().max().unwrap_or(0);
        let progression = (levels.len() as f64 / 3.0) * 0.75 + if highest >= 3 { 0.25 } else { 0.0 };

        let achievements = self.quantified.find_iter(&normalized).count().min(5) as f64 / 5.0;

        let word_count = doc.metadata().word_count;
        let presentation = if doc.metadata().sections.len() >= 3 { 0.5 } else { 0.0 }
            + if (150..=1200).contains(&word_count) { 0.5 } else { 0.0 };

        eval.fractions = BTreeMap::from([
            ("experience", experience),
            ("skills", skills),
            ("education", education),
            ("progression", progression),
            ("achievements", achievements),
            ("presentation", presentation),
        ]);
        eval
    }

    fn evaluate_cover_letter(&self, text: &str, job_text: Option<&str>) -> Evaluation {
        let normalized = self.processor.normalize_unicode(text);
        let mut eval = self.skill_gap(text, job_text);

        let sentences = self.processor.split_sentences(&normalized);
        let words = normalized.split_whitespace().count();
        let avg_sentence = if sentences.is_empty() {
            0.0
        } else {
            words as f64 / sentences.len() as f64
        };
        let paragraphs = normalized
            .split("\n\n")
            .filter(|p| !p.trim().is_empty())
            .count();

        let sentence_shape = if sentences.is_empty() {
            0.0
        } else if (10.0..=25.0).contains(&avg_sentence) {
            0.5
        } else if (6.0..=35.0).contains(&avg_sentence) {
            0.3
        } else {
            0.1
        };
        let paragraph_shape = match paragraphs {
            0 | 1 => 0.0,
            2 => 0.15,
            _ => 0.25,
        };
        let length_shape = match words {
            150..=500 => 0.25,
            50..=149 | 501..=800 => 0.15,
            _ => 0.0,
        };
        let writing = sentence_shape + paragraph_shape + length_shape;

        let motivation = self.motivation.find_iter(&normalized).count().min(5) as f64 / 5.0;

        let fit = match job_text {
            Some(job) => {
                let total = eval.matched_skills.len() + eval.missing_skills.len();
                if total > 0 {
                    eval.matched_skills.len() as f64 / total as f64
                } else {
                    self.term_overlap(&normalized, job)
                }
            }
            None if self.company_focus.is_match(&normalized) => 0.5,
            None => 0.25,
        };

        let examples = (self.quantified.find_iter(&normalized).count().min(3) as f64 / 3.0) * 0.6
            + if self.action.is_match(&normalized) { 0.4 } else { 0.0 };

        let communication = [
            self.greeting.is_match(&normalized),
            self.closing.is_match(&normalized),
            !sentences.is_empty() && avg_sentence < 35.0,
        ]
        .iter()
        .filter(|hit| **hit)
        .count() as f64
            / 3.0;

        eval.fractions = BTreeMap::from([
            ("writing", writing),
            ("motivation", motivation),
            ("fit", fit),
            ("examples", examples),
            ("communication", communication),
        ]);
        eval
    }

    fn skill_gap(&self, text: &str, job_text: Option<&str>) -> Evaluation {
        let Some(job) = job_text else {
            return Evaluation::default();
        };

        let result = match_skills(&self.skills.extract_skills(text), &self.skills.extract_skills(job));
        Evaluation {
            fractions: BTreeMap::new(),
            matched_skills: result.matched.iter().map(str::to_string).collect(),
            missing_skills: result.missing.iter().map(str::to_string).collect(),
        }
    }

    /// Largest of any stated "N years" and the span of dated roles
    fn years_of_experience(&self, text: &str) -> f64 {
        let stated = self
            .explicit_years
            .captures_iter(text)
            .filter_map(|c| c[1].parse::<f64>().ok())
            .fold(0.0, f64::max);

        let current_year = chrono::Utc::now().year();
        let mut earliest = i32::MAX;
        let mut latest = i32::MIN;
        for caps in self.year_range.captures_iter(text) {
            let Ok(start) = caps[1].parse::<i32>() else {
                continue;
            };
            let end = caps[2].parse::<i32>().unwrap_or(current_year);
            if end >= start {
                earliest = earliest.min(start);
                latest = latest.max(end);
            }
        }

        let span = if latest >= earliest { (latest - earliest) as f64 } else { 0.0 };
        stated.max(span)
    }

    fn seniority_levels(&self, text: &str) -> HashSet<u8> {
        self.processor
            .tokenize(text)
            .iter()
            .filter_map(|token| {
                SENIORITY_LEVELS
                    .iter()
                    .find(|(title, _)| title == token)
                    .map(|(_, level)| *level)
            })
            .collect()
    }

    /// Share of distinctive job terms that also appear in the text
    fn term_overlap(&self, text: &str, job: &str) -> f64 {
        let job_terms: HashSet<String> = self
            .processor
            .tokenize(job)
            .into_iter()
            .filter(|t| t.chars().count() >= 5)
            .collect();
        if job_terms.is_empty() {
            return 0.0;
        }

        let text_terms: HashSet<String> = self.processor.tokenize(text).into_iter().collect();
        job_terms.intersection(&text_terms).count() as f64 / job_terms.len() as f64
    }
}

fn section_bonus(doc: &Document, section: SectionType, bonus: f64) -> f64 {
    if doc.has_section(section) {
        bonus
    } else {
        0.0
    }
}

#[async_trait]
impl QualitativeProvider for HeuristicProvider {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn analyze(&self, request: &AnalysisRequest<'_>) -> Result<Value> {
        let eval = match request.kind() {
            RubricKind::Cv => self.evaluate_cv(request.document, request.job_text),
            RubricKind::CoverLetter => self.evaluate_cover_letter(request.document, request.job_text),
        };

        let mut scores = Map::new();
        let mut strengths = Vec::new();
        let mut gaps = Vec::new();
        let mut awarded = 0.0;

        for category in request.rubric.categories() {
            let fraction = eval
                .fractions
                .get(category.key)
                .copied()
                .unwrap_or(0.0)
                .clamp(0.0, 1.0);
            let points = fraction * category.ceiling;
            awarded += points;
            scores.insert(category.key.to_string(), json!(points));

            if fraction >= 0.7 {
                strengths.push(format!("Strong {}", category.label.to_lowercase()));
            } else if fraction < 0.4 {
                gaps.push(format!("Limited evidence of {}", category.label.to_lowercase()));
            }
        }

        let summary = format!(
            "Heuristic {} assessment: {:.1} of {} points",
            request.kind().label().to_lowercase(),
            awarded,
            request.rubric.total()
        );

        Ok(json!({
            "category_scores": scores,
            "strengths": strengths,
            "gaps": gaps,
            "matched_skills": eval.matched_skills,
            "missing_skills": eval.missing_skills,
            "summary": summary,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SkillsConfig;
    use crate::llm::rubric::{validate_analysis, Rubric};

    const CV: &str = "Jane Doe\n\nSummary\nSenior backend engineer with 8 years of experience.\n\n\
Experience\nLead Engineer, Acme Corp (2019 - present)\nReduced latency by 40% and cut costs by $200k.\n\
Senior Engineer, Initech (2015 - 2019)\nBuilt services for 100000 users.\n\n\
Education\nMSc Computer Science\n\nSkills\nRust, Python, Kubernetes, PostgreSQL, Docker\n";

    const LETTER: &str = "Dear Hiring Manager,\n\nI am excited to apply for the backend role on your team. \
I am passionate about reliable distributed systems and eager to contribute.\n\n\
At Acme I led a migration that reduced latency by 40% for our customers. For example, I built a \
Rust service that handled twice the load.\n\nThank you for your consideration.\n\nSincerely,\nJane";

    fn provider() -> HeuristicProvider {
        let skills = SkillExtractor::new(&SkillsConfig::default()).unwrap();
        HeuristicProvider::new(Arc::new(skills))
    }

    async fn analyze(rubric: &Rubric, document: &str, job_text: Option<&str>) -> Value {
        let request = AnalysisRequest {
            rubric,
            document,
            job_text,
        };
        provider().analyze(&request).await.unwrap()
    }

    #[tokio::test]
    async fn test_cv_reply_passes_validation() {
        let rubric = Rubric::cv();
        let reply = analyze(&rubric, CV, None).await;
        let (breakdown, feedback) = validate_analysis(&rubric, &reply).unwrap();

        assert!(breakdown.total() > 30.0, "got {}", breakdown.total());
        assert!(breakdown.get("experience").unwrap() >= 16.0);
        assert_eq!(breakdown.get("education"), Some(8.0));
        assert!(!feedback.strengths.is_empty());
        assert!(feedback.summary.starts_with("Heuristic cv assessment"));
    }

    #[tokio::test]
    async fn test_cv_skill_gap_against_job() {
        let rubric = Rubric::cv();
        let reply = analyze(&rubric, CV, Some("We need Rust, Go and Kubernetes experience.")).await;
        let (_, feedback) = validate_analysis(&rubric, &reply).unwrap();

        assert_eq!(feedback.matched_skills, vec!["kubernetes", "rust"]);
        assert_eq!(feedback.missing_skills, vec!["go"]);
    }

    #[tokio::test]
    async fn test_cover_letter_reply_passes_validation() {
        let rubric = Rubric::cover_letter();
        let reply = analyze(&rubric, LETTER, None).await;
        let (breakdown, _) = validate_analysis(&rubric, &reply).unwrap();

        assert_eq!(breakdown.get("communication"), Some(3.0));
        assert!(breakdown.get("motivation").unwrap() > 5.0);
        assert!(breakdown.get("examples").unwrap() > 3.0);
        assert!(breakdown.total() <= 40.0);
    }

    #[tokio::test]
    async fn test_heuristics_are_deterministic() {
        let rubric = Rubric::cv();
        assert_eq!(analyze(&rubric, CV, None).await, analyze(&rubric, CV, None).await);
    }

    #[tokio::test]
    async fn test_sparse_text_scores_low() {
        let rubric = Rubric::cv();
        let reply = analyze(&rubric, "hello", None).await;
        let (breakdown, feedback) = validate_analysis(&rubric, &reply).unwrap();
        assert_eq!(breakdown.total(), 0.0);
        assert_eq!(feedback.gaps.len(), 6);
    }

    #[test]
    fn test_years_from_date_ranges() {
        let provider = provider();
        assert_eq!(provider.years_of_experience("Acme 2010 - 2015, Initech 2015 to 2020"), 10.0);
        assert_eq!(provider.years_of_experience("12+ years building systems"), 12.0);
    }
}
