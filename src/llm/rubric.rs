//! Rubric definitions and the bounded sub-score scorer

use crate::error::{Result, ScoringError};
use crate::llm::provider::{AnalysisRequest, QualitativeProvider};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const CV_TOTAL: f64 = 60.0;
const COVER_LETTER_TOTAL: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RubricKind {
    Cv,
    CoverLetter,
}

impl RubricKind {
    pub fn label(&self) -> &'static str {
        match self {
            RubricKind::Cv => "CV",
            RubricKind::CoverLetter => "Cover letter",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RubricCategory {
    pub key: &'static str,
    pub label: &'static str,
    pub ceiling: f64,
    /// Alternative keys providers are known to reply with
    pub aliases: &'static [&'static str],
}

impl RubricCategory {
    fn answers_to(&self, name: &str) -> bool {
        self.key == name || self.aliases.contains(&name)
    }
}

#[derive(Debug, Clone)]
pub struct Rubric {
    kind: RubricKind,
    total: f64,
    categories: Vec<RubricCategory>,
}

impl Rubric {
    pub fn cv() -> Self {
        Self {
            kind: RubricKind::Cv,
            total: CV_TOTAL,
            categories: vec![
                category("experience", "Relevant work experience", 20.0, &["work_experience"]),
                category("skills", "Skills match and technical expertise", 15.0, &["technical_skills"]),
                category("education", "Education qualifications", 10.0, &[]),
                category("progression", "Career progression and growth", 8.0, &["career_progression"]),
                category("achievements", "Professional achievements", 5.0, &[]),
                category("presentation", "Document quality and presentation", 2.0, &[]),
            ],
        }
    }

    pub fn cover_letter() -> Self {
        Self {
            kind: RubricKind::CoverLetter,
            total: COVER_LETTER_TOTAL,
            categories: vec![
                category("writing", "Writing quality and professionalism", 12.0, &["writing_quality"]),
                category("motivation", "Motivation and enthusiasm", 10.0, &[]),
                category("fit", "Company research and fit", 8.0, &["company_fit"]),
                category("examples", "Specific examples and achievements", 7.0, &[]),
                category("communication", "Communication skills", 3.0, &[]),
            ],
        }
    }

    pub fn kind(&self) -> RubricKind {
        self.kind
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn categories(&self) -> &[RubricCategory] {
        &self.categories
    }

    pub fn ceilings(&self) -> BTreeMap<String, f64> {
        self.categories
            .iter()
            .map(|c| (c.key.to_string(), c.ceiling))
            .collect()
    }

    /// Replace the category ceilings. Keys must match the rubric exactly and the
    /// ceilings must still add up to the rubric total.
    pub fn with_ceilings(mut self, ceilings: &BTreeMap<String, f64>) -> Result<Self> {
        let label = self.kind.label();

        for key in ceilings.keys() {
            if !self.categories.iter().any(|c| c.key == key) {
                return Err(ScoringError::configuration(format!(
                    "{} rubric has no category '{}'",
                    label, key
                )));
            }
        }

        for category in &mut self.categories {
            let ceiling = *ceilings.get(category.key).ok_or_else(|| {
                ScoringError::configuration(format!(
                    "{} rubric is missing category '{}'",
                    label, category.key
                ))
            })?;

            if !ceiling.is_finite() || ceiling < 0.0 {
                return Err(ScoringError::configuration(format!(
                    "{} rubric ceiling for '{}' must be a non-negative number",
                    label, category.key
                )));
            }
            category.ceiling = ceiling;
        }

        let sum: f64 = self.categories.iter().map(|c| c.ceiling).sum();
        if (sum - self.total).abs() > 1e-9 {
            return Err(ScoringError::configuration(format!(
                "{} rubric ceilings must sum to {}, got {}",
                label, self.total, sum
            )));
        }

        Ok(self)
    }
}

fn category(
    key: &'static str,
    label: &'static str,
    ceiling: f64,
    aliases: &'static [&'static str],
) -> RubricCategory {
    RubricCategory {
        key,
        label,
        ceiling,
        aliases,
    }
}

/// Awarded points per category key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreBreakdown(BTreeMap<String, f64>);

impl ScoreBreakdown {
    /// Conservative baseline: every category at zero
    pub fn zeroed(rubric: &Rubric) -> Self {
        Self(rubric.categories.iter().map(|c| (c.key.to_string(), 0.0)).collect())
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Free-form feedback that accompanies a breakdown
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualitativeFeedback {
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
    pub summary: String,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubScore {
    pub kind: RubricKind,
    pub score: f64,
    pub maximum: f64,
    pub breakdown: ScoreBreakdown,
    pub feedback: QualitativeFeedback,
    pub provider: String,
    pub degraded: bool,
}

/// Validate an untrusted provider reply against the rubric.
///
/// Accepts scores under `category_scores` or `breakdown`, keyed by category
/// key or a known alias, as numbers or numeric strings. Values are clamped
/// into `[0, ceiling]`.
pub fn validate_analysis(rubric: &Rubric, reply: &Value) -> Result<(ScoreBreakdown, QualitativeFeedback)> {
    let object = reply
        .as_object()
        .ok_or_else(|| ScoringError::invalid_input("analysis reply is not a JSON object"))?;

    let scores = object
        .get("category_scores")
        .or_else(|| object.get("breakdown"))
        .and_then(Value::as_object)
        .ok_or_else(|| ScoringError::invalid_input("analysis reply has no category_scores object"))?;

    let mut breakdown = BTreeMap::new();
    for category in rubric.categories() {
        let raw = scores
            .iter()
            .find(|(name, _)| category.answers_to(name))
            .map(|(_, value)| value)
            .ok_or_else(|| {
                ScoringError::invalid_input(format!("analysis reply is missing '{}'", category.key))
            })?;

        let value = numeric(raw).ok_or_else(|| {
            ScoringError::invalid_input(format!(
                "analysis value for '{}' is not a finite number: {}",
                category.key, raw
            ))
        })?;

        let clamped = value.clamp(0.0, category.ceiling);
        if clamped != value {
            debug!(
                "Clamped {} from {} into [0, {}]",
                category.key, value, category.ceiling
            );
        }
        breakdown.insert(category.key.to_string(), clamped);
    }

    Ok((ScoreBreakdown(breakdown), feedback_from(object)))
}

fn numeric(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;

    number.is_finite().then_some(number)
}

fn feedback_from(object: &Map<String, Value>) -> QualitativeFeedback {
    let strings = |keys: &[&str]| -> Vec<String> {
        keys.iter()
            .find_map(|key| object.get(*key).and_then(Value::as_array))
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    };

    QualitativeFeedback {
        strengths: strings(&["strengths"]),
        gaps: strings(&["gaps", "areas_for_improvement"]),
        summary: object
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string(),
        matched_skills: strings(&["matched_skills"]),
        missing_skills: strings(&["missing_skills"]),
    }
}

/// Scores one document kind against its rubric through a qualitative provider
pub struct RubricScorer {
    rubric: Rubric,
    provider: Arc<dyn QualitativeProvider>,
    timeout: Duration,
}

impl RubricScorer {
    pub fn new(rubric: Rubric, provider: Arc<dyn QualitativeProvider>, timeout: Duration) -> Self {
        Self {
            rubric,
            provider,
            timeout,
        }
    }

    pub fn rubric(&self) -> &Rubric {
        &self.rubric
    }

    /// Never fails: provider errors, timeouts and malformed replies all yield
    /// the zero baseline flagged as degraded.
    pub async fn score(&self, text: &str, job_text: Option<&str>) -> SubScore {
        let request = AnalysisRequest {
            rubric: &self.rubric,
            document: text,
            job_text,
        };

        let outcome = match tokio::time::timeout(self.timeout, self.provider.analyze(&request)).await {
            Ok(Ok(reply)) => validate_analysis(&self.rubric, &reply),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ScoringError::provider(format!(
                "{} did not answer within {:?}",
                self.provider.name(),
                self.timeout
            ))),
        };

        match outcome {
            Ok((breakdown, feedback)) => SubScore {
                kind: self.rubric.kind(),
                score: breakdown.total().min(self.rubric.total()),
                maximum: self.rubric.total(),
                breakdown,
                feedback,
                provider: self.provider.name().to_string(),
                degraded: false,
            },
            Err(e) => {
                warn!(
                    "{} analysis degraded, using zero baseline: {}",
                    self.rubric.kind().label(),
                    e
                );
                SubScore {
                    kind: self.rubric.kind(),
                    score: 0.0,
                    maximum: self.rubric.total(),
                    breakdown: ScoreBreakdown::zeroed(&self.rubric),
                    feedback: QualitativeFeedback::default(),
                    provider: self.provider.name().to_string(),
                    degraded: true,
                }
            }
        }
    }
}
