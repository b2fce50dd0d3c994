//! Dictionary-based skill extraction and candidate/job skill matching

use crate::config::SkillsConfig;
use crate::error::{Result, ScoringError};
use aho_corasick::{AhoCorasick, MatchKind};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use strsim::jaro_winkler;

const DEFAULT_SKILLS: &[&str] = &[
    // Languages
    "python", "java", "javascript", "typescript", "c++", "c#", "ruby", "go", "rust",
    "kotlin", "swift", "scala", "php", "sql", "bash",
    // Frameworks and runtimes
    "react", "angular", "vue", "node.js", "django", "flask", "fastapi", "spring",
    "tensorflow", "pytorch",
    // Infrastructure
    "docker", "kubernetes", "aws", "azure", "gcp", "jenkins", "git", "ci/cd", "terraform",
    "linux",
    // Data
    "postgresql", "mysql", "mongodb", "redis", "elasticsearch", "kafka",
    // Practices and domains
    "machine learning", "deep learning", "ai", "data science", "rest api", "graphql",
    "microservices", "cloud computing", "devops", "agile", "scrum",
    // Soft skills
    "leadership", "communication", "project management", "mentoring",
];

const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("k8s", "kubernetes"),
    ("postgres", "postgresql"),
    ("golang", "go"),
    ("js", "javascript"),
    ("ts", "typescript"),
    ("nodejs", "node.js"),
    ("reactjs", "react"),
    ("react.js", "react"),
    ("vue.js", "vue"),
    ("ml", "machine learning"),
    ("amazon web services", "aws"),
    ("google cloud", "gcp"),
    ("restful api", "rest api"),
    ("spring boot", "spring"),
];

/// Case-fold, trim and collapse internal whitespace
pub fn normalize_skill(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillSet(BTreeSet<String>);

impl SkillSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, skill: &str) -> bool {
        let skill = normalize_skill(skill);
        !skill.is_empty() && self.0.insert(skill)
    }

    pub fn contains(&self, skill: &str) -> bool {
        self.0.contains(&normalize_skill(skill))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for SkillSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = SkillSet::new();
        for skill in iter {
            set.insert(skill.as_ref());
        }
        set
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillMatch {
    pub matched: SkillSet,
    pub missing: SkillSet,
}

/// `matched = candidate ∩ job`, `missing = job − candidate`
pub fn match_skills(candidate: &SkillSet, job: &SkillSet) -> SkillMatch {
    let (matched, missing): (Vec<&String>, Vec<&String>) =
        job.0.iter().partition(|skill| candidate.0.contains(*skill));

    SkillMatch {
        matched: SkillSet(matched.into_iter().cloned().collect()),
        missing: SkillSet(missing.into_iter().cloned().collect()),
    }
}

pub struct SkillExtractor {
    matcher: AhoCorasick,
    /// Canonical skill for each pattern id
    canonical: Vec<String>,
    dictionary: BTreeSet<String>,
    similarity_threshold: f64,
}

impl SkillExtractor {
    /// Built-in dictionary plus configured extras and aliases
    pub fn new(config: &SkillsConfig) -> Result<Self> {
        let skills = DEFAULT_SKILLS
            .iter()
            .map(|s| s.to_string())
            .chain(config.extra_skills.iter().cloned());

        let aliases = DEFAULT_ALIASES
            .iter()
            .map(|(alias, canonical)| (alias.to_string(), canonical.to_string()))
            .chain(config.aliases.iter().map(|(a, c)| (a.clone(), c.clone())));

        Self::with_dictionary(skills, aliases, config.similarity_threshold)
    }

    pub fn with_dictionary(
        skills: impl IntoIterator<Item = String>,
        aliases: impl IntoIterator<Item = (String, String)>,
        similarity_threshold: f64,
    ) -> Result<Self> {
        let mut surface_forms: BTreeMap<String, String> = BTreeMap::new();

        for skill in skills {
            let skill = normalize_skill(&skill);
            if !skill.is_empty() {
                surface_forms.insert(skill.clone(), skill);
            }
        }

        for (alias, canonical) in aliases {
            let (alias, canonical) = (normalize_skill(&alias), normalize_skill(&canonical));
            if alias.is_empty() || canonical.is_empty() {
                continue;
            }
            surface_forms.entry(canonical.clone()).or_insert_with(|| canonical.clone());
            surface_forms.insert(alias, canonical);
        }

        if surface_forms.is_empty() {
            return Err(ScoringError::configuration("Skill dictionary is empty"));
        }

        let (patterns, canonical): (Vec<String>, Vec<String>) = surface_forms.into_iter().unzip();
        let dictionary = canonical.iter().cloned().collect();

        let matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::Standard)
            .build(&patterns)
            .map_err(|e| ScoringError::configuration(format!("Failed to build skill matcher: {}", e)))?;

        debug!("Skill matcher built with {} patterns", patterns.len());

        Ok(Self {
            matcher,
            canonical,
            dictionary,
            similarity_threshold,
        })
    }

    /// Canonical skills known to the extractor
    pub fn skill_count(&self) -> usize {
        self.dictionary.len()
    }

    /// Dictionary hits that sit on word boundaries, mapped to canonical names
    pub fn extract_skills(&self, text: &str) -> SkillSet {
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut hits: Vec<(usize, usize, usize)> = self
            .matcher
            .find_overlapping_iter(&text)
            .filter(|mat| is_word_bounded(&text, mat.start(), mat.end()))
            .map(|mat| (mat.start(), mat.end(), mat.pattern().as_usize()))
            .collect();

        // Leftmost-longest among bounded hits only
        hits.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        let mut skills = SkillSet::new();
        let mut cursor = 0;
        for (start, end, pattern) in hits {
            if start >= cursor {
                skills.insert(&self.canonical[pattern]);
                cursor = end;
            }
        }

        skills
    }

    /// Near-miss spellings in the candidate text for each missing skill.
    ///
    /// Display only; never changes what counts as matched.
    pub fn suggest_similar(&self, missing: &SkillSet, candidate_text: &str) -> BTreeMap<String, Vec<String>> {
        let tokens: Vec<String> = candidate_text
            .split_whitespace()
            .map(|w| {
                w.trim_matches(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
                    .to_lowercase()
            })
            .filter(|w| !w.is_empty())
            .collect();

        let mut ngram_cache: HashMap<usize, Vec<String>> = HashMap::new();
        let mut suggestions = BTreeMap::new();

        for skill in missing.iter() {
            if skill.chars().count() < 3 {
                continue;
            }

            let width = skill.split(' ').count();
            let candidates = ngram_cache
                .entry(width)
                .or_insert_with(|| tokens.windows(width).map(|w| w.join(" ")).collect());

            let mut near: BTreeSet<String> = BTreeSet::new();
            for candidate in candidates.iter() {
                if candidate != skill && jaro_winkler(candidate, skill) >= self.similarity_threshold {
                    near.insert(candidate.clone());
                }
            }

            if !near.is_empty() {
                suggestions.insert(skill.to_string(), near.into_iter().collect());
            }
        }

        suggestions
    }
}

fn is_word_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();

    !before.map_or(false, char::is_alphanumeric) && !after.map_or(false, char::is_alphanumeric)
}
