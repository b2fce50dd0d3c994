//! Configuration management for the candidate scorer

use crate::error::{Result, ScoringError};
use crate::llm::rubric::Rubric;
use crate::processing::combiner::CombinerWeights;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub embedding: EmbeddingConfig,
    pub qualitative: QualitativeConfig,
    pub rubric: RubricConfig,
    pub scoring: ScoringConfig,
    pub skills: SkillsConfig,
    pub workers: WorkerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// HuggingFace repo id or local folder of a Model2Vec model
    pub model: String,
    /// When false the local hashing vectorizer is used for every document
    pub enabled: bool,
    pub chunk_max_chars: usize,
    pub fallback_dimensions: usize,
    pub timeout_secs: u64,
    /// 0 disables the embedding cache
    pub cache_capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    Heuristic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualitativeConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub cv_excerpt_chars: usize,
    pub cover_letter_excerpt_chars: usize,
    pub job_excerpt_chars: usize,
}

/// Per-category point ceilings, keyed by category
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RubricConfig {
    pub cv: BTreeMap<String, f64>,
    pub cover_letter: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weight of the document-quality term when a job description is present
    pub quality_weight: f64,
    /// Weight of the semantic JD-match term
    pub jd_weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillsConfig {
    pub extra_skills: Vec<String>,
    pub similarity_threshold: f64,
    /// alias -> canonical skill name
    pub aliases: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub max_concurrent: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "minishlab/potion-base-8M".to_string(),
            enabled: true,
            chunk_max_chars: 5000,
            fallback_dimensions: 384,
            timeout_secs: 30,
            cache_capacity: 1024,
        }
    }
}

impl Default for QualitativeConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Gemini,
            model: "gemini-1.5-flash".to_string(),
            base_url: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 60,
            cv_excerpt_chars: 4000,
            cover_letter_excerpt_chars: 3000,
            job_excerpt_chars: 2000,
        }
    }
}

impl Default for RubricConfig {
    fn default() -> Self {
        Self {
            cv: Rubric::cv().ceilings(),
            cover_letter: Rubric::cover_letter().ceilings(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            quality_weight: 0.4,
            jd_weight: 0.6,
        }
    }
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            extra_skills: Vec::new(),
            similarity_threshold: 0.88,
            aliases: BTreeMap::new(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { max_concurrent: 3 }
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl QualitativeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

impl Config {
    /// Load from the user config dir, writing defaults on first run
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::from_path(&config_path)
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ScoringError::configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("candidate-scorer")
            .join("config.toml")
    }

    /// Startup checks. Any failure here is fatal before a single call is scored.
    pub fn validate(&self) -> Result<()> {
        self.cv_rubric()?;
        self.cover_letter_rubric()?;

        CombinerWeights::from_config(&self.scoring)?;

        if self.embedding.chunk_max_chars == 0 {
            return Err(ScoringError::configuration("embedding.chunk_max_chars must be > 0"));
        }
        if self.embedding.fallback_dimensions == 0 {
            return Err(ScoringError::configuration("embedding.fallback_dimensions must be > 0"));
        }
        if self.embedding.timeout_secs == 0 {
            return Err(ScoringError::configuration("embedding.timeout_secs must be > 0"));
        }
        if self.qualitative.timeout_secs == 0 {
            return Err(ScoringError::configuration("qualitative.timeout_secs must be > 0"));
        }
        if self.workers.max_concurrent == 0 {
            return Err(ScoringError::configuration("workers.max_concurrent must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.skills.similarity_threshold) {
            return Err(ScoringError::configuration("skills.similarity_threshold must be within [0, 1]"));
        }

        Ok(())
    }

    pub fn cv_rubric(&self) -> Result<Rubric> {
        Rubric::cv().with_ceilings(&self.rubric.cv)
    }

    pub fn cover_letter_rubric(&self) -> Result<Rubric> {
        Rubric::cover_letter().with_ceilings(&self.rubric.cover_letter)
    }
}
