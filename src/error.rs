//! Error handling for the candidate scoring engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoringError {
    /// Caller supplied something the core refuses to guess about.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An external capability failed. Recovered inside the scoring pipeline.
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Scoring task was cancelled")]
    Cancelled,
}

impl ScoringError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        ScoringError::InvalidInput(msg.into())
    }

    pub fn provider(msg: impl Into<String>) -> Self {
        ScoringError::ProviderUnavailable(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        ScoringError::Configuration(msg.into())
    }

    /// True for failures the pipeline absorbs into degraded mode.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ScoringError::ProviderUnavailable(_) | ScoringError::Http(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScoringError>;

/// Model loaders report through anyhow; treat those as provider failures
impl From<anyhow::Error> for ScoringError {
    fn from(err: anyhow::Error) -> Self {
        ScoringError::ProviderUnavailable(err.to_string())
    }
}

impl From<toml::de::Error> for ScoringError {
    fn from(err: toml::de::Error) -> Self {
        ScoringError::Configuration(format!("Failed to parse config: {}", err))
    }
}
