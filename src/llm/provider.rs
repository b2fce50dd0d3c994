//! Qualitative analysis capability seam

use crate::config::{ProviderKind, QualitativeConfig};
use crate::error::{Result, ScoringError};
use crate::llm::gemini::GeminiProvider;
use crate::llm::heuristics::HeuristicProvider;
use crate::llm::rubric::{Rubric, RubricKind};
use crate::processing::skill_matcher::SkillExtractor;
use async_trait::async_trait;
use log::{info, warn};
use serde_json::Value;
use std::sync::Arc;

/// What a provider is asked to judge
#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest<'a> {
    pub rubric: &'a Rubric,
    pub document: &'a str,
    pub job_text: Option<&'a str>,
}

impl AnalysisRequest<'_> {
    pub fn kind(&self) -> RubricKind {
        self.rubric.kind()
    }
}

/// Given a document and optional job text, return a structured breakdown.
///
/// The reply is untrusted JSON; callers validate it against a rubric.
#[async_trait]
pub trait QualitativeProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn analyze(&self, request: &AnalysisRequest<'_>) -> Result<Value>;
}

pub fn build_provider(
    config: &QualitativeConfig,
    skills: Arc<SkillExtractor>,
) -> Result<Arc<dyn QualitativeProvider>> {
    match config.provider {
        ProviderKind::Gemini => {
            if config.api_key().is_none() {
                warn!(
                    "{} is not set; qualitative analysis will run degraded",
                    config.api_key_env
                );
            }
            info!("Using Gemini provider ({})", config.model);
            Ok(Arc::new(GeminiProvider::from_config(config)?))
        }
        ProviderKind::Heuristic => {
            info!("Using local heuristic provider");
            Ok(Arc::new(HeuristicProvider::new(skills)))
        }
    }
}

/// Pull a JSON object out of a model reply that may wrap it in markdown
/// fences or surrounding prose.
pub fn extract_json(reply: &str) -> Result<Value> {
    let mut text = reply.trim();

    if let Some(start) = text.find("```") {
        let fenced = &text[start + 3..];
        let fenced = fenced.strip_prefix("json").unwrap_or(fenced);
        if let Some(end) = fenced.find("```") {
            text = fenced[..end].trim();
        }
    }

    let start = text
        .find('{')
        .ok_or_else(|| ScoringError::provider("reply contains no JSON object"))?;
    let end = text
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| ScoringError::provider("reply contains an unterminated JSON object"))?;

    serde_json::from_str(&text[start..=end])
        .map_err(|e| ScoringError::provider(format!("reply is not valid JSON: {}", e)))
}
