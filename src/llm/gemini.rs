//! Gemini qualitative analysis provider
//!
//! Sends the rendered rubric prompt to the `generateContent` endpoint and
//! returns the JSON object found in the first candidate's text.

use crate::config::QualitativeConfig;
use crate::error::{Result, ScoringError};
use crate::llm::prompts::{PromptParams, PromptTemplates};
use crate::llm::provider::{extract_json, AnalysisRequest, QualitativeProvider};
use crate::llm::rubric::RubricKind;
use crate::processing::text_processor::truncate_chars;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Excerpt lengths, in characters, sent to the model
#[derive(Debug, Clone, Copy)]
pub struct ExcerptLimits {
    pub cv: usize,
    pub cover_letter: usize,
    pub job: usize,
}

impl Default for ExcerptLimits {
    fn default() -> Self {
        Self {
            cv: 4000,
            cover_letter: 3000,
            job: 2000,
        }
    }
}

pub struct GeminiProvider {
    api_key: Option<String>,
    base_url: String,
    model: String,
    limits: ExcerptLimits,
    templates: PromptTemplates,
    http_client: Client,
}

impl GeminiProvider {
    pub fn new(
        api_key: Option<String>,
        base_url: Option<String>,
        model: String,
        limits: ExcerptLimits,
        http_client: Client,
    ) -> Self {
        let base_url = base_url
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Self {
            api_key,
            base_url,
            model,
            limits,
            templates: PromptTemplates::default(),
            http_client,
        }
    }

    pub fn from_config(config: &QualitativeConfig) -> Result<Self> {
        let http_client = Client::builder().timeout(config.timeout()).build()?;
        let limits = ExcerptLimits {
            cv: config.cv_excerpt_chars,
            cover_letter: config.cover_letter_excerpt_chars,
            job: config.job_excerpt_chars,
        };

        Ok(Self::new(
            config.api_key(),
            config.base_url.clone(),
            config.model.clone(),
            limits,
            http_client,
        ))
    }

    pub fn model(&self) -> &str {
        self.model.strip_prefix("models/").unwrap_or(&self.model)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model())
    }

    fn build_prompt(&self, request: &AnalysisRequest<'_>) -> String {
        let limit = match request.kind() {
            RubricKind::Cv => self.limits.cv,
            RubricKind::CoverLetter => self.limits.cover_letter,
        };

        let params = PromptParams {
            document: truncate_chars(request.document, limit),
            job: request.job_text.map(|job| truncate_chars(job, self.limits.job)),
        };

        self.templates.render(request.rubric, &params)
    }

    async fn generate(&self, api_key: &str, prompt: &str) -> Result<String> {
        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": 0.2
            }
        });

        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ScoringError::provider("Gemini request timed out")
                } else {
                    ScoringError::provider(format!("Gemini request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScoringError::provider(format!(
                "Gemini returned {}: {}",
                status,
                truncate_chars(&body, 200)
            )));
        }

        let body: Value = response.json().await?;
        body["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_string)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| ScoringError::provider("Gemini returned an empty response"))
    }
}

#[async_trait]
impl QualitativeProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn analyze(&self, request: &AnalysisRequest<'_>) -> Result<Value> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ScoringError::provider("Gemini API key is not configured"))?;

        let prompt = self.build_prompt(request);
        debug!(
            "Requesting {} analysis from {} ({} prompt chars)",
            request.kind().label(),
            self.model(),
            prompt.chars().count()
        );

        let reply = self.generate(api_key, &prompt).await?;
        extract_json(&reply)
    }
}
