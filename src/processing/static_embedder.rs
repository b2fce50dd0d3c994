//! Model2Vec static embedding provider

use crate::error::{Result, ScoringError};
use crate::processing::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use log::info;
use model2vec_rs::model::StaticModel;
use std::sync::Arc;
use std::time::Instant;

/// Loaded once and handed to the adapter; encoding runs on the blocking pool
pub struct StaticModelEmbedder {
    model: Arc<StaticModel>,
    model_name: String,
}

impl StaticModelEmbedder {
    /// Load from a local folder or a HuggingFace repo id
    pub fn load(repo_or_path: &str) -> Result<Self> {
        let start_time = Instant::now();
        info!("Loading Model2Vec embedding model: {}", repo_or_path);

        let model = StaticModel::from_pretrained(repo_or_path, None, None, None)
            .map_err(|e| ScoringError::provider(format!("Failed to load model {}: {}", repo_or_path, e)))?;

        info!("Model loaded in {:.2?}", start_time.elapsed());

        Ok(Self {
            model: Arc::new(model),
            model_name: repo_or_path.to_string(),
        })
    }

    /// `load` without blocking the runtime (the hub download can be slow)
    pub async fn load_async(repo_or_path: &str) -> Result<Self> {
        let repo_or_path = repo_or_path.to_string();
        tokio::task::spawn_blocking(move || Self::load(&repo_or_path))
            .await
            .map_err(|e| ScoringError::provider(format!("Model loading task failed: {}", e)))?
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[async_trait]
impl EmbeddingProvider for StaticModelEmbedder {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn embed_chunk(&self, text: &str) -> Result<Vec<f32>> {
        let model = Arc::clone(&self.model);
        let text = text.to_string();

        tokio::task::spawn_blocking(move || model.encode_single(&text))
            .await
            .map_err(|e| ScoringError::provider(format!("Embedding task failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_local_model_is_provider_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("no-such-model");
        std::fs::create_dir_all(&path).unwrap();

        let result = StaticModelEmbedder::load(path.to_str().unwrap());
        assert!(matches!(result, Err(ScoringError::ProviderUnavailable(_))));
    }
}
