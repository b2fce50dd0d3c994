//! Document embeddings: provider seam, chunk pooling and local fallback

use crate::config::EmbeddingConfig;
use crate::error::{Result, ScoringError};
use crate::processing::text_processor::TextProcessor;
use async_trait::async_trait;
use log::{debug, warn};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// Buckets each token contributes to in the hashing vectorizer
const FALLBACK_SPREAD: usize = 3;

/// External embedding capability. One call per chunk.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn embed_chunk(&self, text: &str) -> Result<Vec<f32>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingMode {
    Provider,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEmbedding {
    pub vector: Vec<f32>,
    pub mode: EmbeddingMode,
    pub chunks: usize,
}

impl DocumentEmbedding {
    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }

    pub fn is_fallback(&self) -> bool {
        self.mode == EmbeddingMode::Fallback
    }
}

/// Scale to unit length in place. Zero or non-finite magnitude yields the zero vector.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector
        .iter()
        .map(|v| f64::from(*v) * f64::from(*v))
        .sum::<f64>()
        .sqrt();

    if norm > 0.0 && norm.is_finite() {
        for v in vector.iter_mut() {
            *v = (f64::from(*v) / norm) as f32;
        }
    } else {
        vector.iter_mut().for_each(|v| *v = 0.0);
    }
}

/// Arithmetic mean of equally sized vectors, re-normalized to unit length
pub fn mean_pool(vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
    let dimensions = vectors.first()?.len();
    if dimensions == 0 || vectors.iter().any(|v| v.len() != dimensions) {
        return None;
    }

    let mut sums = vec![0.0f64; dimensions];
    for vector in vectors {
        for (sum, v) in sums.iter_mut().zip(vector) {
            *sum += f64::from(*v);
        }
    }

    let count = vectors.len() as f64;
    let mut pooled: Vec<f32> = sums.into_iter().map(|s| (s / count) as f32).collect();
    l2_normalize(&mut pooled);
    Some(pooled)
}

/// Deterministic term-frequency vectorizer used when no provider answers
pub struct FallbackVectorizer {
    dimensions: usize,
    processor: TextProcessor,
}

impl FallbackVectorizer {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            processor: TextProcessor::new(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in self.processor.tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut prefix = [0u8; 8];
            prefix.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_be_bytes(prefix) % self.dimensions as u64) as usize;

            for offset in 0..FALLBACK_SPREAD {
                vector[(bucket + offset) % self.dimensions] += 1.0;
            }
        }

        l2_normalize(&mut vector);
        vector
    }
}

/// Bounded chunk-embedding cache keyed by content hash. Performance only.
pub struct EmbeddingCache {
    inner: Cache<String, Vec<f32>>,
}

impl EmbeddingCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Cache::builder().max_capacity(capacity as u64).build(),
        }
    }

    pub fn key(provider: &str, chunk: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(provider.as_bytes());
        hasher.update([0u8]);
        hasher.update(chunk.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub async fn get(&self, key: &str) -> Option<Vec<f32>> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: String, vector: Vec<f32>) {
        self.inner.insert(key, vector).await;
    }

    /// Entry count once pending evictions have been applied
    pub async fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }
}

/// Turns whole documents into unit vectors, degrading to the local
/// vectorizer whenever the provider is absent or misbehaves.
pub struct EmbeddingAdapter {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    processor: TextProcessor,
    fallback: FallbackVectorizer,
    chunk_max_chars: usize,
    timeout: Duration,
    cache: Option<EmbeddingCache>,
}

impl EmbeddingAdapter {
    pub fn new(provider: Option<Arc<dyn EmbeddingProvider>>, config: &EmbeddingConfig) -> Self {
        let cache = (config.cache_capacity > 0).then(|| EmbeddingCache::new(config.cache_capacity));

        Self {
            provider,
            processor: TextProcessor::new(),
            fallback: FallbackVectorizer::new(config.fallback_dimensions),
            chunk_max_chars: config.chunk_max_chars.max(1),
            timeout: config.timeout(),
            cache,
        }
    }

    /// Adapter that always uses the local vectorizer
    pub fn offline(config: &EmbeddingConfig) -> Self {
        Self::new(None, config)
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn embed(&self, text: &str) -> DocumentEmbedding {
        let Some(provider) = self.provider.as_ref() else {
            return self.fallback_embedding(text);
        };

        match self.embed_with(provider.as_ref(), text).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Embedding provider {} degraded, using local vectorizer: {}", provider.name(), e);
                self.fallback_embedding(text)
            }
        }
    }

    /// Embed two documents so that the results are always comparable: if
    /// either side had to fall back, both are re-vectorized locally.
    pub async fn embed_pair(&self, a: &str, b: &str) -> (DocumentEmbedding, DocumentEmbedding) {
        let (first, second) = tokio::join!(self.embed(a), self.embed(b));

        if first.mode == second.mode && first.dimensions() == second.dimensions() {
            return (first, second);
        }

        debug!("Embedding modes diverged, re-vectorizing both documents locally");
        (self.fallback_embedding(a), self.fallback_embedding(b))
    }

    pub fn fallback_embedding(&self, text: &str) -> DocumentEmbedding {
        DocumentEmbedding {
            vector: self.fallback.vectorize(text),
            mode: EmbeddingMode::Fallback,
            chunks: 1,
        }
    }

    async fn embed_with(&self, provider: &dyn EmbeddingProvider, text: &str) -> Result<DocumentEmbedding> {
        let chunks = self.processor.chunk(text, self.chunk_max_chars)?;
        if chunks.is_empty() {
            return Err(ScoringError::invalid_input("nothing to embed in blank text"));
        }

        let mut vectors = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            vectors.push(self.embed_chunk(provider, chunk).await?);
        }

        let vector = mean_pool(&vectors).ok_or_else(|| {
            ScoringError::provider(format!(
                "{} returned chunk vectors of inconsistent dimension",
                provider.name()
            ))
        })?;

        Ok(DocumentEmbedding {
            vector,
            mode: EmbeddingMode::Provider,
            chunks: chunks.len(),
        })
    }

    async fn embed_chunk(&self, provider: &dyn EmbeddingProvider, chunk: &str) -> Result<Vec<f32>> {
        let key = self.cache.as_ref().map(|_| EmbeddingCache::key(provider.name(), chunk));
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(hit) = cache.get(key).await {
                return Ok(hit);
            }
        }

        let vector = tokio::time::timeout(self.timeout, provider.embed_chunk(chunk))
            .await
            .map_err(|_| {
                ScoringError::provider(format!(
                    "{} did not answer within {:?}",
                    provider.name(),
                    self.timeout
                ))
            })??;

        if vector.is_empty() || vector.iter().any(|v| !v.is_finite()) {
            return Err(ScoringError::provider(format!(
                "{} returned an empty or non-finite vector",
                provider.name()
            )));
        }

        if let (Some(cache), Some(key)) = (&self.cache, key) {
            cache.insert(key, vector.clone()).await;
        }
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Maps text onto a small vector from letter counts
    struct LetterProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for LetterProvider {
        fn name(&self) -> &str {
            "letters"
        }

        async fn embed_chunk(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut v = vec![0.0f32; 4];
            for c in text.chars().filter(|c| c.is_ascii_alphabetic()) {
                v[(c.to_ascii_lowercase() as usize) % 4] += 1.0;
            }
            Ok(v)
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl EmbeddingProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn embed_chunk(&self, _text: &str) -> Result<Vec<f32>> {
            Err(ScoringError::provider("connection refused"))
        }
    }

    struct HangingProvider;

    #[async_trait]
    impl EmbeddingProvider for HangingProvider {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn embed_chunk(&self, _text: &str) -> Result<Vec<f32>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(vec![1.0])
        }
    }

    /// Returns NaN for anything mentioning "poison"
    struct PickyProvider;

    #[async_trait]
    impl EmbeddingProvider for PickyProvider {
        fn name(&self) -> &str {
            "picky"
        }

        async fn embed_chunk(&self, text: &str) -> Result<Vec<f32>> {
            if text.contains("poison") {
                Ok(vec![f32::NAN, 1.0])
            } else {
                Ok(vec![1.0, 0.0])
            }
        }
    }

    fn config() -> EmbeddingConfig {
        EmbeddingConfig {
            chunk_max_chars: 20,
            fallback_dimensions: 64,
            ..EmbeddingConfig::default()
        }
    }

    fn magnitude(v: &[f32]) -> f64 {
        v.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt()
    }

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6 && (v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    fn test_mean_pool_requires_consistent_dimensions() {
        assert!(mean_pool(&[]).is_none());
        assert!(mean_pool(&[vec![1.0, 0.0], vec![1.0]]).is_none());

        let pooled = mean_pool(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        assert!((magnitude(&pooled) - 1.0).abs() < 1e-6);
        assert!((pooled[0] - pooled[1]).abs() < 1e-6);
    }

    #[test]
    fn test_fallback_vectorizer_is_deterministic_and_unit_length() {
        let vectorizer = FallbackVectorizer::new(384);
        let a = vectorizer.vectorize("Rust engineer with Kubernetes experience");
        let b = vectorizer.vectorize("Rust engineer with Kubernetes experience");

        assert_eq!(a, b);
        assert_eq!(a.len(), 384);
        assert!((magnitude(&a) - 1.0).abs() < 1e-6);
        assert_eq!(vectorizer.vectorize("   "), vec![0.0; 384]);
    }

    #[tokio::test]
    async fn test_cache_stays_within_capacity() {
        let cache = EmbeddingCache::new(2);
        for (i, key) in ["a", "b", "c", "d"].into_iter().enumerate() {
            cache.insert(key.to_string(), vec![i as f32]).await;
        }

        assert!(cache.entry_count().await <= 2);
        assert_ne!(EmbeddingCache::key("p", "chunk"), EmbeddingCache::key("q", "chunk"));
    }

    #[tokio::test]
    async fn test_cache_returns_stored_vector() {
        let cache = EmbeddingCache::new(8);
        cache.insert("k".to_string(), vec![0.5, 0.5]).await;

        assert_eq!(cache.get("k").await, Some(vec![0.5, 0.5]));
        assert_eq!(cache.get("missing").await, None);
    }

    #[tokio::test]
    async fn test_provider_embedding_is_pooled_and_normalized() {
        let provider = Arc::new(LetterProvider { calls: AtomicUsize::new(0) });
        let adapter = EmbeddingAdapter::new(Some(provider.clone()), &config());

        let embedding = adapter
            .embed("A fairly long sentence. Another one follows here.")
            .await;

        assert_eq!(embedding.mode, EmbeddingMode::Provider);
        assert!(embedding.chunks > 1);
        assert_eq!(embedding.dimensions(), 4);
        assert!((magnitude(&embedding.vector) - 1.0).abs() < 1e-6);
        assert_eq!(provider.calls.load(Ordering::SeqCst), embedding.chunks);
    }

    #[tokio::test]
    async fn test_cache_avoids_repeat_calls() {
        let provider = Arc::new(LetterProvider { calls: AtomicUsize::new(0) });
        let adapter = EmbeddingAdapter::new(Some(provider.clone()), &config());

        let first = adapter.embed("short text").await;
        let second = adapter.embed("short text").await;

        assert_eq!(first, second);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_provider_falls_back() {
        let adapter = EmbeddingAdapter::new(Some(Arc::new(FailingProvider)), &config());
        let embedding = adapter.embed("Rust engineer").await;

        assert!(embedding.is_fallback());
        assert_eq!(embedding.dimensions(), 64);
        assert_eq!(embedding, adapter.fallback_embedding("Rust engineer"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back() {
        let adapter = EmbeddingAdapter::new(Some(Arc::new(HangingProvider)), &config());
        assert!(adapter.embed("Rust engineer").await.is_fallback());
    }

    #[tokio::test]
    async fn test_absent_provider_uses_fallback() {
        let adapter = EmbeddingAdapter::offline(&config());
        assert!(!adapter.has_provider());
        assert!(adapter.embed("Rust engineer").await.is_fallback());
    }

    #[tokio::test]
    async fn test_pair_modes_are_reconciled() {
        let adapter = EmbeddingAdapter::new(Some(Arc::new(PickyProvider)), &config());
        let (cv, job) = adapter.embed_pair("clean resume", "poison job").await;

        assert!(cv.is_fallback());
        assert!(job.is_fallback());
        assert_eq!(cv.dimensions(), job.dimensions());
    }
}
