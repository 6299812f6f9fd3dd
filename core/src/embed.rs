//! Embedder (spec §4.4).
//!
//! Maps chunk text to 1536-dim dense vectors, retrying transient upstream
//! failures with exponential backoff + jitter. Ordering of outputs always
//! matches inputs positionally — callers must be able to zip chunks with
//! their embeddings without re-sorting.

use async_trait::async_trait;
use rand::Rng;
use rig::embeddings::EmbeddingModel;
use std::time::Duration;

use crate::error::{CoreError, Result};

/// Model tag recorded on every chunk, so a future model swap is traceable
/// in stored data (spec §4.4).
pub const EMBEDDING_MODEL_TAG: &str = "text-embedding-3-small";
/// Dimensionality every embedding produced by this component must have.
pub const EMBEDDING_DIM: usize = 1536;

/// Exponential backoff schedule for a single chunk's embedding attempts.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            jitter: 0.20,
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let jitter_span = exp * self.jitter;
        let jittered = rand::rng().random_range((exp - jitter_span).max(0.0)..=(exp + jitter_span));
        Duration::from_secs_f64(jittered)
    }
}

/// Per-chunk embedding outcome: `Some` on success, `None` once the retry
/// budget is exhausted (the chunk's embedding stays null; its document's
/// ingestion marks `failed`).
pub type EmbeddingOutcome = Option<Vec<f32>>;

/// Abstraction over an embedding provider. Implementations may batch
/// internally; this trait's contract only requires positional ordering.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds a single batch with no retry; callers use [`embed_with_retry`]
    /// for the retried, per-chunk-resilient version.
    async fn embed_raw(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EmbedProviderError>;

    fn model_tag(&self) -> &'static str {
        EMBEDDING_MODEL_TAG
    }
}

/// Error surfaced by the underlying embedding provider before retry
/// handling is applied.
#[derive(Debug, thiserror::Error)]
#[error("embedding provider error: {0}")]
pub struct EmbedProviderError(pub String);

/// Embeds every text in `texts`, retrying each *batch attempt* with
/// exponential backoff. On exhaustion, every chunk in the batch resolves to
/// `None` rather than failing the whole call — callers own the decision of
/// whether a partial batch failure fails the document.
pub async fn embed_with_retry(
    embedder: &dyn Embedder,
    texts: &[String],
    policy: RetryPolicy,
) -> Vec<EmbeddingOutcome> {
    if texts.is_empty() {
        return Vec::new();
    }

    let mut attempt = 0u32;
    loop {
        match embedder.embed_raw(texts).await {
            Ok(vectors) => {
                return vectors.into_iter().map(Some).collect();
            }
            Err(err) => {
                attempt += 1;
                if attempt >= policy.max_attempts {
                    tracing::warn!(
                        attempts = attempt,
                        error = %err,
                        "embedding exhausted retry budget; chunks remain unembedded"
                    );
                    return vec![None; texts.len()];
                }
                let delay = policy.delay_for(attempt);
                tracing::debug!(attempt, ?delay, error = %err, "retrying embedding batch");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Wraps any `rig_core::embeddings::EmbeddingModel` (e.g. the OpenAI
/// provider configured with `text-embedding-3-small`) as an [`Embedder`].
pub struct RigEmbedder<M: EmbeddingModel> {
    model: M,
}

impl<M: EmbeddingModel> RigEmbedder<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }
}

#[async_trait]
impl<M: EmbeddingModel + Send + Sync> Embedder for RigEmbedder<M> {
    async fn embed_raw(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EmbedProviderError> {
        let documents = self
            .model
            .embed_texts(texts.iter().cloned())
            .await
            .map_err(|e| EmbedProviderError(e.to_string()))?;

        let mut out = Vec::with_capacity(documents.len());
        for embedding in documents {
            let vec: Vec<f32> = embedding.vec.into_iter().map(|v| v as f32).collect();
            if vec.len() != EMBEDDING_DIM {
                return Err(EmbedProviderError(format!(
                    "expected {}-dim embedding, got {}",
                    EMBEDDING_DIM,
                    vec.len()
                )));
            }
            out.push(vec);
        }
        Ok(out)
    }
}

/// Deterministic, network-free embedder for tests and local development —
/// hashes each text into a stable pseudo-embedding so repeated calls with
/// the same input produce identical vectors.
pub struct MockEmbedder {
    pub fail_until_attempt: Option<u32>,
    attempts: std::sync::atomic::AtomicU32,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            fail_until_attempt: None,
            attempts: std::sync::atomic::AtomicU32::new(0),
        }
    }

    /// Builds a mock that fails every attempt before `n`, to exercise the
    /// retry path deterministically.
    pub fn failing_until(n: u32) -> Self {
        Self {
            fail_until_attempt: Some(n),
            attempts: std::sync::atomic::AtomicU32::new(0),
        }
    }

    fn pseudo_embed(text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut vec = vec![0.0f32; EMBEDDING_DIM];
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();
        let mut state = seed;
        for slot in vec.iter_mut() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = ((state >> 33) as f64 / u32::MAX as f64) as f32 - 0.5;
        }
        vec
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed_raw(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EmbedProviderError> {
        let attempt = self
            .attempts
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
            + 1;
        if let Some(fail_until) = self.fail_until_attempt {
            if attempt < fail_until {
                return Err(EmbedProviderError(format!(
                    "mock transient failure on attempt {attempt}"
                )));
            }
        }
        Ok(texts.iter().map(|t| Self::pseudo_embed(t)).collect())
    }
}

/// Validates that a batch of embedding outcomes aligns positionally with
/// its inputs — used by the ingestion orchestrator to assert §8's
/// "Embedding alignment" invariant before persisting.
pub fn assert_positional_alignment(inputs: &[String], outcomes: &[EmbeddingOutcome]) -> Result<()> {
    if inputs.len() != outcomes.len() {
        return Err(CoreError::internal(
            "embedder",
            format!(
                "embedding count {} does not match input count {}",
                outcomes.len(),
                inputs.len()
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_embedder_is_deterministic() {
        let embedder = MockEmbedder::new();
        let texts = vec!["hello".to_string(), "world".to_string()];
        let a = embedder.embed_raw(&texts).await.unwrap();
        let b = embedder.embed_raw(&texts).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), EMBEDDING_DIM);
    }

    #[tokio::test]
    async fn different_text_yields_different_embedding() {
        let embedder = MockEmbedder::new();
        let texts = vec!["hello".to_string(), "goodbye".to_string()];
        let result = embedder.embed_raw(&texts).await.unwrap();
        assert_ne!(result[0], result[1]);
    }

    #[tokio::test]
    async fn retry_recovers_after_transient_failures() {
        let embedder = MockEmbedder::failing_until(3);
        let texts = vec!["a".to_string()];
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(1),
            ..Default::default()
        };
        let outcomes = embed_with_retry(&embedder, &texts, policy).await;
        assert!(outcomes[0].is_some());
    }

    #[tokio::test]
    async fn exhausted_retries_leave_embedding_null() {
        let embedder = MockEmbedder::failing_until(100);
        let texts = vec!["a".to_string(), "b".to_string()];
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            ..Default::default()
        };
        let outcomes = embed_with_retry(&embedder, &texts, policy).await;
        assert!(outcomes.iter().all(|o| o.is_none()));
    }

    #[tokio::test]
    async fn output_order_matches_input_order() {
        let embedder = MockEmbedder::new();
        let texts = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        let outcomes = embed_with_retry(&embedder, &texts, RetryPolicy::default()).await;
        assert_positional_alignment(&texts, &outcomes).unwrap();
        let direct = embedder.embed_raw(&texts).await.unwrap();
        for (outcome, direct_vec) in outcomes.iter().zip(direct.iter()) {
            assert_eq!(outcome.as_ref().unwrap(), direct_vec);
        }
    }
}
