//! Crate-wide error type.
//!
//! Every fallible operation in `matchforge-core` returns a [`CoreError`], whose
//! variants map directly onto the error kinds a caller needs to branch on
//! (bad input vs. not-yet-ready vs. an upstream outage vs. a bug). HTTP
//! status mapping lives in the `matchforge-api` crate, not here — this type
//! stays transport-agnostic.

use thiserror::Error;

/// Errors surfaced by the matching & roadmap engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad input: unknown id, malformed `target_weeks`, wrong file type.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The document exists but `embedding_status != completed`.
    #[error("document {document_id} is not ready (status: {status})")]
    NotReady {
        document_id: String,
        status: String,
    },

    /// The embedder, LLM, or vector store failed after its own retries.
    #[error("upstream failure in {component}: {source}")]
    Upstream {
        component: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Schema/validation failure inside an LLM-backed component after a
    /// repair attempt. Feedback falls back to a deterministic summary;
    /// the roadmap planner propagates this.
    #[error("internal failure in {component}: {message}")]
    Internal {
        component: &'static str,
        message: String,
    },

    /// Vector store storage errors (sqlite-vec, schema, connection).
    #[error("storage error: {0}")]
    Storage(String),

    /// I/O errors reading configuration or catalog data.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failures that aren't an LLM-schema failure.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn upstream(
        component: &'static str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Upstream {
            component,
            source: Box::new(source),
        }
    }

    pub fn internal(component: &'static str, message: impl Into<String>) -> Self {
        Self::Internal {
            component,
            message: message.into(),
        }
    }

    /// `true` when this error is safe to retry at the caller's own cadence
    /// (i.e. it's an upstream hiccup, not a validation or logic bug).
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Upstream { .. } | Self::Storage(_))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
