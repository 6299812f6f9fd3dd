//! Process configuration (spec §6 "Environment").
//!
//! Read once at boot from the environment (via `dotenvy`, so a local `.env`
//! works the same as a deployed environment) and validated with the
//! `validator` crate as a typed config struct. Config errors are fatal at
//! startup — logged and the process exits non-zero, never silently
//! defaulted for a secret.

use serde::Deserialize;
use validator::Validate;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid environment variable {key}: {message}")]
    Invalid { key: &'static str, message: String },
    #[error("configuration failed validation: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Typed, validated process configuration. Never `Debug`-printed in full —
/// [`Config::redacted_summary`] is what gets logged.
#[derive(Clone, Deserialize, Validate)]
pub struct Config {
    /// API key for the LLM provider behind [`matchforge_core::llm::Llm`].
    #[validate(length(min = 1))]
    pub llm_api_key: String,

    /// Vector-store connection string. The bundled sqlite-vec backend
    /// treats this as a filesystem path (or `:memory:`); a pgvector/Supabase
    /// backend would treat it as a connection URL instead.
    #[validate(length(min = 1))]
    pub vector_store_url: String,

    /// Service key for the vector store, where the backend needs one.
    /// Optional because the bundled sqlite backend doesn't.
    pub vector_store_service_key: Option<String>,

    /// Comma-separated CORS origin allow-list; `*` permits any origin.
    pub cors_allowed_origins: String,

    /// Address the HTTP server binds to.
    pub bind_address: String,

    /// Chat-completion model name passed to the LLM provider.
    pub llm_model: String,
}

impl Config {
    /// Loads configuration from the process environment (after attempting
    /// to load a `.env` file, ignoring its absence). Fatal on any missing
    /// or invalid required value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let llm_api_key = require_env("LLM_API_KEY")?;
        let vector_store_url = require_env("VECTOR_STORE_URL")?;
        let vector_store_service_key = std::env::var("VECTOR_STORE_SERVICE_KEY").ok();
        let cors_allowed_origins =
            std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let llm_model = std::env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let config = Self {
            llm_api_key,
            vector_store_url,
            vector_store_service_key,
            cors_allowed_origins,
            bind_address,
            llm_model,
        };
        config.validate()?;
        Ok(config)
    }

    /// The parsed allow-list, or `None` if every origin is permitted.
    pub fn cors_origins(&self) -> Option<Vec<String>> {
        if self.cors_allowed_origins.trim() == "*" {
            return None;
        }
        Some(
            self.cors_allowed_origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }

    /// A log-safe summary — secrets never appear, only presence/absence and
    /// non-sensitive shape (spec §6: "Never logs secrets").
    pub fn redacted_summary(&self) -> String {
        format!(
            "bind_address={}, cors_allowed_origins={}, llm_model={}, vector_store_url_len={}, \
             vector_store_service_key_present={}, llm_api_key_present={}",
            self.bind_address,
            self.cors_allowed_origins,
            self.llm_model,
            self.vector_store_url.len(),
            self.vector_store_service_key.is_some(),
            !self.llm_api_key.is_empty(),
        )
    }
}

fn require_env(key: &'static str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        Ok(_) => Err(ConfigError::Invalid {
            key,
            message: "must not be empty".to_string(),
        }),
        Err(_) => Err(ConfigError::Missing(key)),
    }
}
