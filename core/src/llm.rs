//! LLM client abstraction shared by [`crate::feedback`] and [`crate::roadmap`].
//!
//! Both callers need the same shape: a system preamble, a user prompt, and
//! back a single text completion they then parse as JSON. Grounded in the
//! `rig::completion::CompletionModel` usage pattern (`completion_request`
//! builder, `preamble`, `temperature`, `.completion().await`) already present
//! in this workspace's example binaries.

use async_trait::async_trait;
use rig::completion::{CompletionModel, Message};

use crate::error::{CoreError, Result};

/// Per-call timeout for LLM requests (spec §5: 120s, "the roadmap planner
/// is the slowest").
pub const LLM_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(120);

/// Abstraction over a single-turn, text-in/text-out completion call.
/// Implementations own retry/timeout policy for their own transport; this
/// trait's contract is just "best-effort single completion, or an error".
#[async_trait]
pub trait Llm: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Wraps any `rig::completion::CompletionModel` (e.g. an OpenAI chat model)
/// as an [`Llm`].
pub struct RigLlm<M: CompletionModel> {
    model: M,
    temperature: f64,
}

impl<M: CompletionModel> RigLlm<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            temperature: 0.2,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl<M: CompletionModel + Send + Sync> Llm for RigLlm<M> {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = self
            .model
            .completion_request(Message::user(user_prompt.to_string()))
            .preamble(system_prompt.to_string())
            .temperature(self.temperature)
            .build();

        let response = tokio::time::timeout(LLM_TIMEOUT, self.model.completion(request))
            .await
            .map_err(|_| CoreError::upstream("llm", TimeoutError))?
            .map_err(|e| CoreError::upstream("llm", LlmProviderError(e.to_string())))?;

        let text = response
            .choice
            .into_iter()
            .map(|choice| format!("{choice:?}"))
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            return Err(CoreError::internal("llm", "provider returned an empty completion"));
        }
        Ok(text)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("llm request timed out")]
struct TimeoutError;

#[derive(Debug, thiserror::Error)]
#[error("llm provider error: {0}")]
struct LlmProviderError(String);

/// Deterministic, network-free LLM for tests: returns a fixed response
/// regardless of prompt, or replays a scripted sequence of responses (one
/// per call) when the caller needs to exercise the repair-retry path.
pub struct MockLlm {
    responses: std::sync::Mutex<std::collections::VecDeque<String>>,
}

impl MockLlm {
    pub fn always(response: impl Into<String>) -> Self {
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(response.into());
        Self {
            responses: std::sync::Mutex::new(queue),
        }
    }

    /// Replays `responses` in order, one per `complete` call; the last
    /// response repeats once the queue is drained.
    pub fn sequence(responses: Vec<String>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses.into()),
        }
    }
}

#[async_trait]
impl Llm for MockLlm {
    async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        let mut queue = self.responses.lock().expect("mock llm mutex poisoned");
        if queue.len() > 1 {
            Ok(queue.pop_front().unwrap())
        } else {
            Ok(queue.front().cloned().unwrap_or_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_llm_always_returns_the_same_response() {
        let llm = MockLlm::always(r#"{"ok":true}"#);
        let a = llm.complete("system", "user").await.unwrap();
        let b = llm.complete("system", "user").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn mock_llm_sequence_replays_in_order_then_sticks() {
        let llm = MockLlm::sequence(vec!["first".into(), "second".into()]);
        assert_eq!(llm.complete("s", "u").await.unwrap(), "first");
        assert_eq!(llm.complete("s", "u").await.unwrap(), "second");
        assert_eq!(llm.complete("s", "u").await.unwrap(), "second");
    }
}
