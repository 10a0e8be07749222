//! Generative-text backend
//!
//! The assistant only needs "role-tagged messages in, text out". Retry with
//! exponential backoff lives here so every backend gets the same bounded loop.

use crate::error::GenerationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

pub mod gemini;
pub use gemini::GeminiClient;

/// Hard cap on backend invocations per reply
pub const MAX_LLM_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    System,
    Human,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::System,
            content: content.into(),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::Human,
            content: content.into(),
        }
    }
}

/// Trait for text generation (LLM controlled)
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, messages: &[PromptMessage]) -> Result<String, GenerationError>;
}

/// Bounded attempts with a doubling delay between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.clamp(1, MAX_LLM_ATTEMPTS),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the given failed attempt (1-based): base, 2×base, 4×base...
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(MAX_LLM_ATTEMPTS, Duration::from_secs(1))
    }
}

/// Call the backend until it succeeds, fails permanently, or attempts run out.
///
/// Returns the last error when no attempt succeeded.
pub async fn generate_with_retry(
    generator: &dyn TextGenerator,
    messages: &[PromptMessage],
    policy: RetryPolicy,
) -> Result<String, GenerationError> {
    let mut attempt = 1;

    loop {
        match generator.generate(messages).await {
            Ok(text) => {
                info!(attempt, "LLM response received");
                return Ok(text);
            }
            Err(e) if e.is_retryable() && attempt < policy.max_attempts() => {
                let delay = policy.delay_after(attempt);
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "LLM invoke attempt failed, backing off: {}",
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                warn!(attempt, "LLM invoke failed, giving up: {}", e);
                return Err(e);
            }
        }
    }
}
