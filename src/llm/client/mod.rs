//! LLM client: validated text generation with bounded retries

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::LLMConfig;

pub mod gemini;
pub mod types;
pub mod utils;

pub use gemini::GeminiClient;
pub use types::{FinishReason, Generation, GenerationError, GenerativeModel, RetryOutcome};

/// Verdict on a single generation attempt
enum Attempt {
    Accepted(String),
    Rejected(String),
    Failed(GenerationError),
}

/// LLM client handle: one model backend plus the retry policy
#[derive(Clone)]
pub struct LLMClient {
    config: LLMConfig,
    model: Arc<dyn GenerativeModel>,
}

impl LLMClient {
    /// Create a client backed by the Gemini REST API
    pub fn new(config: &LLMConfig) -> Result<Self> {
        let model = GeminiClient::new(config)?;
        Ok(Self::with_model(config.clone(), Arc::new(model)))
    }

    /// Create a client over any backend
    pub fn with_model(config: LLMConfig, model: Arc<dyn GenerativeModel>) -> Self {
        Self { config, model }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Generate text for `prompt`, retrying until a response passes validation.
    ///
    /// Truncated, blocked and undersized responses wait the validation backoff;
    /// failed calls wait the shorter error backoff. Every attempt counts against
    /// `retry_attempts`, and no sleep follows the last one.
    pub async fn generate_validated(&self, prompt: &str) -> RetryOutcome {
        let max_retries = self.config.retry_attempts;
        let mut attempts = 0;

        while attempts < max_retries {
            attempts += 1;
            let backoff = match self.attempt(prompt).await {
                Attempt::Accepted(text) => {
                    info!(attempts, chars = text.len(), "Response accepted");
                    return RetryOutcome::Success { text, attempts };
                }
                Attempt::Rejected(reason) => {
                    warn!("{} (attempt {} / {})", reason, attempts, max_retries);
                    self.config.validation_backoff()
                }
                Attempt::Failed(err) => {
                    warn!(
                        "Model call failed (attempt {} / {}): {}",
                        attempts, max_retries, err
                    );
                    self.config.error_backoff()
                }
            };

            if attempts < max_retries {
                sleep(backoff).await;
            }
        }

        warn!("Giving up after {} attempts", attempts);
        RetryOutcome::Exhausted { attempts }
    }

    async fn attempt(&self, prompt: &str) -> Attempt {
        let generation = match self.model.generate(prompt).await {
            Ok(generation) => generation,
            Err(err) => return Attempt::Failed(err),
        };

        if generation.finish.is_rejected() {
            return Attempt::Rejected(format!(
                "Response rejected with finish reason {}",
                generation.finish
            ));
        }

        let chars = generation.text.chars().count();
        if chars < self.config.min_response_chars {
            return Attempt::Rejected(format!("Response too short ({} characters)", chars));
        }

        Attempt::Accepted(generation.text)
    }
}

async fn sleep(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
