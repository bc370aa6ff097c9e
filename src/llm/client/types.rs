use async_trait::async_trait;
use thiserror::Error;

/// Why the model stopped producing output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    /// Output was cut off at the token limit
    MaxTokens,
    /// Output was withheld by a safety filter
    Safety,
    Other(String),
}

impl FinishReason {
    /// Map a Gemini `finishReason` value
    pub fn from_api(value: Option<&str>) -> Self {
        match value {
            None | Some("STOP") | Some("FINISH_REASON_UNSPECIFIED") => FinishReason::Stop,
            Some("MAX_TOKENS") => FinishReason::MaxTokens,
            Some("SAFETY") => FinishReason::Safety,
            Some(other) => FinishReason::Other(other.to_string()),
        }
    }

    /// Truncated or blocked output is never accepted
    pub fn is_rejected(&self) -> bool {
        matches!(self, FinishReason::MaxTokens | FinishReason::Safety)
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FinishReason::Stop => write!(f, "STOP"),
            FinishReason::MaxTokens => write!(f, "MAX_TOKENS"),
            FinishReason::Safety => write!(f, "SAFETY"),
            FinishReason::Other(other) => write!(f, "{}", other),
        }
    }
}

/// Text and completion metadata of one model call
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub finish: FinishReason,
}

impl Generation {
    pub fn new(text: impl Into<String>, finish: FinishReason) -> Self {
        Self {
            text: text.into(),
            finish,
        }
    }
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(String),
}

/// Final state of a validated generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    Success { text: String, attempts: u32 },
    Exhausted { attempts: u32 },
}

/// One-shot text generation backend
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Generation, GenerationError>;

    /// Model identifier for logs
    fn name(&self) -> &str;
}
