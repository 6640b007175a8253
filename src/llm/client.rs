use async_trait::async_trait;
use thiserror::Error;

/// Failure of a single generation attempt. Every variant is retryable.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("failed to reach chat API: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("chat API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("chat API response has no message content: {0}")]
    MissingMessage(String),

    #[error("invalid annotation ({reason}): {reply}")]
    InvalidAnnotation { reason: String, reply: String },
}

/// A chat-completions endpoint taking a system instruction and a user message.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, GenerationError>;
}
