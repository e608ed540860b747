use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

/// Error types for language model calls
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum LLMError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Rate limited: {0}")]
    RateLimited(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Provider error: {0}")]
    ProviderError(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub type LLMResult<T> = Result<T, LLMError>;

/// Author of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry of the history sent to the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Incremental reply text as it is generated
pub type TextDeltaStream = Pin<Box<dyn Stream<Item = LLMResult<String>> + Send>>;

/// Streaming chat completion
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Start a completion for `messages` under `system`.
    ///
    /// Errors before the first delta (authentication, rate limits) are
    /// returned directly; errors mid-stream arrive as stream items.
    async fn stream_completion(
        &self,
        system: &str,
        messages: &[ChatMessage],
    ) -> LLMResult<TextDeltaStream>;

    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serialization() {
        let message = ChatMessage::assistant("Hi, this is Ava.");
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            serde_json::json!({"role": "assistant", "content": "Hi, this is Ava."})
        );
    }
}
