//! Anthropic Messages API streaming client.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use reqwest::StatusCode;
use tracing::{debug, warn};

use super::messages::{ContentDelta, ErrorResponse, MessagesRequest, StreamEvent};
use crate::core::llm::base::{ChatMessage, ChatModel, LLMError, LLMResult, TextDeltaStream};

// =============================================================================
// Constants
// =============================================================================

/// Messages API endpoint
pub const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-latest";

pub const DEFAULT_MAX_TOKENS: u32 = 300;

/// Time allowed until response headers arrive
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub url: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            url: ANTHROPIC_MESSAGES_URL.to_string(),
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// Streaming Messages API client bound to one API key.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    config: AnthropicConfig,
}

impl AnthropicClient {
    pub fn new(config: AnthropicConfig) -> LLMResult<Self> {
        if config.api_key.is_empty() {
            return Err(LLMError::ConfigurationError(
                "API key is required for Anthropic".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .connect_timeout(RESPONSE_TIMEOUT)
            .build()
            .map_err(|e| LLMError::ConfigurationError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &AnthropicConfig {
        &self.config
    }
}

#[async_trait]
impl ChatModel for AnthropicClient {
    async fn stream_completion(
        &self,
        system: &str,
        messages: &[ChatMessage],
    ) -> LLMResult<TextDeltaStream> {
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system,
            messages,
            stream: true,
        };

        debug!(
            model = %self.config.model,
            messages = messages.len(),
            "Starting Anthropic completion"
        );

        let response = tokio::time::timeout(
            RESPONSE_TIMEOUT,
            self.http
                .post(&self.config.url)
                .header("x-api-key", &self.config.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request)
                .send(),
        )
        .await
        .map_err(|_| LLMError::NetworkError("Timed out waiting for Anthropic".to_string()))?
        .map_err(|e| LLMError::NetworkError(format!("Anthropic request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, body));
        }

        Ok(Box::pin(sse_text_deltas(response.bytes_stream())))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

fn map_http_error(status: StatusCode, body: String) -> LLMError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LLMError::AuthenticationFailed(message),
        StatusCode::TOO_MANY_REQUESTS => LLMError::RateLimited(message),
        _ => LLMError::ProviderError(format!("Anthropic API error {status}: {message}")),
    }
}

/// Turn an SSE byte stream into reply text deltas.
///
/// Ends after `message_stop` or when the body ends. An `error` event is
/// yielded as an error item and ends the stream.
pub(crate) fn sse_text_deltas<S, E>(byte_stream: S) -> impl Stream<Item = LLMResult<String>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    async_stream::stream! {
        let mut byte_stream = Box::pin(byte_stream);
        let mut buf = BytesMut::new();

        while let Some(chunk) = byte_stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(LLMError::NetworkError(format!("Anthropic stream interrupted: {e}")));
                    return;
                }
            };
            buf.extend_from_slice(&chunk);

            while let Some(line_end) = buf.iter().position(|b| *b == b'\n') {
                let line = buf.split_to(line_end + 1);
                let line = String::from_utf8_lossy(&line);
                let Some(data) = line.trim().strip_prefix("data:") else {
                    continue;
                };

                match serde_json::from_str::<StreamEvent>(data.trim()) {
                    Ok(StreamEvent::ContentBlockDelta {
                        delta: ContentDelta::TextDelta { text },
                    }) => {
                        if !text.is_empty() {
                            yield Ok(text);
                        }
                    }
                    Ok(StreamEvent::MessageStop) => return,
                    Ok(StreamEvent::Error { error }) => {
                        yield Err(LLMError::ProviderError(format!(
                            "{}: {}",
                            error.error_type, error.message
                        )));
                        return;
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Failed to parse Anthropic stream event: {}", e),
                }
            }
        }
    }
}
