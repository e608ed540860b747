//! Anthropic Messages API integration.
//!
//! - [`messages`]: request body and server-sent stream events
//! - [`client`]: `AnthropicClient`, a [`ChatModel`](super::ChatModel) that
//!   streams reply text deltas

mod client;
mod messages;

pub use client::{
    ANTHROPIC_MESSAGES_URL, ANTHROPIC_VERSION, AnthropicClient, AnthropicConfig,
    DEFAULT_ANTHROPIC_MODEL, DEFAULT_MAX_TOKENS,
};
pub use messages::{ApiError, ContentDelta, MessagesRequest, StreamEvent};
