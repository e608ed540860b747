//! Response generation.
//!
//! - [`ChatModel`]: streaming completion seam, implemented by
//!   [`AnthropicClient`]
//! - [`SentenceSegmenter`]: cuts the delta stream into speakable sentences
//! - [`ModelClientCache`]: per-tenant client resolution with a default

pub mod anthropic;
mod base;
mod client_cache;
mod segmenter;

pub use anthropic::{AnthropicClient, AnthropicConfig, DEFAULT_ANTHROPIC_MODEL, DEFAULT_MAX_TOKENS};
pub use base::{ChatMessage, ChatModel, ChatRole, LLMError, LLMResult, TextDeltaStream};
pub use client_cache::{
    CredentialFetcher, DEFAULT_CREDENTIALS_TTL, ModelClientCache, NoTenantCredentials,
    TenantCredentials,
};
pub use segmenter::{MIN_SEGMENT_CHARS, SentenceSegmenter};
