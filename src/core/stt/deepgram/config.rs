//! Configuration for the Deepgram live transcription API.

use std::time::Duration;

use url::Url;

use super::super::base::{STTConfig, STTError};

/// Default live transcription endpoint.
pub const DEEPGRAM_STT_URL: &str = "wss://api.deepgram.com/v1/listen";

/// The service drops sockets that stay silent for about ten seconds.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(5);

/// Deepgram-specific recognizer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DeepgramSTTConfig {
    /// Settings shared with the rest of the gateway
    pub base: STTConfig,
    /// WebSocket endpoint, overridable for tests and self-hosted deployments
    pub base_url: String,
    /// Quiet period after which a `KeepAlive` is sent
    pub keepalive_interval: Duration,
}

impl Default for DeepgramSTTConfig {
    fn default() -> Self {
        Self::from_base(STTConfig::default())
    }
}

impl DeepgramSTTConfig {
    pub fn from_base(base: STTConfig) -> Self {
        Self {
            base,
            base_url: DEEPGRAM_STT_URL.to_string(),
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build the streaming URL with every query parameter the session needs.
    pub fn build_websocket_url(&self) -> Result<Url, STTError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            STTError::ConfigurationError(format!("Invalid Deepgram URL {}: {e}", self.base_url))
        })?;

        let base = &self.base;
        url.query_pairs_mut()
            .append_pair("encoding", "linear16")
            .append_pair("sample_rate", &base.sample_rate.to_string())
            .append_pair("channels", &base.channels.to_string())
            .append_pair("model", &base.model)
            .append_pair("language", &base.language)
            .append_pair("punctuate", bool_param(base.punctuation))
            .append_pair("interim_results", bool_param(base.interim_results))
            .append_pair("vad_events", bool_param(base.vad_events))
            .append_pair("endpointing", &base.endpointing_ms.to_string())
            .append_pair("utterance_end_ms", &base.utterance_end_ms.to_string());

        Ok(url)
    }

    /// Value of the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("Token {}", self.base.api_key)
    }
}

#[inline]
fn bool_param(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}
