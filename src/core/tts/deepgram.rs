//! Deepgram Aura synthesizer.
//!
//! - Endpoint: `POST https://api.deepgram.com/v1/speak`
//! - Output: raw 8 kHz μ-law (`encoding=mulaw&sample_rate=8000&container=none`),
//!   which the media stream plays without conversion

use serde_json::json;

use super::base::{AudioEncoding, TTSConfig, TTSError, TTSResult};
use super::provider::{HttpSynthesizer, TTSRequestBuilder};

/// Deepgram TTS API endpoint
pub const DEEPGRAM_TTS_URL: &str = "https://api.deepgram.com/v1/speak";

/// Default Aura voice model
pub const DEFAULT_DEEPGRAM_TTS_MODEL: &str = "aura-asteria-en";

/// Request builder for Deepgram Aura
#[derive(Debug, Clone)]
pub struct DeepgramRequestBuilder {
    api_key: String,
    model: String,
    url: String,
}

impl TTSRequestBuilder for DeepgramRequestBuilder {
    fn build_http_request(&self, client: &reqwest::Client, text: &str) -> reqwest::RequestBuilder {
        client
            .post(&self.url)
            .query(&[
                ("model", self.model.as_str()),
                ("encoding", "mulaw"),
                ("sample_rate", "8000"),
                ("container", "none"),
            ])
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&json!({ "text": text }))
    }

    fn output_encoding(&self) -> AudioEncoding {
        AudioEncoding::Mulaw8k
    }

    fn provider_info(&self) -> &'static str {
        "Deepgram Aura TTS"
    }
}

/// Deepgram Aura synthesizer
pub type DeepgramTTS = HttpSynthesizer<DeepgramRequestBuilder>;

impl DeepgramTTS {
    pub fn from_config(config: TTSConfig) -> TTSResult<Self> {
        if config.api_key.is_empty() {
            return Err(TTSError::InvalidConfiguration(
                "API key is required for Deepgram TTS".to_string(),
            ));
        }
        let builder = DeepgramRequestBuilder {
            api_key: config.api_key.clone(),
            model: if config.model.is_empty() {
                DEFAULT_DEEPGRAM_TTS_MODEL.to_string()
            } else {
                config.model.clone()
            },
            url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEEPGRAM_TTS_URL.to_string()),
        };
        HttpSynthesizer::new(&config, builder)
    }
}
