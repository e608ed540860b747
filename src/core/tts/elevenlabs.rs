//! ElevenLabs synthesizer.
//!
//! - Endpoint: `POST https://api.elevenlabs.io/v1/text-to-speech/{voice_id}`
//! - Output: `mp3_44100_128`; the media stream cannot play this directly, see
//!   [`create_synthesizer`](super::create_synthesizer)

use serde_json::json;

use super::base::{AudioEncoding, TTSConfig, TTSError, TTSResult};
use super::provider::{HttpSynthesizer, TTSRequestBuilder};

/// ElevenLabs TTS API base endpoint
pub const ELEVENLABS_TTS_URL: &str = "https://api.elevenlabs.io/v1/text-to-speech";

pub const DEFAULT_ELEVENLABS_MODEL: &str = "eleven_turbo_v2_5";

const OUTPUT_FORMAT: &str = "mp3_44100_128";

/// Request builder for ElevenLabs
#[derive(Debug, Clone)]
pub struct ElevenLabsRequestBuilder {
    api_key: String,
    model: String,
    url: String,
}

impl TTSRequestBuilder for ElevenLabsRequestBuilder {
    fn build_http_request(&self, client: &reqwest::Client, text: &str) -> reqwest::RequestBuilder {
        client
            .post(&self.url)
            .query(&[("output_format", OUTPUT_FORMAT)])
            .header("xi-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .header("Accept", "audio/mpeg")
            .json(&json!({
                "text": text,
                "model_id": self.model,
            }))
    }

    fn output_encoding(&self) -> AudioEncoding {
        AudioEncoding::Mp3
    }

    fn provider_info(&self) -> &'static str {
        "ElevenLabs TTS"
    }
}

/// ElevenLabs synthesizer
pub type ElevenLabsTTS = HttpSynthesizer<ElevenLabsRequestBuilder>;

impl ElevenLabsTTS {
    pub fn from_config(config: TTSConfig) -> TTSResult<Self> {
        if config.api_key.is_empty() {
            return Err(TTSError::InvalidConfiguration(
                "API key is required for ElevenLabs TTS".to_string(),
            ));
        }
        let voice_id = config
            .voice_id
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                TTSError::InvalidConfiguration("Voice ID is required for ElevenLabs TTS".to_string())
            })?;
        let base = config
            .base_url
            .as_deref()
            .unwrap_or(ELEVENLABS_TTS_URL)
            .trim_end_matches('/');

        let builder = ElevenLabsRequestBuilder {
            api_key: config.api_key.clone(),
            model: if config.model.is_empty() {
                DEFAULT_ELEVENLABS_MODEL.to_string()
            } else {
                config.model.clone()
            },
            url: format!("{base}/{voice_id}"),
        };
        HttpSynthesizer::new(&config, builder)
    }
}
