//! Generic request/response plumbing shared by the HTTP synthesizers.
//!
//! A provider only describes how to build its request through
//! [`TTSRequestBuilder`]; [`HttpSynthesizer`] sends it, maps HTTP failures to
//! [`TTSError`] and returns the body as audio.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use super::base::{AudioEncoding, SpeechSynthesizer, SynthesizedAudio, TTSConfig, TTSError, TTSResult};

/// Provider-specific request construction
pub trait TTSRequestBuilder: Send + Sync {
    /// Build the HTTP request for one sentence
    fn build_http_request(&self, client: &reqwest::Client, text: &str) -> reqwest::RequestBuilder;

    fn output_encoding(&self) -> AudioEncoding;

    fn provider_info(&self) -> &'static str;
}

/// Synthesizer that performs one HTTP request per sentence
pub struct HttpSynthesizer<B> {
    client: reqwest::Client,
    request_builder: B,
}

impl<B: TTSRequestBuilder> HttpSynthesizer<B> {
    pub fn new(config: &TTSConfig, request_builder: B) -> TTSResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TTSError::InvalidConfiguration(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            request_builder,
        })
    }

    pub fn request_builder(&self) -> &B {
        &self.request_builder
    }
}

#[async_trait]
impl<B: TTSRequestBuilder> SpeechSynthesizer for HttpSynthesizer<B> {
    async fn synthesize(&self, text: &str) -> TTSResult<SynthesizedAudio> {
        let provider = self.request_builder.provider_info();
        debug!(provider, text_len = text.len(), "TTS synthesis request");

        let response = self
            .request_builder
            .build_http_request(&self.client, text)
            .send()
            .await
            .map_err(|e| TTSError::NetworkError(format!("{provider} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    TTSError::AuthenticationFailed(format!("{provider} rejected credentials: {error_text}"))
                }
                _ => TTSError::ProviderError(format!("{provider} API error {status}: {error_text}")),
            });
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| TTSError::NetworkError(format!("Failed to read {provider} audio: {e}")))?;
        if data.is_empty() {
            return Err(TTSError::AudioGenerationFailed(format!(
                "{provider} returned no audio"
            )));
        }

        debug!(provider, audio_bytes = data.len(), "TTS synthesis complete");
        Ok(SynthesizedAudio {
            data,
            encoding: self.request_builder.output_encoding(),
        })
    }

    fn output_encoding(&self) -> AudioEncoding {
        self.request_builder.output_encoding()
    }

    fn provider_info(&self) -> &'static str {
        self.request_builder.provider_info()
    }
}
