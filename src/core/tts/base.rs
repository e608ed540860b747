use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

/// Error types for speech synthesis
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum TTSError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Unsupported output format: {0}")]
    UnsupportedOutputFormat(String),
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Provider error: {0}")]
    ProviderError(String),
    #[error("Audio generation failed: {0}")]
    AudioGenerationFailed(String),
}

pub type TTSResult<T> = Result<T, TTSError>;

/// Encoding of synthesized audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEncoding {
    /// 8 kHz G.711 μ-law, playable on the telephony leg as is
    Mulaw8k,
    /// Compressed wideband MP3
    Mp3,
}

impl AudioEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mulaw8k => "mulaw_8000",
            Self::Mp3 => "mp3",
        }
    }

    /// Whether the media stream can play this encoding without transcoding.
    pub fn is_telephony_ready(&self) -> bool {
        matches!(self, Self::Mulaw8k)
    }
}

/// Audio produced for one sentence
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAudio {
    pub data: Bytes,
    pub encoding: AudioEncoding,
}

/// Which configured synthesizer a deployment uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TtsProviderKind {
    /// Deepgram Aura, μ-law output
    #[default]
    Primary,
    /// ElevenLabs, MP3 output
    Secondary,
}

impl fmt::Display for TtsProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
        }
    }
}

impl FromStr for TtsProviderKind {
    type Err = TTSError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "primary" | "deepgram" => Ok(Self::Primary),
            "secondary" | "elevenlabs" => Ok(Self::Secondary),
            other => Err(TTSError::InvalidConfiguration(format!(
                "Unknown TTS provider '{other}' (expected primary or secondary)"
            ))),
        }
    }
}

/// Connection settings for an HTTP synthesizer
#[derive(Debug, Clone, PartialEq)]
pub struct TTSConfig {
    pub api_key: String,
    pub model: String,
    /// Voice identifier, required by providers that address voices by path
    pub voice_id: Option<String>,
    /// Override of the provider endpoint
    pub base_url: Option<String>,
    pub request_timeout: Duration,
}

impl Default for TTSConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: String::new(),
            voice_id: None,
            base_url: None,
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// Converts one sentence of text into audio
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> TTSResult<SynthesizedAudio>;

    /// Encoding every successful call returns
    fn output_encoding(&self) -> AudioEncoding;

    fn provider_info(&self) -> &'static str;
}
