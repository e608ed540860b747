//! Configuration module for the voice call gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Applying YAML overrides on top of the environment
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use voicecall_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use zeroize::Zeroize;

use crate::core::llm::{AnthropicConfig, DEFAULT_ANTHROPIC_MODEL, DEFAULT_MAX_TOKENS};
use crate::core::stt::STTConfig;
use crate::core::tts::{DEFAULT_DEEPGRAM_TTS_MODEL, SynthesizerSettings, TTSConfig, TtsProviderKind};
use crate::core::turn::{DEFAULT_DEBOUNCE, DEFAULT_MAX_TRANSCRIPT_ENTRIES, TurnConfig};

mod env;
mod merge;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

/// Default Deepgram model for live transcription of phone audio
pub const DEFAULT_STT_MODEL: &str = "nova-2-phonecall";

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains all configuration needed to run the gateway:
/// - Server settings (host, port, TLS)
/// - Provider credentials (Deepgram, ElevenLabs, Anthropic)
/// - Recognizer, synthesizer and model tuning
/// - Turn-taking tunables
/// - Call store location
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Provider API keys
    pub deepgram_api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_voice_id: Option<String>,
    pub anthropic_api_key: Option<String>,

    // Response generation
    pub anthropic_model: String,
    pub llm_max_tokens: u32,
    /// Lifetime of cached per-tenant model clients
    pub tenant_credentials_ttl_seconds: u64,

    // Speech synthesis
    pub tts_provider: TtsProviderKind,
    /// Play through the primary provider when the secondary one is selected
    pub tts_fallback_to_primary: bool,
    pub deepgram_tts_model: String,

    // Speech recognition
    pub deepgram_stt_model: String,
    pub stt_language: String,
    pub stt_endpointing_ms: u32,
    pub stt_utterance_end_ms: u32,

    // Turn taking
    pub turn_debounce_ms: u64,
    pub max_transcript_entries: usize,

    // Call store; in-memory when unset
    pub call_store_url: Option<String>,
    pub call_store_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            tls: None,
            deepgram_api_key: None,
            elevenlabs_api_key: None,
            elevenlabs_voice_id: None,
            anthropic_api_key: None,
            anthropic_model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            llm_max_tokens: DEFAULT_MAX_TOKENS,
            tenant_credentials_ttl_seconds: 300,
            tts_provider: TtsProviderKind::Primary,
            tts_fallback_to_primary: false,
            deepgram_tts_model: DEFAULT_DEEPGRAM_TTS_MODEL.to_string(),
            deepgram_stt_model: DEFAULT_STT_MODEL.to_string(),
            stt_language: "en-US".to_string(),
            stt_endpointing_ms: 300,
            stt_utterance_end_ms: 1000,
            turn_debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            max_transcript_entries: DEFAULT_MAX_TRANSCRIPT_ENTRIES,
            call_store_url: None,
            call_store_token: None,
        }
    }
}

/// Securely zero out sensitive credentials when ServerConfig is dropped
impl Drop for ServerConfig {
    fn drop(&mut self) {
        if let Some(ref mut key) = self.deepgram_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.elevenlabs_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.anthropic_api_key {
            key.zeroize();
        }
        if let Some(ref mut token) = self.call_store_token {
            token.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// The .env file is loaded into the environment in main.rs at startup, so
    /// actual environment variables take precedence over .env values.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = env::load_from_env()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Recognizer settings for every call
    pub fn stt_config(&self) -> STTConfig {
        STTConfig {
            api_key: self.deepgram_api_key.clone().unwrap_or_default(),
            model: self.deepgram_stt_model.clone(),
            language: self.stt_language.clone(),
            endpointing_ms: self.stt_endpointing_ms,
            utterance_end_ms: self.stt_utterance_end_ms,
            ..STTConfig::default()
        }
    }

    /// Primary and secondary synthesizer settings
    pub fn synthesizer_settings(&self) -> SynthesizerSettings {
        SynthesizerSettings {
            provider: self.tts_provider,
            fallback_to_primary: self.tts_fallback_to_primary,
            primary: TTSConfig {
                api_key: self.deepgram_api_key.clone().unwrap_or_default(),
                model: self.deepgram_tts_model.clone(),
                ..TTSConfig::default()
            },
            secondary: TTSConfig {
                api_key: self.elevenlabs_api_key.clone().unwrap_or_default(),
                voice_id: self.elevenlabs_voice_id.clone(),
                ..TTSConfig::default()
            },
        }
    }

    /// Default model client settings
    pub fn anthropic_config(&self) -> AnthropicConfig {
        AnthropicConfig {
            api_key: self.anthropic_api_key.clone().unwrap_or_default(),
            model: self.anthropic_model.clone(),
            max_tokens: self.llm_max_tokens,
            ..AnthropicConfig::default()
        }
    }

    pub fn turn_config(&self) -> TurnConfig {
        TurnConfig {
            debounce: Duration::from_millis(self.turn_debounce_ms),
            max_transcript_entries: self.max_transcript_entries,
        }
    }

    pub fn tenant_credentials_ttl(&self) -> Duration {
        Duration::from_secs(self.tenant_credentials_ttl_seconds)
    }
}
