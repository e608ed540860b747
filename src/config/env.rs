use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::{ServerConfig, TlsConfig};
use crate::core::tts::TtsProviderKind;

/// Read a variable, treating empty values as unset
pub(super) fn env_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parse a variable, falling back to `default` when unset
pub(super) fn parse_env<T>(key: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| format!("Invalid value for {key} ({raw}): {e}").into()),
        None => Ok(default),
    }
}

/// Parse a boolean flag ("true"/"false", "1"/"0", "yes"/"no")
pub(super) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_env_bool(key: &str, default: bool) -> Result<bool, Box<dyn std::error::Error>> {
    match env_var(key) {
        Some(raw) => parse_bool(&raw)
            .ok_or_else(|| format!("Invalid value for {key} ({raw}): expected true or false").into()),
        None => Ok(default),
    }
}

/// Build a configuration from environment variables and defaults
pub(super) fn load_from_env() -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let defaults = ServerConfig::default();

    let tls = match (env_var("TLS_CERT_PATH"), env_var("TLS_KEY_PATH")) {
        (Some(cert_path), Some(key_path)) => Some(TlsConfig {
            cert_path: PathBuf::from(cert_path),
            key_path: PathBuf::from(key_path),
        }),
        (None, None) => None,
        _ => {
            return Err("TLS_CERT_PATH and TLS_KEY_PATH must be set together".into());
        }
    };

    let tts_provider = match env_var("TTS_PROVIDER") {
        Some(raw) => raw
            .parse::<TtsProviderKind>()
            .map_err(|e| format!("Invalid value for TTS_PROVIDER: {e}"))?,
        None => defaults.tts_provider,
    };

    let mut config = ServerConfig::default();
    config.host = env_var("HOST").unwrap_or_else(|| defaults.host.clone());
    config.port = parse_env("PORT", defaults.port)?;
    config.tls = tls;

    config.deepgram_api_key = env_var("DEEPGRAM_API_KEY");
    config.elevenlabs_api_key = env_var("ELEVENLABS_API_KEY");
    config.elevenlabs_voice_id = env_var("ELEVENLABS_VOICE_ID");
    config.anthropic_api_key = env_var("ANTHROPIC_API_KEY");

    config.anthropic_model =
        env_var("ANTHROPIC_MODEL").unwrap_or_else(|| defaults.anthropic_model.clone());
    config.llm_max_tokens = parse_env("LLM_MAX_TOKENS", defaults.llm_max_tokens)?;
    config.tenant_credentials_ttl_seconds = parse_env(
        "TENANT_CREDENTIALS_TTL_SECONDS",
        defaults.tenant_credentials_ttl_seconds,
    )?;

    config.tts_provider = tts_provider;
    config.tts_fallback_to_primary =
        parse_env_bool("TTS_FALLBACK_TO_PRIMARY", defaults.tts_fallback_to_primary)?;
    config.deepgram_tts_model =
        env_var("DEEPGRAM_TTS_MODEL").unwrap_or_else(|| defaults.deepgram_tts_model.clone());

    config.deepgram_stt_model =
        env_var("DEEPGRAM_STT_MODEL").unwrap_or_else(|| defaults.deepgram_stt_model.clone());
    config.stt_language = env_var("STT_LANGUAGE").unwrap_or_else(|| defaults.stt_language.clone());
    config.stt_endpointing_ms = parse_env("STT_ENDPOINTING_MS", defaults.stt_endpointing_ms)?;
    config.stt_utterance_end_ms =
        parse_env("STT_UTTERANCE_END_MS", defaults.stt_utterance_end_ms)?;

    config.turn_debounce_ms = parse_env("TURN_DEBOUNCE_MS", defaults.turn_debounce_ms)?;
    config.max_transcript_entries =
        parse_env("MAX_TRANSCRIPT_ENTRIES", defaults.max_transcript_entries)?;

    config.call_store_url = env_var("CALL_STORE_URL");
    config.call_store_token = env_var("CALL_STORE_TOKEN");

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" 0 "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
