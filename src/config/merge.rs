use std::path::PathBuf;

use super::env::load_from_env;
use super::yaml::YamlConfig;
use super::{ServerConfig, TlsConfig};
use crate::core::tts::TtsProviderKind;

/// Start from the environment and apply every value the YAML file sets
pub(super) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = load_from_env()?;
    let Some(yaml) = yaml else {
        return Ok(config);
    };

    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if let Some(tls) = server.tls {
            match tls.enabled {
                Some(false) => config.tls = None,
                _ => {
                    if let (Some(cert_path), Some(key_path)) = (tls.cert_path, tls.key_path) {
                        config.tls = Some(TlsConfig {
                            cert_path: PathBuf::from(cert_path),
                            key_path: PathBuf::from(key_path),
                        });
                    } else if tls.enabled == Some(true) {
                        return Err("TLS is enabled but cert_path or key_path is missing".into());
                    }
                }
            }
        }
    }

    if let Some(providers) = yaml.providers {
        override_secret(&mut config.deepgram_api_key, providers.deepgram_api_key);
        override_secret(&mut config.elevenlabs_api_key, providers.elevenlabs_api_key);
        override_secret(&mut config.elevenlabs_voice_id, providers.elevenlabs_voice_id);
        override_secret(&mut config.anthropic_api_key, providers.anthropic_api_key);
    }

    if let Some(llm) = yaml.llm {
        if let Some(model) = llm.model {
            config.anthropic_model = model;
        }
        if let Some(max_tokens) = llm.max_tokens {
            config.llm_max_tokens = max_tokens;
        }
        if let Some(ttl) = llm.tenant_credentials_ttl_seconds {
            config.tenant_credentials_ttl_seconds = ttl;
        }
    }

    if let Some(tts) = yaml.tts {
        if let Some(provider) = tts.provider {
            config.tts_provider = provider
                .parse::<TtsProviderKind>()
                .map_err(|e| format!("Invalid tts.provider: {e}"))?;
        }
        if let Some(fallback) = tts.fallback_to_primary {
            config.tts_fallback_to_primary = fallback;
        }
        if let Some(model) = tts.deepgram_model {
            config.deepgram_tts_model = model;
        }
    }

    if let Some(stt) = yaml.stt {
        if let Some(model) = stt.model {
            config.deepgram_stt_model = model;
        }
        if let Some(language) = stt.language {
            config.stt_language = language;
        }
        if let Some(endpointing) = stt.endpointing_ms {
            config.stt_endpointing_ms = endpointing;
        }
        if let Some(utterance_end) = stt.utterance_end_ms {
            config.stt_utterance_end_ms = utterance_end;
        }
    }

    if let Some(turn) = yaml.turn {
        if let Some(debounce) = turn.debounce_ms {
            config.turn_debounce_ms = debounce;
        }
        if let Some(max_entries) = turn.max_transcript_entries {
            config.max_transcript_entries = max_entries;
        }
    }

    if let Some(store) = yaml.call_store {
        override_secret(&mut config.call_store_url, store.url);
        override_secret(&mut config.call_store_token, store.token);
    }

    Ok(config)
}

/// Replace `target` with a non-empty YAML value
fn override_secret(target: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        *target = Some(value);
    }
}
