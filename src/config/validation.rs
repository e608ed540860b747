use super::ServerConfig;

/// Check a loaded configuration for values the gateway cannot run with
///
/// Provider credentials are checked when services are built, so a
/// configuration without keys still loads.
pub(super) fn validate(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    validate_tls(config)?;
    validate_turn(config)?;
    validate_call_store(config)?;
    Ok(())
}

fn validate_tls(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let Some(tls) = &config.tls else {
        return Ok(());
    };
    if !tls.cert_path.exists() {
        return Err(format!(
            "TLS certificate file not found: {}",
            tls.cert_path.display()
        )
        .into());
    }
    if !tls.key_path.exists() {
        return Err(format!("TLS key file not found: {}", tls.key_path.display()).into());
    }
    Ok(())
}

fn validate_turn(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.turn_debounce_ms == 0 {
        return Err("TURN_DEBOUNCE_MS must be greater than zero".into());
    }
    if config.max_transcript_entries == 0 {
        return Err("MAX_TRANSCRIPT_ENTRIES must be greater than zero".into());
    }
    if config.llm_max_tokens == 0 {
        return Err("LLM_MAX_TOKENS must be greater than zero".into());
    }
    Ok(())
}

fn validate_call_store(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(url) = &config.call_store_url {
        let parsed = url::Url::parse(url).map_err(|e| format!("Invalid CALL_STORE_URL: {e}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!(
                "CALL_STORE_URL must use http or https, got: {}",
                parsed.scheme()
            )
            .into());
        }
    }
    Ok(())
}
