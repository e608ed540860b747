//! Call script: the system prompt and opening greeting of a call.
//!
//! The stored script is JSON, either embedded as an object or encoded as a
//! string. Missing or unreadable scripts fall back to defaults so a call is
//! never refused because of its script.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly and professional phone assistant. \
Keep every answer short and conversational, one to three sentences, because your replies are \
spoken aloud. Never use lists, markdown or emoji. When the conversation is finished, thank the \
caller and say goodbye.";

pub const DEFAULT_GREETING: &str = "Hello! Thanks for taking my call. How can I help you today?";

/// System prompt and greeting used for every turn of a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallScript {
    pub system_prompt: String,
    pub greeting: String,
}

impl Default for CallScript {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScript {
    #[serde(default, alias = "system_prompt", alias = "prompt")]
    system_prompt: Option<String>,
    #[serde(default, alias = "opening_greeting", alias = "openingGreeting")]
    greeting: Option<String>,
}

impl CallScript {
    /// Build a script from the stored value, filling gaps with defaults.
    pub fn from_stored(value: Option<&Value>) -> Self {
        let raw = match value {
            None | Some(Value::Null) => RawScript::default(),
            Some(Value::String(encoded)) => match serde_json::from_str::<RawScript>(encoded) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(error = %e, "Unreadable call script, using defaults");
                    RawScript::default()
                }
            },
            Some(other) => match RawScript::deserialize(other) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(error = %e, "Unreadable call script, using defaults");
                    RawScript::default()
                }
            },
        };

        let defaults = Self::default();
        Self {
            system_prompt: non_blank(raw.system_prompt).unwrap_or(defaults.system_prompt),
            greeting: non_blank(raw.greeting).unwrap_or(defaults.greeting),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
