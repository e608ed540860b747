//! WebSocket message types for Deepgram live transcription.
//!
//! - **Incoming**: `Results`, `UtteranceEnd`, `SpeechStarted`, `Metadata`
//!   and `Error`, discriminated by their `type` field
//! - **Outgoing**: binary PCM frames plus the [`KeepAliveMessage`] and
//!   [`CloseStreamMessage`] control messages

use serde::{Deserialize, Serialize};

// =============================================================================
// Incoming Messages (Server to Client)
// =============================================================================

/// One recognition alternative.
#[derive(Debug, Clone, Deserialize)]
pub struct Alternative {
    pub transcript: String,
    #[serde(default)]
    pub confidence: f64,
}

/// Channel holding the alternatives for a result.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultChannel {
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
}

/// Partial or final transcription result.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultsMessage {
    pub channel: ResultChannel,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub speech_final: bool,
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub duration: f64,
}

impl ResultsMessage {
    /// Best alternative, if any.
    pub fn best(&self) -> Option<&Alternative> {
        self.channel.alternatives.first()
    }
}

/// Sent after `utterance_end_ms` of silence following the last word.
#[derive(Debug, Clone, Deserialize)]
pub struct UtteranceEndMessage {
    #[serde(default)]
    pub last_word_end: Option<f64>,
}

/// Voice activity detected.
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechStartedMessage {
    #[serde(default)]
    pub timestamp: Option<f64>,
}

/// Summary sent when the stream is closed.
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataMessage {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Error reported in-band.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorMessage {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
}

impl ErrorMessage {
    pub fn text(&self) -> String {
        self.description
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "unknown Deepgram error".to_string())
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    message_type: Option<String>,
}

/// Parsed server message.
#[derive(Debug, Clone)]
pub enum DeepgramMessage {
    Results(ResultsMessage),
    UtteranceEnd(UtteranceEndMessage),
    SpeechStarted(SpeechStartedMessage),
    Metadata(MetadataMessage),
    Error(ErrorMessage),
    /// Message type this client does not handle
    Unknown(String),
}

impl DeepgramMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let envelope: Envelope = serde_json::from_str(text)?;
        Ok(match envelope.message_type.as_deref() {
            Some("Results") => Self::Results(serde_json::from_str(text)?),
            Some("UtteranceEnd") => Self::UtteranceEnd(serde_json::from_str(text)?),
            Some("SpeechStarted") => Self::SpeechStarted(serde_json::from_str(text)?),
            Some("Metadata") => Self::Metadata(serde_json::from_str(text)?),
            Some("Error") => Self::Error(serde_json::from_str(text)?),
            _ => Self::Unknown(text.to_string()),
        })
    }
}

// =============================================================================
// Outgoing Messages (Client to Server)
// =============================================================================

/// Keeps an idle stream open.
#[derive(Debug, Clone, Serialize)]
pub struct KeepAliveMessage {
    #[serde(rename = "type")]
    pub message_type: &'static str,
}

impl Default for KeepAliveMessage {
    fn default() -> Self {
        Self {
            message_type: "KeepAlive",
        }
    }
}

/// Flushes pending audio and asks the server to close the stream.
#[derive(Debug, Clone, Serialize)]
pub struct CloseStreamMessage {
    #[serde(rename = "type")]
    pub message_type: &'static str,
}

impl Default for CloseStreamMessage {
    fn default() -> Self {
        Self {
            message_type: "CloseStream",
        }
    }
}
