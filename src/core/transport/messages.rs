//! Media-stream protocol messages.
//!
//! The telephony provider speaks JSON frames discriminated by an `event`
//! field. Inbound frames are `connected`, `start`, `media`, `stop` and
//! `mark`; outbound frames are `media`, `mark` and `clear`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// Incoming Messages (Provider -> Gateway)
// =============================================================================

/// Inbound media-stream event.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum MediaStreamEvent {
    /// Socket established, sent once before `start`
    Connected {
        #[serde(default)]
        protocol: Option<String>,
        #[serde(default)]
        version: Option<String>,
    },

    /// Stream metadata; carries the stream and call identifiers
    Start {
        #[serde(rename = "sequenceNumber", default)]
        sequence_number: Option<String>,
        start: StartMetadata,
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
    },

    /// Base64 μ-law audio from the caller
    Media {
        #[serde(rename = "sequenceNumber", default)]
        sequence_number: Option<String>,
        media: MediaPayload,
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
    },

    /// Stream ended by the provider
    Stop {
        #[serde(rename = "sequenceNumber", default)]
        sequence_number: Option<String>,
        #[serde(default)]
        stop: Option<StopMetadata>,
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
    },

    /// Playback acknowledgment echoing a mark we sent
    Mark {
        #[serde(rename = "sequenceNumber", default)]
        sequence_number: Option<String>,
        mark: MarkPayload,
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
    },

    /// Any other event type (e.g. `dtmf`)
    #[serde(other)]
    Other,
}

impl MediaStreamEvent {
    /// Parse a text frame.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Event name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Start { .. } => "start",
            Self::Media { .. } => "media",
            Self::Stop { .. } => "stop",
            Self::Mark { .. } => "mark",
            Self::Other => "other",
        }
    }
}

/// Metadata carried by the `start` event.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct StartMetadata {
    #[serde(rename = "streamSid")]
    pub stream_sid: String,
    #[serde(rename = "callSid", default)]
    pub call_sid: Option<String>,
    #[serde(rename = "accountSid", default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub tracks: Vec<String>,
    #[serde(rename = "customParameters", default)]
    pub custom_parameters: HashMap<String, String>,
    #[serde(rename = "mediaFormat", default)]
    pub media_format: Option<MediaFormat>,
}

/// Audio format advertised in the `start` event.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MediaFormat {
    pub encoding: String,
    #[serde(rename = "sampleRate")]
    pub sample_rate: u32,
    pub channels: u16,
}

/// Audio payload of an inbound `media` event.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MediaPayload {
    #[serde(default)]
    pub track: Option<String>,
    #[serde(default)]
    pub chunk: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Base64 μ-law bytes
    pub payload: String,
}

/// Metadata carried by the `stop` event.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StopMetadata {
    #[serde(rename = "callSid", default)]
    pub call_sid: Option<String>,
    #[serde(rename = "accountSid", default)]
    pub account_sid: Option<String>,
}

/// Mark name, used in both directions.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MarkPayload {
    pub name: String,
}

// =============================================================================
// Outgoing Messages (Gateway -> Provider)
// =============================================================================

/// Outbound media-stream frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum OutgoingMediaMessage {
    /// One chunk of base64 μ-law audio
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutgoingMediaPayload,
    },

    /// Completion marker, echoed back once playback reaches it
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: MarkPayload,
    },

    /// Discard buffered, not yet played audio
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

/// Payload of an outbound `media` frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutgoingMediaPayload {
    pub payload: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_event() {
        let json = r#"{
            "event": "start",
            "sequenceNumber": "1",
            "start": {
                "accountSid": "AC123",
                "streamSid": "MZ456",
                "callSid": "CA789",
                "tracks": ["inbound"],
                "mediaFormat": {"encoding": "audio/x-mulaw", "sampleRate": 8000, "channels": 1},
                "customParameters": {"campaign": "spring"}
            },
            "streamSid": "MZ456"
        }"#;

        match MediaStreamEvent::parse(json).unwrap() {
            MediaStreamEvent::Start { start, .. } => {
                assert_eq!(start.stream_sid, "MZ456");
                assert_eq!(start.call_sid.as_deref(), Some("CA789"));
                assert_eq!(start.media_format.unwrap().sample_rate, 8000);
                assert_eq!(start.custom_parameters["campaign"], "spring");
            }
            other => panic!("Expected start event, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_media_event() {
        let json = r#"{"event":"media","sequenceNumber":"3","media":{"track":"inbound","chunk":"1","timestamp":"5","payload":"//8="},"streamSid":"MZ456"}"#;
        match MediaStreamEvent::parse(json).unwrap() {
            MediaStreamEvent::Media { media, .. } => assert_eq!(media.payload, "//8="),
            other => panic!("Expected media event, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_mark_and_stop_events() {
        let mark = MediaStreamEvent::parse(
            r#"{"event":"mark","sequenceNumber":"4","streamSid":"MZ456","mark":{"name":"speech-1"}}"#,
        )
        .unwrap();
        assert!(matches!(mark, MediaStreamEvent::Mark { ref mark, .. } if mark.name == "speech-1"));

        let stop = MediaStreamEvent::parse(
            r#"{"event":"stop","sequenceNumber":"5","streamSid":"MZ456","stop":{"accountSid":"AC123","callSid":"CA789"}}"#,
        )
        .unwrap();
        assert_eq!(stop.event_name(), "stop");
    }

    #[test]
    fn test_parse_connected_and_unknown_events() {
        let connected =
            MediaStreamEvent::parse(r#"{"event":"connected","protocol":"Call","version":"1.0.0"}"#)
                .unwrap();
        assert_eq!(connected.event_name(), "connected");

        let dtmf = MediaStreamEvent::parse(r#"{"event":"dtmf","dtmf":{"digit":"1"}}"#).unwrap();
        assert_eq!(dtmf, MediaStreamEvent::Other);
    }

    #[test]
    fn test_serialize_outgoing_frames() {
        let clear = OutgoingMediaMessage::Clear {
            stream_sid: "MZ456".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&clear).unwrap(),
            serde_json::json!({"event": "clear", "streamSid": "MZ456"})
        );

        let mark = OutgoingMediaMessage::Mark {
            stream_sid: "MZ456".to_string(),
            mark: MarkPayload {
                name: "goodbye".to_string(),
            },
        };
        assert_eq!(
            serde_json::to_value(&mark).unwrap(),
            serde_json::json!({"event": "mark", "streamSid": "MZ456", "mark": {"name": "goodbye"}})
        );
    }
}
