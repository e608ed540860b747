//! Telephony media-stream transport.
//!
//! - [`messages`]: JSON frame types of the media-stream protocol
//! - [`sender`]: outbound framing (160-byte chunking, marks, clear)
//!
//! Inbound audio is decoded with [`decode_inbound_audio`], which unpacks the
//! base64 payload and expands μ-law to linear PCM for the recognizer.

pub mod messages;
mod sender;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;

use crate::core::codec;

pub use messages::{
    MarkPayload, MediaPayload, MediaStreamEvent, OutgoingMediaMessage, OutgoingMediaPayload,
    StartMetadata,
};
pub use sender::{MEDIA_CHUNK_SIZE, MediaStreamSender, TransportFrame};

/// Decode a base64 μ-law payload into little-endian 16-bit PCM.
pub fn decode_inbound_audio(payload: &str) -> Result<Bytes, base64::DecodeError> {
    let mulaw = BASE64.decode(payload)?;
    Ok(Bytes::from(codec::decode_to_pcm(&mulaw)))
}
