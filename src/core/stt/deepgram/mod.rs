//! Deepgram live transcription integration.
//!
//! - [`config`]: URL and header construction (`DeepgramSTTConfig`)
//! - [`messages`]: server events and control messages
//! - [`client`]: the `DeepgramSTT` connection and its factory
//!
//! Audio is sent as 8 kHz mono `linear16` PCM. Interim results, VAD events,
//! endpointing and utterance-end detection are always requested because the
//! turn controller depends on them.

mod client;
mod config;
mod messages;

#[cfg(test)]
mod tests;

pub use client::{DeepgramRecognizerFactory, DeepgramSTT};
pub use config::{DEEPGRAM_STT_URL, DEFAULT_KEEPALIVE_INTERVAL, DeepgramSTTConfig};
pub use messages::{
    CloseStreamMessage, DeepgramMessage, KeepAliveMessage, ResultsMessage, UtteranceEndMessage,
};
