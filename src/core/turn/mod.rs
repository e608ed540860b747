//! Turn taking and barge-in.
//!
//! [`TurnController`] decides when finalized caller speech becomes a turn;
//! [`Playback`] tracks what the caller can still hear and performs the
//! `clear` on interruption.

mod controller;
mod playback;

pub use controller::{
    CLOSING_PHRASES, DEFAULT_DEBOUNCE, DEFAULT_MAX_TRANSCRIPT_ENTRIES, TurnConfig,
    TurnController, TurnState, is_closing_reply,
};
pub use playback::{GOODBYE_MARK, Playback, SPEECH_MARK_PREFIX};
