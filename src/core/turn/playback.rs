//! Outbound speech playback with mark bookkeeping and interruption.
//!
//! Every synthesized sentence is sent as one batch of `media` frames followed
//! by a `speech-<n>` mark. A mark stays outstanding until the provider echoes
//! it back, which is how the session knows the caller can still hear the
//! agent. Sends and interruptions share one lock, so a `clear` never lands in
//! the middle of a sentence's frames.
//!
//! Each generation captures the playback epoch when it starts. An
//! interruption bumps the epoch, and any later [`Playback::play`] call made
//! with the old epoch is dropped.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::core::transport::MediaStreamSender;

/// Prefix of marks attached to speech batches.
pub const SPEECH_MARK_PREFIX: &str = "speech-";

/// Mark whose acknowledgment ends the call.
pub const GOODBYE_MARK: &str = "goodbye";

#[derive(Debug, Default)]
struct PlaybackState {
    epoch: u64,
    mark_counter: u64,
    outstanding: VecDeque<String>,
}

/// Shared playback handle for one call.
#[derive(Debug, Clone)]
pub struct Playback {
    transport: MediaStreamSender,
    state: Arc<Mutex<PlaybackState>>,
}

impl Playback {
    pub fn new(transport: MediaStreamSender) -> Self {
        Self {
            transport,
            state: Arc::new(Mutex::new(PlaybackState::default())),
        }
    }

    /// Epoch a new generation should tag its audio with.
    pub fn current_epoch(&self) -> u64 {
        self.state.lock().epoch
    }

    /// Whether sent audio has not been acknowledged yet.
    pub fn is_speaking(&self) -> bool {
        !self.state.lock().outstanding.is_empty()
    }

    /// Send one utterance worth of μ-law audio followed by its mark.
    ///
    /// Returns the mark name, or `None` when the audio was dropped because
    /// the epoch is stale, the buffer is empty, or the transport is closed.
    pub fn play(&self, epoch: u64, mulaw: &[u8]) -> Option<String> {
        let mut state = self.state.lock();
        if state.epoch != epoch {
            debug!(
                epoch,
                current = state.epoch,
                "Dropping audio from interrupted turn"
            );
            return None;
        }
        if mulaw.is_empty() || self.transport.send_audio(mulaw) == 0 {
            return None;
        }

        state.mark_counter += 1;
        let name = format!("{SPEECH_MARK_PREFIX}{}", state.mark_counter);
        if self.transport.send_mark(&name) {
            state.outstanding.push_back(name.clone());
        }
        Some(name)
    }

    /// Barge-in: discard buffered audio and invalidate the current epoch.
    ///
    /// Only acts while the agent is speaking; returns whether a `clear` was
    /// sent.
    pub fn interrupt(&self) -> bool {
        let mut state = self.state.lock();
        if state.outstanding.is_empty() {
            return false;
        }
        state.epoch += 1;
        state.outstanding.clear();
        self.transport.send_clear();
        debug!(epoch = state.epoch, "Playback interrupted");
        true
    }

    /// Record a mark echoed back by the provider.
    ///
    /// Returns true if the mark was outstanding.
    pub fn acknowledge(&self, name: &str) -> bool {
        let mut state = self.state.lock();
        match state.outstanding.iter().position(|mark| mark == name) {
            Some(index) => {
                // Playback is ordered, so earlier marks have been heard too
                state.outstanding.drain(..=index);
                true
            }
            None => false,
        }
    }

    /// Queue the terminal mark after whatever audio is already buffered.
    pub fn send_goodbye_mark(&self) -> bool {
        let _state = self.state.lock();
        self.transport.send_mark(GOODBYE_MARK)
    }
}
