//! Turn-taking state machine.
//!
//! The controller owns no timers and no sockets. The session feeds it
//! recognizer events together with the current instant and arms a single
//! sleep on [`TurnController::debounce_deadline`]. This keeps the debounce,
//! the processing guard and barge-in testable without a runtime.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use super::playback::Playback;

// =============================================================================
// Constants
// =============================================================================

/// Quiet period after the last finalized fragment before a turn starts.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Transcript length past which the agent wraps the call up.
pub const DEFAULT_MAX_TRANSCRIPT_ENTRIES: usize = 40;

/// Phrases in an agent reply that end the call once spoken.
pub const CLOSING_PHRASES: &[&str] = &[
    "goodbye",
    "good bye",
    "have a great day",
    "have a nice day",
    "take care",
];

/// Tunables for [`TurnController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnConfig {
    pub debounce: Duration,
    pub max_transcript_entries: usize,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            max_transcript_entries: DEFAULT_MAX_TRANSCRIPT_ENTRIES,
        }
    }
}

/// Observable state of the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Stream not started yet
    Idle,
    /// Waiting for the caller
    Listening,
    /// Finalized text received, debounce running
    Debouncing,
    /// Response cycle running, nothing audible yet
    Generating,
    /// Agent audio sent and not yet acknowledged
    Speaking,
}

/// Decides when caller speech becomes a turn and when the agent must yield.
#[derive(Debug)]
pub struct TurnController {
    config: TurnConfig,
    playback: Playback,
    started: bool,
    processing: bool,
    pending_utterance: Option<String>,
    committed: Option<String>,
    deadline: Option<Instant>,
}

impl TurnController {
    pub fn new(config: TurnConfig, playback: Playback) -> Self {
        Self {
            config,
            playback,
            started: false,
            processing: false,
            pending_utterance: None,
            committed: None,
            deadline: None,
        }
    }

    pub fn config(&self) -> &TurnConfig {
        &self.config
    }

    pub fn on_stream_started(&mut self) {
        self.started = true;
    }

    pub fn state(&self) -> TurnState {
        if !self.started {
            TurnState::Idle
        } else if self.playback.is_speaking() {
            TurnState::Speaking
        } else if self.deadline.is_some() {
            TurnState::Debouncing
        } else if self.processing {
            TurnState::Generating
        } else {
            TurnState::Listening
        }
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn pending_utterance(&self) -> Option<&str> {
        self.pending_utterance.as_deref()
    }

    /// Deadline the session should sleep until, if a debounce is running.
    pub fn debounce_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Feed a recognizer transcript.
    ///
    /// Partials overwrite the pending utterance; finals go through
    /// [`handle_finalized_utterance`](Self::handle_finalized_utterance).
    /// Returns true if the fragment interrupted agent playback.
    pub fn on_transcript(&mut self, text: &str, is_final: bool, now: Instant) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        if is_final {
            self.pending_utterance = None;
            self.handle_finalized_utterance(text, now)
        } else {
            self.pending_utterance = Some(text.to_string());
            false
        }
    }

    /// The recognizer detected the end of an utterance.
    ///
    /// A pending partial is promoted to a finalized utterance.
    pub fn on_utterance_end(&mut self, now: Instant) -> bool {
        match self.pending_utterance.take() {
            Some(text) if !text.is_empty() => self.handle_finalized_utterance(&text, now),
            _ => false,
        }
    }

    /// Single entry point for finalized caller speech.
    ///
    /// Interrupts agent playback if it is audible, replaces the committed
    /// utterance and restarts the debounce. Returns true on interruption.
    pub fn handle_finalized_utterance(&mut self, text: &str, now: Instant) -> bool {
        let interrupted = self.playback.interrupt();
        if interrupted {
            debug!("Caller spoke over the agent, playback cleared");
        }
        self.committed = Some(text.to_string());
        self.deadline = Some(now + self.config.debounce);
        interrupted
    }

    /// Called when the debounce sleep fires.
    ///
    /// Returns the utterance to respond to and marks a cycle as in flight.
    /// Text committed while a cycle is already running stays committed and
    /// becomes the next turn once [`finish_turn`](Self::finish_turn) runs.
    pub fn on_debounce_elapsed(&mut self, now: Instant) -> Option<String> {
        match self.deadline {
            Some(deadline) if now >= deadline => self.deadline = None,
            _ => return None,
        }
        if self.processing {
            if let Some(text) = self.committed.as_deref() {
                debug!(utterance = %text, "Response cycle in flight, holding utterance");
            }
            return None;
        }
        let text = self.committed.take()?;
        self.processing = true;
        Some(text)
    }

    /// Release the processing guard after a cycle completes or fails.
    ///
    /// An utterance held back by the guard is due immediately, unless the
    /// caller is still inside a running debounce.
    pub fn finish_turn(&mut self, now: Instant) {
        self.processing = false;
        if self.committed.is_some() && self.deadline.is_none() {
            self.deadline = Some(now);
        }
    }

    /// Whether finalized caller text is waiting for a response cycle.
    pub fn has_committed_utterance(&self) -> bool {
        self.committed.is_some()
    }

    /// Drop any running debounce and committed text.
    pub fn cancel_debounce(&mut self) {
        self.deadline = None;
        self.committed = None;
    }

    /// Whether the call should end after the given agent reply.
    pub fn should_terminate(&self, reply: &str, transcript_len: usize) -> bool {
        is_closing_reply(reply) || transcript_len > self.config.max_transcript_entries
    }
}

/// Whether an agent reply contains a closing phrase.
pub fn is_closing_reply(reply: &str) -> bool {
    let lowered = reply.to_lowercase();
    CLOSING_PHRASES
        .iter()
        .any(|phrase| lowered.contains(phrase))
}
