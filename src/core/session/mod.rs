//! Call sessions.
//!
//! - [`CallSession`]: per-call actor coordinating transport, recognizer,
//!   turn controller, model and synthesizer
//! - [`CallStore`]: where call configuration comes from and outcomes go
//! - [`CallScript`]: system prompt and greeting of a call

mod call_session;
mod script;
mod store;
mod transcript;

pub use call_session::{
    CallSession, RECOGNIZER_APOLOGY, SessionError, SessionServices, TURN_APOLOGY, TeardownReason,
};
pub use script::{CallScript, DEFAULT_GREETING, DEFAULT_SYSTEM_PROMPT};
pub use store::{
    CallRecord, CallStatus, CallStore, CallUpdate, HttpCallStore, InMemoryCallStore, StoreError,
};
pub use transcript::{Speaker, TranscriptEntry};
