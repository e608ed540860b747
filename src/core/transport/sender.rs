//! Outbound side of the media-stream transport.
//!
//! [`MediaStreamSender`] turns synthesized μ-law audio into provider frames.
//! Frames go into an unbounded channel drained by the socket writer task, so
//! every send is synchronous and ordering is exactly the call order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::debug;

use super::messages::{MarkPayload, OutgoingMediaMessage, OutgoingMediaPayload};

/// Bytes of μ-law audio per outbound `media` frame (20 ms at 8 kHz).
pub const MEDIA_CHUNK_SIZE: usize = 160;

/// Item consumed by the socket writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportFrame {
    /// JSON frame for the provider
    Message(OutgoingMediaMessage),
    /// Close the socket
    Close,
}

/// Handle for sending frames to the telephony provider.
///
/// Cloning is cheap; all clones share the open flag and stream id. Once
/// [`close`](Self::close) has been called, or the writer task is gone, every
/// send is a no-op.
#[derive(Debug, Clone)]
pub struct MediaStreamSender {
    tx: mpsc::UnboundedSender<TransportFrame>,
    open: Arc<AtomicBool>,
    stream_sid: Arc<RwLock<Option<String>>>,
}

impl MediaStreamSender {
    /// Create a sender together with the receiver the writer task drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TransportFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                open: Arc::new(AtomicBool::new(true)),
                stream_sid: Arc::new(RwLock::new(None)),
            },
            rx,
        )
    }

    /// Record the stream id from the `start` event.
    ///
    /// Returns false if a stream id was already set; the first one wins.
    pub fn set_stream_sid(&self, stream_sid: impl Into<String>) -> bool {
        let mut guard = self.stream_sid.write();
        if guard.is_some() {
            return false;
        }
        *guard = Some(stream_sid.into());
        true
    }

    pub fn stream_sid(&self) -> Option<String> {
        self.stream_sid.read().clone()
    }

    /// Whether frames are still being delivered.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    /// Send μ-law audio as a sequence of 160-byte `media` frames.
    ///
    /// Returns the number of frames enqueued.
    pub fn send_audio(&self, mulaw: &[u8]) -> usize {
        let Some(stream_sid) = self.ready_stream_sid() else {
            return 0;
        };

        let mut sent = 0;
        for chunk in mulaw.chunks(MEDIA_CHUNK_SIZE) {
            let frame = OutgoingMediaMessage::Media {
                stream_sid: stream_sid.clone(),
                media: OutgoingMediaPayload {
                    payload: BASE64.encode(chunk),
                },
            };
            if !self.push(TransportFrame::Message(frame)) {
                break;
            }
            sent += 1;
        }
        sent
    }

    /// Send a `mark` frame.
    pub fn send_mark(&self, name: &str) -> bool {
        let Some(stream_sid) = self.ready_stream_sid() else {
            return false;
        };
        self.push(TransportFrame::Message(OutgoingMediaMessage::Mark {
            stream_sid,
            mark: MarkPayload {
                name: name.to_string(),
            },
        }))
    }

    /// Send a `clear` frame so the provider drops buffered playback.
    pub fn send_clear(&self) -> bool {
        let Some(stream_sid) = self.ready_stream_sid() else {
            return false;
        };
        self.push(TransportFrame::Message(OutgoingMediaMessage::Clear { stream_sid }))
    }

    /// Ask the writer task to close the socket. Idempotent.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            let _ = self.tx.send(TransportFrame::Close);
        }
    }

    fn ready_stream_sid(&self) -> Option<String> {
        if !self.is_open() {
            debug!("Transport closed, dropping outbound frame");
            return None;
        }
        let sid = self.stream_sid();
        if sid.is_none() {
            debug!("No stream id yet, dropping outbound frame");
        }
        sid
    }

    fn push(&self, frame: TransportFrame) -> bool {
        self.tx.send(frame).is_ok()
    }
}
