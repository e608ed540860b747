//! Telephony media-stream WebSocket handler
//!
//! Each connection carries one call. The socket is split into a writer task
//! draining [`TransportFrame`]s produced by the session and a reader task
//! parsing provider events; the [`CallSession`] actor runs between them.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use regex::Regex;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::core::session::CallSession;
use crate::core::transport::{MediaStreamEvent, MediaStreamSender, TransportFrame};
use crate::errors::AppError;
use crate::state::AppState;

/// Buffer between the socket reader and the session
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Maximum WebSocket frame size (1 MB)
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// Time the writer gets to flush the close frame after teardown
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

static CALL_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,128}$").expect("valid call id regex"));

/// Whether a path segment can be a call id
pub fn is_valid_call_id(call_id: &str) -> bool {
    CALL_ID_PATTERN.is_match(call_id)
}

/// Media-stream upgrade handler
///
/// `GET /voice-stream/{call_id}`. Rejects malformed call ids with 400 before
/// upgrading.
pub async fn media_stream_handler(
    Path(call_id): Path<String>,
    State(state): State<Arc<AppState>>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    if !is_valid_call_id(&call_id) {
        warn!(call_id = %call_id, "Rejecting media stream with invalid call id");
        return AppError::BadRequest("Invalid call id".to_string()).into_response();
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    info!(call_id = %call_id, "Media stream upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_media_stream(socket, state, call_id))
}

async fn handle_media_stream(socket: WebSocket, state: Arc<AppState>, call_id: String) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (transport, mut frames) = MediaStreamSender::channel();

    let session =
        match CallSession::load(call_id.clone(), state.services.clone(), transport.clone()).await {
            Ok(session) => session,
            Err(e) => {
                warn!(call_id = %call_id, error = %e, "Call could not be loaded, closing media stream");
                let _ = ws_sender.send(Message::Close(None)).await;
                return;
            }
        };

    let connection_id = state.register_call(&call_id);
    info!(call_id = %call_id, %connection_id, "Media stream established");

    // Writer task for outgoing frames
    let mut writer = tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            let result = match frame {
                TransportFrame::Message(message) => match serde_json::to_string(&message) {
                    Ok(json) => ws_sender.send(Message::Text(json.into())).await,
                    Err(e) => {
                        error!("Failed to serialize outgoing media frame: {}", e);
                        continue;
                    }
                },
                TransportFrame::Close => {
                    let _ = ws_sender.send(Message::Close(None)).await;
                    break;
                }
            };

            if let Err(e) = result {
                debug!("Failed to send media frame: {}", e);
                break;
            }
        }
    });

    // Reader task for provider events
    let (events_tx, events_rx) = mpsc::channel::<MediaStreamEvent>(CHANNEL_BUFFER_SIZE);
    let reader_call_id = call_id.clone();
    let reader = tokio::spawn(async move {
        while let Some(message) = ws_receiver.next().await {
            match message {
                Ok(Message::Text(text)) => match MediaStreamEvent::parse(text.as_str()) {
                    Ok(event) => {
                        if events_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!(call_id = %reader_call_id, error = %e, "Ignoring unparseable frame");
                    }
                },
                Ok(Message::Close(_)) => {
                    info!(call_id = %reader_call_id, "Media stream closed by provider");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(call_id = %reader_call_id, error = %e, "Media stream read error");
                    break;
                }
            }
        }
    });

    let reason = session.run(events_rx).await;

    reader.abort();
    transport.close();
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
        .await
        .is_err()
    {
        writer.abort();
    }

    state.release_call(&connection_id);
    info!(call_id = %call_id, ?reason, "Media stream terminated");
}
