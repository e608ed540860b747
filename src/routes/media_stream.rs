//! Media-stream WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::media_stream::media_stream_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the media-stream WebSocket router
///
/// # Endpoint
///
/// `GET /voice-stream/{call_id}` - WebSocket upgrade for one call's media stream
///
/// # Protocol
///
/// The telephony provider sends JSON frames discriminated by `event`:
/// `connected`, `start`, `media` (base64 μ-law), `mark` and `stop`.
///
/// The gateway answers with:
/// - `media` frames carrying 160 bytes of μ-law each
/// - `mark` frames after every spoken sentence, echoed back once played
/// - `clear` when the caller interrupts the agent
pub fn create_media_stream_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/voice-stream/{call_id}", get(media_stream_handler))
        .layer(TraceLayer::new_for_http())
}
