//! Media-stream WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::api::MEDIA_STREAM_PATH;
use crate::handlers::media_stream::media_stream_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the media-stream WebSocket router
///
/// # Endpoint
///
/// `GET /media-stream` - WebSocket upgrade for one phone call's media
///
/// # Protocol
///
/// The telephony provider sends JSON frames tagged by `event`
/// (`connected`, `start`, `media`, `mark`, `stop`). The server replies with
/// `media`, `mark` and `clear` frames addressed to the stream sid.
///
/// ```json
/// {"event": "start", "start": {"streamSid": "MZ...", "callSid": "CA..."}}
/// {"event": "media", "media": {"payload": "<base64 mulaw>", "timestamp": "120"}}
/// ```
pub fn create_media_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(MEDIA_STREAM_PATH, get(media_stream_handler))
        .layer(TraceLayer::new_for_http())
}
