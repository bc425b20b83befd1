pub mod api;
pub mod media;

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// Build the complete application router.
pub fn create_app(state: Arc<AppState>) -> Router {
    api::create_api_router()
        .merge(media::create_media_router())
        .with_state(state)
}
