use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::api;
use crate::state::AppState;
use std::sync::Arc;

/// Create the REST router
///
/// - `GET /` - health check
/// - `GET|POST /incoming-call` - TwiML webhook for answered calls
/// - `POST /calls` - place an outbound call
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        .route(
            "/incoming-call",
            get(api::incoming_call).post(api::incoming_call),
        )
        .route("/calls", post(api::place_call))
        .layer(TraceLayer::new_for_http())
}
