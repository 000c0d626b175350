//! Voice relay WebSocket route configuration

use axum::{Router, middleware, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::ws::ws_relay_handler;
use crate::middleware::connection_limit_middleware;
use crate::state::AppState;
use std::sync::Arc;

/// Create the relay WebSocket router
///
/// # Endpoints
///
/// - `GET /` - WebSocket upgrade, or the static client's index for plain requests
/// - `GET /ws` - WebSocket upgrade
///
/// Both sit behind the connection limit middleware.
///
/// # Example
///
/// ```json
/// // Client sends a transcript
/// {"type": "transcription", "text": "Hello there"}
///
/// // Server responds
/// {"type": "ai_response", "text": "Hello! How are you doing today?"}
/// ```
pub fn create_ws_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(ws_relay_handler))
        .route("/ws", get(ws_relay_handler))
        .layer(middleware::from_fn_with_state(
            state,
            connection_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}
