pub mod api;
pub mod ws;

use axum::Router;
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::state::AppState;

/// Assemble the relay application: health API, WebSocket entry points and,
/// when configured, the static client assets as a fallback.
///
/// Cross-cutting layers (CORS, rate limiting, security headers) are applied
/// by the binary.
pub fn create_router(state: Arc<AppState>) -> Router {
    let mut router = api::create_api_router().merge(ws::create_ws_router(state.clone()));

    if let Some(dir) = state.config.static_dir.as_ref() {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router.with_state(state)
}
