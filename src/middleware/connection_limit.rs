//! Connection admission for WebSocket upgrades
//!
//! Enforces the global WebSocket limit and the per-IP limit before the
//! upgrade handler runs. Plain HTTP requests (health checks, static assets)
//! pass straight through.
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use voice_relay_gateway::middleware::connection_limit_middleware;
//!
//! let app = Router::new()
//!     .route("/ws", get(ws_relay_handler))
//!     .layer(axum::middleware::from_fn_with_state(
//!         state.clone(),
//!         connection_limit_middleware,
//!     ));
//! ```

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::state::{AppState, ConnectionLimitError};

/// Client address of an admitted WebSocket upgrade.
///
/// Its presence in the request extensions means a slot was reserved and the
/// channel must release it on disconnect.
#[derive(Clone, Copy, Debug)]
pub struct ClientIp(pub IpAddr);

/// Returns true when the request asks for a WebSocket upgrade.
pub fn is_websocket_upgrade<B>(request: &Request<B>) -> bool {
    request
        .headers()
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false)
}

/// Reserve a connection slot for WebSocket upgrades.
///
/// - 503 Service Unavailable when the global limit is reached
/// - 429 Too Many Requests when the caller's IP is at its limit
///
/// On success a [`ClientIp`] extension is injected for the handler.
pub async fn connection_limit_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if !is_websocket_upgrade(&request) {
        return next.run(request).await;
    }

    let client_ip = addr.ip();

    match state.try_acquire_connection(client_ip) {
        Ok(()) => {
            request.extensions_mut().insert(ClientIp(client_ip));
            let response = next.run(request).await;
            // A failed upgrade never reaches the socket task, so nothing else
            // would give the slot back.
            if response.status() != StatusCode::SWITCHING_PROTOCOLS {
                state.release_connection(client_ip);
            }
            response
        }
        Err(ConnectionLimitError::GlobalLimitReached) => {
            tracing::warn!(ip = %client_ip, "Rejecting connection: global limit reached");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Server at capacity. Please try again later.",
            )
                .into_response()
        }
        Err(ConnectionLimitError::PerIpLimitReached) => {
            tracing::warn!(ip = %client_ip, "Rejecting connection: per-IP limit reached");
            (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many connections from your IP address.",
            )
                .into_response()
        }
    }
}
