//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `ws` - Voice relay WebSocket

pub mod api;
pub mod ws;

pub use ws::ws_relay_handler;
