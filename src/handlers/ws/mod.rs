//! Voice relay WebSocket handlers
//!
//! # Protocol
//!
//! ## Client → Server
//!
//! - **transcription**: `{"type":"transcription","text":"..."}` final speech-to-text result
//! - **ping**: `{"type":"ping"}` liveness probe
//!
//! ## Server → Client
//!
//! - **ai_response**: `{"type":"ai_response","text":"..."}` one per transcription, in order
//! - **error**: `{"type":"error","message":"Failed to process message"}`
//! - **pong**: `{"type":"pong"}`
//!
//! Messages with any other `type` are ignored.

mod handler;
pub mod messages;
pub mod processor;

pub use handler::ws_relay_handler;
