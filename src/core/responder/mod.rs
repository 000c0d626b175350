//! Response generation for user transcriptions.
//!
//! This module turns a transcript into assistant text, either through an
//! OpenAI-compatible chat-completion endpoint or through a local keyword
//! responder.
//!
//! # Architecture
//!
//! - `ChatTransport` trait as the seam to the remote endpoint
//! - `HttpChatTransport` as the reqwest implementation
//! - `FallbackResponder` for deterministic keyword replies
//! - `Responder` combining both; its `generate` never fails
//!
//! # Example
//!
//! ```rust,ignore
//! use voice_relay_gateway::config::CompletionConfig;
//! use voice_relay_gateway::core::responder::Responder;
//!
//! #[tokio::main]
//! async fn main() {
//!     let responder = Responder::from_config(CompletionConfig::default()).unwrap();
//!     let reply = responder.generate("Hello there").await;
//!     assert_eq!(reply, "Hello! How are you doing today?");
//! }
//! ```

mod base;
mod client;
mod fallback;
mod generator;
pub mod messages;

pub use base::{ChatTransport, CompletionError, CompletionResult};
pub use client::HttpChatTransport;
pub use fallback::{FallbackResponder, GENERIC_REPLIES, ReplyCategory};
pub use generator::Responder;
