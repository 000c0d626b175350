//! WebSocket relay message types
//!
//! Every message is a JSON object discriminated by its `type` field.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error text sent to the client for any payload that cannot be handled.
pub const PARSE_ERROR_MESSAGE: &str = "Failed to process message";

/// Maximum inbound WebSocket message and frame size (64 KB)
pub const MAX_INBOUND_MESSAGE_SIZE: usize = 64 * 1024;

// =============================================================================
// Incoming Messages (Client -> Server)
// =============================================================================

/// Incoming WebSocket messages from the browser client
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum IncomingMessage {
    /// Final speech-to-text result
    #[serde(rename = "transcription")]
    Transcription {
        /// Transcribed user text, possibly empty
        text: String,
    },

    /// Application-level liveness probe
    #[serde(rename = "ping")]
    Ping,

    /// Any other `type`, or none at all
    #[serde(skip)]
    Unknown { kind: Option<String> },
}

/// Why an inbound payload could not be turned into an [`IncomingMessage`].
#[derive(Debug, Error)]
pub enum MessageParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message is not a JSON object")]
    NotAnObject,
}

impl IncomingMessage {
    /// Parse a raw text or binary payload.
    ///
    /// Unknown or missing `type` values are not errors; they yield
    /// [`IncomingMessage::Unknown`] so the caller can ignore them. A known
    /// type with a malformed body (a transcription without a string `text`)
    /// is an error.
    pub fn parse(raw: &[u8]) -> Result<Self, MessageParseError> {
        let value: Value = serde_json::from_slice(raw)?;
        let Value::Object(fields) = &value else {
            return Err(MessageParseError::NotAnObject);
        };

        let kind = fields
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_owned);

        match kind.as_deref() {
            Some("transcription") | Some("ping") => Ok(serde_json::from_value(value)?),
            _ => Ok(Self::Unknown { kind }),
        }
    }
}

// =============================================================================
// Outgoing Messages (Server -> Client)
// =============================================================================

/// Outgoing WebSocket messages to the browser client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum OutgoingMessage {
    /// Assistant reply for one transcription
    #[serde(rename = "ai_response")]
    AiResponse { text: String },

    /// Processing failure; the channel stays open
    #[serde(rename = "error")]
    Error { message: String },

    /// Reply to `ping`
    #[serde(rename = "pong")]
    Pong,
}

impl OutgoingMessage {
    pub fn parse_error() -> Self {
        Self::Error {
            message: PARSE_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Routes for the socket writer task
#[derive(Debug)]
pub enum MessageRoute {
    /// JSON text message
    Outgoing(OutgoingMessage),
    /// Close connection
    Close,
}
