//! Base traits and error types for the completion transport.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::messages::{ChatCompletionRequest, ChatCompletionResponse};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while calling the completion endpoint.
///
/// None of these reach a client: the responder logs them and substitutes a
/// fallback reply.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The HTTP client could not be built
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Connection or transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// The endpoint answered with a non-2xx status
    #[error("Completion API error ({status}): {message}")]
    Status { status: u16, message: String },

    /// The response body did not match the expected schema
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The response carried no usable assistant text
    #[error("Completion returned no content")]
    EmptyResponse,

    /// The call did not finish within the configured bound
    #[error("Completion request timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for completion operations.
pub type CompletionResult<T> = Result<T, CompletionError>;

// =============================================================================
// Transport Trait
// =============================================================================

/// Sends one chat-completion request to an OpenAI-compatible endpoint.
///
/// The responder owns the credential and endpoint settings and passes them on
/// every call, so a transport holds no configuration of its own. Tests inject
/// counting or failing transports through this seam.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Execute a request and decode the response body.
    async fn send(
        &self,
        api_url: &str,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> CompletionResult<ChatCompletionResponse>;
}
