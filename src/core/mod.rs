pub mod responder;

// Re-export commonly used types for convenience
pub use responder::{
    ChatTransport, CompletionError, CompletionResult, FallbackResponder, HttpChatTransport,
    Responder,
};
