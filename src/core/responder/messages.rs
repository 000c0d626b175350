//! Wire types for the OpenAI-compatible chat-completions API.

use serde::{Deserialize, Serialize};

use super::base::{CompletionError, CompletionResult};
use crate::config::CompletionConfig;

/// Fixed system instruction sent with every request.
pub const SYSTEM_PROMPT: &str = "You are a helpful, friendly AI assistant. Keep responses concise and natural for voice conversation (2-3 sentences max). Be conversational and engaging.";

// =============================================================================
// Request
// =============================================================================

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Chat-completion request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ChatCompletionRequest {
    /// Build a single-turn exchange: the system instruction plus one user message.
    pub fn single_turn(config: &CompletionConfig, user_text: &str) -> Self {
        Self {
            model: config.model.clone(),
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user_text)],
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

// =============================================================================
// Response
// =============================================================================

/// Chat-completion response body. Only the fields the relay reads are modeled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// One completion candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

/// Assistant message inside a choice. `content` may be null upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Extract `choices[0].message.content`, verbatim.
    ///
    /// Missing choices and null or missing content are reported as
    /// [`CompletionError::EmptyResponse`]. Any string content is kept as sent.
    pub fn into_content(self) -> CompletionResult<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(CompletionError::EmptyResponse)
    }
}

/// Error envelope returned by OpenAI-compatible APIs on failure.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
}
