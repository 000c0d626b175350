//! HTTP transport for OpenAI-compatible chat-completion endpoints.
//!
//! Groq, OpenAI and most self-hosted gateways share the same
//! `POST /chat/completions` contract: bearer authentication, a JSON body of
//! `{model, messages, max_tokens, temperature}`, and a JSON response whose
//! assistant text sits at `choices[0].message.content`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::base::{ChatTransport, CompletionError, CompletionResult};
use super::messages::{ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse};

/// Request timeout applied by the HTTP client itself. The responder enforces
/// its own, usually shorter, bound on top of this.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default connect timeout in seconds.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Longest upstream error body echoed into logs.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// User-Agent header value for API requests.
const USER_AGENT: &str = concat!("VoiceRelayGateway/", env!("CARGO_PKG_VERSION"));

/// reqwest-backed [`ChatTransport`].
#[derive(Debug, Clone)]
pub struct HttpChatTransport {
    http_client: Client,
}

impl HttpChatTransport {
    /// Create a transport with pooled connections and sensible timeouts.
    pub fn new() -> CompletionResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                CompletionError::Configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self { http_client })
    }

    /// Wrap an existing client (shared pools, custom TLS roots).
    pub fn with_client(http_client: Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn send(
        &self,
        api_url: &str,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> CompletionResult<ChatCompletionResponse> {
        let response = self
            .http_client
            .post(api_url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
                } else {
                    CompletionError::Network(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        if let Some(ref id) = request_id {
            debug!(request_id = %id, status = status.as_u16(), "Completion response received");
        }

        let body = response
            .text()
            .await
            .map_err(|e| CompletionError::Network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(parsed) => match parsed.error.error_type {
                    Some(kind) => format!("{} ({kind})", parsed.error.message),
                    None => parsed.error.message,
                },
                Err(_) => truncate(&body, MAX_ERROR_BODY_CHARS),
            };
            return Err(CompletionError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str::<ChatCompletionResponse>(&body)
            .map_err(|e| CompletionError::MalformedResponse(format!("Failed to parse response: {e}")))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
