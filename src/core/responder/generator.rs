use std::sync::Arc;

use tracing::{debug, warn};

use super::base::{ChatTransport, CompletionError, CompletionResult};
use super::client::HttpChatTransport;
use super::fallback::FallbackResponder;
use super::messages::ChatCompletionRequest;
use crate::config::CompletionConfig;

/// Produces assistant text for a user utterance.
///
/// Tries the completion endpoint when a credential is configured and falls
/// back to local keyword replies otherwise. [`Responder::generate`] never fails.
pub struct Responder {
    config: CompletionConfig,
    transport: Arc<dyn ChatTransport>,
    fallback: FallbackResponder,
}

impl Responder {
    /// Create a responder over an explicit transport.
    pub fn new(config: CompletionConfig, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            config,
            transport,
            fallback: FallbackResponder::new(),
        }
    }

    /// Create a responder backed by the reqwest transport.
    pub fn from_config(config: CompletionConfig) -> CompletionResult<Self> {
        let transport = HttpChatTransport::new()?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    pub fn is_remote_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    /// Generate a reply for `user_text`.
    pub async fn generate(&self, user_text: &str) -> String {
        if self.is_remote_enabled() {
            match self.generate_remote(user_text).await {
                Ok(text) => return text,
                Err(e) => warn!(error = %e, "Completion request failed, using fallback reply"),
            }
        }

        let (category, text) = self.fallback.respond(user_text, &mut rand::rng());
        debug!(category = category.as_str(), "Fallback reply selected");
        text
    }

    async fn generate_remote(&self, user_text: &str) -> CompletionResult<String> {
        let Some(api_key) = self.config.api_key.as_ref() else {
            return Err(CompletionError::Configuration(
                "no completion credential configured".to_string(),
            ));
        };

        let request = ChatCompletionRequest::single_turn(&self.config, user_text);
        let bound = self.config.timeout();

        let response = tokio::time::timeout(
            bound,
            self.transport
                .send(&self.config.api_url, api_key.expose(), &request),
        )
        .await
        .map_err(|_| CompletionError::Timeout(bound))??;

        response.into_content()
    }
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
