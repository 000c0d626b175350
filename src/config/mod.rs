//! Configuration module for the Voice Relay Gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use voice_relay_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use zeroize::{Zeroize, ZeroizeOnDrop};

mod env;
mod error;
mod merge;
mod validation;
mod yaml;

pub use error::ConfigError;
pub use yaml::YamlConfig;

/// Default chat-completion endpoint (OpenAI-compatible)
pub const DEFAULT_COMPLETION_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default chat-completion model
pub const DEFAULT_COMPLETION_MODEL: &str = "llama-3.1-8b-instant";

/// Default bound on generated tokens per reply
pub const DEFAULT_MAX_TOKENS: u32 = 150;

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default per-call timeout for the completion endpoint
pub const DEFAULT_COMPLETION_TIMEOUT_SECS: u64 = 10;

/// Default idle timeout for WebSocket channels
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Bearer credential for the completion endpoint.
///
/// Zeroized on drop and redacted in `Debug` output.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ApiCredential(String);

impl ApiCredential {
    /// Wrap a credential. Blank strings are treated as "not configured".
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiCredential(***)")
    }
}

/// Settings for the external chat-completion endpoint
///
/// The presence of `api_key` is the single switch between the remote
/// generation path and the purely local fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionConfig {
    /// Bearer credential; `None` forces local fallback replies
    pub api_key: Option<ApiCredential>,
    /// Chat-completions URL
    pub api_url: String,
    /// Model name sent in the request body
    pub model: String,
    /// Maximum tokens in the generated reply
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Upper bound for one remote attempt, in seconds
    pub timeout_seconds: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_COMPLETION_URL.to_string(),
            model: DEFAULT_COMPLETION_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout_seconds: DEFAULT_COMPLETION_TIMEOUT_SECS,
        }
    }
}

impl CompletionConfig {
    /// Whether a credential is configured and the remote path is enabled
    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// Get the per-call timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Server configuration
///
/// Contains all configuration needed to run the gateway:
/// - Server settings (host, port, TLS, static assets, idle timeout)
/// - Completion endpoint settings
/// - Security settings (CORS, rate limiting, connection limits)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    /// Directory of static client assets served for plain HTTP requests
    pub static_dir: Option<PathBuf>,

    /// Close WebSocket channels after this many seconds without inbound traffic
    pub idle_timeout_seconds: u64,

    // Completion endpoint
    pub completion: CompletionConfig,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,

    // Rate limiting configuration
    /// Maximum requests per second per IP address
    /// Default: 60
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    /// Default: 10
    pub rate_limit_burst_size: u32,

    // Connection limits
    /// Maximum concurrent WebSocket connections
    /// Default: None (unlimited)
    pub max_websocket_connections: Option<usize>,
    /// Maximum connections per IP address
    /// Default: 100
    pub max_connections_per_ip: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3002,
            tls: None,
            static_dir: None,
            idle_timeout_seconds: DEFAULT_IDLE_TIMEOUT_SECS,
            completion: CompletionConfig::default(),
            cors_allowed_origins: None,
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
            max_websocket_connections: None,
            max_connections_per_ip: 100,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// The .env file is loaded in main.rs at startup, so its values are already
    /// visible here as environment variables.
    ///
    /// # Errors
    /// Returns an error if an environment variable has an invalid format or the
    /// resulting configuration fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = merge::merge_config(None)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let yaml_config = YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Get the idle timeout as a `Duration`
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }
}
