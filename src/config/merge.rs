//! Merge environment configuration with optional YAML overrides

use std::path::PathBuf;

use super::env::{env_var, env_var_any, parse_env};
use super::yaml::YamlConfig;
use super::{ApiCredential, CompletionConfig, ConfigError, ServerConfig, TlsConfig};

/// Environment names accepted for the completion credential, in priority order
const CREDENTIAL_ENV_VARS: &[&str] = &["GROQ_API_KEY", "COMPLETION_API_KEY"];

/// Build the configuration from environment variables, then apply YAML overrides.
pub(super) fn merge_config(yaml: Option<YamlConfig>) -> Result<ServerConfig, ConfigError> {
    let mut config = from_environment()?;

    if let Some(yaml) = yaml {
        apply_yaml(&mut config, yaml)?;
    }

    Ok(config)
}

fn from_environment() -> Result<ServerConfig, ConfigError> {
    let defaults = ServerConfig::default();
    let completion_defaults = CompletionConfig::default();

    let tls = match (env_var("TLS_CERT_PATH"), env_var("TLS_KEY_PATH")) {
        (None, None) => None,
        (Some(cert), Some(key)) => Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        }),
        _ => {
            return Err(ConfigError::Validation(
                "TLS_CERT_PATH and TLS_KEY_PATH must be set together".to_string(),
            ));
        }
    };

    let completion = CompletionConfig {
        api_key: env_var_any(CREDENTIAL_ENV_VARS).and_then(ApiCredential::new),
        api_url: env_var("COMPLETION_API_URL").unwrap_or(completion_defaults.api_url),
        model: env_var("COMPLETION_MODEL").unwrap_or(completion_defaults.model),
        max_tokens: parse_env("COMPLETION_MAX_TOKENS")?
            .unwrap_or(completion_defaults.max_tokens),
        temperature: parse_env("COMPLETION_TEMPERATURE")?
            .unwrap_or(completion_defaults.temperature),
        timeout_seconds: parse_env("COMPLETION_TIMEOUT_SECONDS")?
            .unwrap_or(completion_defaults.timeout_seconds),
    };

    Ok(ServerConfig {
        host: env_var("HOST").unwrap_or(defaults.host),
        port: parse_env("PORT")?.unwrap_or(defaults.port),
        tls,
        static_dir: env_var("STATIC_DIR").map(PathBuf::from),
        idle_timeout_seconds: parse_env("WS_IDLE_TIMEOUT_SECONDS")?
            .unwrap_or(defaults.idle_timeout_seconds),
        completion,
        cors_allowed_origins: env_var("CORS_ALLOWED_ORIGINS"),
        rate_limit_requests_per_second: parse_env("RATE_LIMIT_REQUESTS_PER_SECOND")?
            .unwrap_or(defaults.rate_limit_requests_per_second),
        rate_limit_burst_size: parse_env("RATE_LIMIT_BURST_SIZE")?
            .unwrap_or(defaults.rate_limit_burst_size),
        max_websocket_connections: parse_env("MAX_WEBSOCKET_CONNECTIONS")?,
        max_connections_per_ip: parse_env("MAX_CONNECTIONS_PER_IP")?
            .unwrap_or(defaults.max_connections_per_ip),
    })
}

fn apply_yaml(config: &mut ServerConfig, yaml: YamlConfig) -> Result<(), ConfigError> {
    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if let Some(dir) = server.static_dir {
            config.static_dir = Some(PathBuf::from(dir));
        }
        if let Some(idle) = server.idle_timeout_seconds {
            config.idle_timeout_seconds = idle;
        }
        if let Some(tls) = server.tls {
            match (tls.cert_path, tls.key_path) {
                (None, None) => {}
                (Some(cert), Some(key)) => {
                    config.tls = Some(TlsConfig {
                        cert_path: PathBuf::from(cert),
                        key_path: PathBuf::from(key),
                    });
                }
                _ => {
                    return Err(ConfigError::Validation(
                        "server.tls requires both cert_path and key_path".to_string(),
                    ));
                }
            }
        }
    }

    if let Some(completion) = yaml.completion {
        if let Some(key) = completion.api_key {
            // An explicit blank key in YAML disables the remote path
            config.completion.api_key = ApiCredential::new(key);
        }
        if let Some(url) = completion.api_url {
            config.completion.api_url = url;
        }
        if let Some(model) = completion.model {
            config.completion.model = model;
        }
        if let Some(max_tokens) = completion.max_tokens {
            config.completion.max_tokens = max_tokens;
        }
        if let Some(temperature) = completion.temperature {
            config.completion.temperature = temperature;
        }
        if let Some(timeout) = completion.timeout_seconds {
            config.completion.timeout_seconds = timeout;
        }
    }

    if let Some(security) = yaml.security {
        if let Some(origins) = security.cors_allowed_origins {
            config.cors_allowed_origins = Some(origins);
        }
        if let Some(rps) = security.rate_limit_requests_per_second {
            config.rate_limit_requests_per_second = rps;
        }
        if let Some(burst) = security.rate_limit_burst_size {
            config.rate_limit_burst_size = burst;
        }
        if let Some(max) = security.max_websocket_connections {
            config.max_websocket_connections = Some(max);
        }
        if let Some(per_ip) = security.max_connections_per_ip {
            config.max_connections_per_ip = per_ip;
        }
    }

    Ok(())
}
