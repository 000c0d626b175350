//! Configuration validation logic

use super::{ConfigError, ServerConfig};

/// Validate a merged configuration.
pub(super) fn validate(config: &ServerConfig) -> Result<(), ConfigError> {
    validate_completion(config)?;

    if config.idle_timeout_seconds == 0 {
        return Err(ConfigError::Validation(
            "idle timeout must be greater than zero".to_string(),
        ));
    }

    if config.max_websocket_connections == Some(0) {
        return Err(ConfigError::Validation(
            "max_websocket_connections must be greater than zero when set".to_string(),
        ));
    }

    if config.rate_limit_requests_per_second == 0 {
        return Err(ConfigError::Validation(
            "rate_limit_requests_per_second must be greater than zero".to_string(),
        ));
    }

    if config.rate_limit_burst_size == 0 {
        return Err(ConfigError::Validation(
            "rate_limit_burst_size must be greater than zero".to_string(),
        ));
    }

    if config.max_connections_per_ip == 0 {
        return Err(ConfigError::Validation(
            "max_connections_per_ip must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_completion(config: &ServerConfig) -> Result<(), ConfigError> {
    let completion = &config.completion;

    if !(0.0..=2.0).contains(&completion.temperature) {
        return Err(ConfigError::Validation(format!(
            "completion temperature must be within 0.0..=2.0, got {}",
            completion.temperature
        )));
    }

    if completion.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "completion max_tokens must be greater than zero".to_string(),
        ));
    }

    if completion.timeout_seconds == 0 {
        return Err(ConfigError::Validation(
            "completion timeout must be greater than zero".to_string(),
        ));
    }

    let url = url::Url::parse(&completion.api_url).map_err(|e| {
        ConfigError::Validation(format!(
            "completion api_url '{}' is not a valid URL: {e}",
            completion.api_url
        ))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation(format!(
            "completion api_url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if completion.model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "completion model must not be empty".to_string(),
        ));
    }

    Ok(())
}
