//! Per-IP request rate limiting
//!
//! Wraps the router in a token bucket keyed on the client IP (proxy headers
//! first, then the peer address). The bucket holds `burst_size` requests and
//! refills one request every `1s / requests_per_second`.

use std::time::Duration;

use axum::Router;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tracing::info;

use crate::config::ConfigError;

/// Rates at or above this value disable the limiter (load testing)
pub const RATE_LIMIT_DISABLED_AT: u32 = 100_000;

/// Time to refill one request slot at the given rate.
pub fn replenish_period(requests_per_second: u32) -> Result<Duration, ConfigError> {
    if requests_per_second == 0 {
        return Err(ConfigError::Validation(
            "rate_limit_requests_per_second must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_secs(1) / requests_per_second)
}

/// Apply the per-IP rate limiter to `router`.
///
/// Returns the router untouched when the rate is at or above
/// [`RATE_LIMIT_DISABLED_AT`].
pub fn apply_rate_limit(
    router: Router,
    requests_per_second: u32,
    burst_size: u32,
) -> Result<Router, ConfigError> {
    if requests_per_second >= RATE_LIMIT_DISABLED_AT {
        info!("Rate limiting disabled (rate >= {}/s)", RATE_LIMIT_DISABLED_AT);
        return Ok(router);
    }

    let governor_config = GovernorConfigBuilder::default()
        .period(replenish_period(requests_per_second)?)
        .burst_size(burst_size)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .ok_or_else(|| {
            ConfigError::Validation(format!(
                "invalid rate limit: {requests_per_second}/s with burst {burst_size}"
            ))
        })?;

    info!(
        requests_per_second = requests_per_second,
        burst_size = burst_size,
        "Rate limiting enabled per client IP"
    );
    Ok(router.layer(GovernorLayer::new(governor_config)))
}
