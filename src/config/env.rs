//! Environment variable access for configuration loading

use std::fmt::Display;
use std::str::FromStr;

use super::ConfigError;

/// Read an environment variable, treating unset and blank values alike.
pub(super) fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Read the first non-blank value among several aliases.
pub(super) fn env_var_any(keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| env_var(key))
}

/// Parse an optional typed environment variable.
pub(super) fn parse_env<T>(key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match env_var(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key,
                value: raw,
                reason: e.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_env_var_blank_is_none() {
        unsafe {
            std::env::set_var("RELAY_TEST_BLANK", "   ");
        }
        assert_eq!(env_var("RELAY_TEST_BLANK"), None);
        unsafe {
            std::env::remove_var("RELAY_TEST_BLANK");
        }
    }

    #[test]
    #[serial]
    fn test_env_var_any_prefers_first() {
        unsafe {
            std::env::set_var("RELAY_TEST_A", "first");
            std::env::set_var("RELAY_TEST_B", "second");
        }
        assert_eq!(
            env_var_any(&["RELAY_TEST_A", "RELAY_TEST_B"]).as_deref(),
            Some("first")
        );
        unsafe {
            std::env::remove_var("RELAY_TEST_A");
        }
        assert_eq!(
            env_var_any(&["RELAY_TEST_A", "RELAY_TEST_B"]).as_deref(),
            Some("second")
        );
        unsafe {
            std::env::remove_var("RELAY_TEST_B");
        }
    }

    #[test]
    #[serial]
    fn test_parse_env_invalid_number() {
        unsafe {
            std::env::set_var("RELAY_TEST_NUM", "twelve");
        }
        let result: Result<Option<u32>, _> = parse_env("RELAY_TEST_NUM");
        match result {
            Err(ConfigError::InvalidValue { key, value, .. }) => {
                assert_eq!(key, "RELAY_TEST_NUM");
                assert_eq!(value, "twelve");
            }
            other => panic!("Expected InvalidValue, got {other:?}"),
        }
        unsafe {
            std::env::remove_var("RELAY_TEST_NUM");
        }
    }
}
