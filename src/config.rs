//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;

use crate::error::ConfigError;

/// Longest response cache TTL accepted, in seconds (one year).
pub const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// TTL in seconds for cached GET responses
    pub cache_ttl: u64,
    /// Responses with larger bodies are served but not cached
    pub cache_max_body_bytes: usize,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Maximum attempts for retry-wrapped data service calls
    pub retry_max_retries: u32,
    /// Delay after the first failed attempt, in milliseconds
    pub retry_initial_delay_ms: u64,
    /// Cap on a single backoff delay, in milliseconds
    pub retry_max_delay_ms: u64,
    /// Backoff growth factor
    pub retry_backoff_multiplier: f64,
    /// Reverse proxies in front of the server that append to
    /// `X-Forwarded-For`; 0 means the peer address is the client
    pub trusted_proxy_hops: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_TTL` - Response cache TTL in seconds (default: 300)
    /// - `CACHE_MAX_BODY_BYTES` - Largest cacheable body (default: 1 MiB)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 60)
    /// - `RETRY_MAX_RETRIES` - Attempt budget (default: 3)
    /// - `RETRY_INITIAL_DELAY_MS` - First backoff delay (default: 1000)
    /// - `RETRY_MAX_DELAY_MS` - Backoff cap (default: 10000)
    /// - `RETRY_BACKOFF_MULTIPLIER` - Backoff factor (default: 2.0)
    /// - `TRUSTED_PROXY_HOPS` - Proxies trusted for client identity (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cache_ttl: env_or("CACHE_TTL", defaults.cache_ttl),
            cache_max_body_bytes: env_or("CACHE_MAX_BODY_BYTES", defaults.cache_max_body_bytes),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            retry_max_retries: env_or("RETRY_MAX_RETRIES", defaults.retry_max_retries),
            retry_initial_delay_ms: env_or(
                "RETRY_INITIAL_DELAY_MS",
                defaults.retry_initial_delay_ms,
            ),
            retry_max_delay_ms: env_or("RETRY_MAX_DELAY_MS", defaults.retry_max_delay_ms),
            retry_backoff_multiplier: env_or(
                "RETRY_BACKOFF_MULTIPLIER",
                defaults.retry_backoff_multiplier,
            ),
            trusted_proxy_hops: env_or("TRUSTED_PROXY_HOPS", defaults.trusted_proxy_hops),
        }
    }

    /// Checks values that would make the server misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl == 0 {
            return Err(ConfigError::Invalid("CACHE_TTL must be positive".to_string()));
        }
        if self.cache_ttl > MAX_CACHE_TTL_SECS {
            return Err(ConfigError::Invalid(format!(
                "CACHE_TTL must not exceed {} seconds, got {}",
                MAX_CACHE_TTL_SECS, self.cache_ttl
            )));
        }
        if self.cleanup_interval == 0 {
            return Err(ConfigError::Invalid(
                "CLEANUP_INTERVAL must be positive".to_string(),
            ));
        }
        crate::retry::RetryPolicy::from_config(self).validate()
    }
}

/// Parses `key` from the environment, falling back on absence or parse failure.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cache_ttl: 300,
            cache_max_body_bytes: 1024 * 1024,
            cleanup_interval: 60,
            retry_max_retries: 3,
            retry_initial_delay_ms: 1000,
            retry_max_delay_ms: 10_000,
            retry_backoff_multiplier: 2.0,
            trusted_proxy_hops: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cache_ttl, 300);
        assert_eq!(config.cleanup_interval, 60);
        assert_eq!(config.retry_max_retries, 3);
        assert_eq!(config.trusted_proxy_hops, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("SERVER_PORT");
        env::remove_var("CACHE_TTL");
        env::remove_var("CLEANUP_INTERVAL");
        env::remove_var("RETRY_MAX_RETRIES");

        let config = Config::from_env();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cache_ttl, 300);
        assert_eq!(config.cleanup_interval, 60);
        assert_eq!(config.retry_max_retries, 3);
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        env::set_var("LUNONEX_TEST_GARBAGE_PORT", "not-a-port");
        assert_eq!(env_or("LUNONEX_TEST_GARBAGE_PORT", 8080u16), 8080);
        env::remove_var("LUNONEX_TEST_GARBAGE_PORT");
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let config = Config {
            cache_ttl: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_ttl() {
        let at_limit = Config {
            cache_ttl: MAX_CACHE_TTL_SECS,
            ..Default::default()
        };
        assert!(at_limit.validate().is_ok());

        let too_long = Config {
            cache_ttl: u64::MAX,
            ..Default::default()
        };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_retry_settings() {
        let config = Config {
            retry_backoff_multiplier: 0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
