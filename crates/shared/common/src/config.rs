//! Shared configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Token verification configuration.
#[derive(Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Longest window a rate limiter will use. Larger settings are clamped.
pub const MAX_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Fixed-window rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub max_requests: u64,
    /// Window size in milliseconds
    pub window_ms: u64,
    /// Expired windows are swept this often
    pub sweep_interval_seconds: u64,
    /// Most client keys tracked at once; new keys past this are refused
    pub max_tracked_clients: usize,
}

impl RateLimitConfig {
    /// Window length, clamped to [`MAX_RATE_LIMIT_WINDOW`].
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms).min(MAX_RATE_LIMIT_WINDOW)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds.max(1))
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_ms: 60_000,
            sweep_interval_seconds: 60,
            max_tracked_clients: 100_000,
        }
    }
}

/// Downstream HTTP client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceClientConfig {
    /// Service name used in logs
    pub name: String,
    /// Base URL (e.g., "http://localhost:4001")
    pub base_url: String,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl ServiceClientConfig {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ServiceClientConfig {
    fn default() -> Self {
        Self {
            name: "service".to_string(),
            base_url: "http://localhost:4001".to_string(),
            connect_timeout_ms: 2000,
            request_timeout_ms: 5000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_window_is_clamped() {
        let config = RateLimitConfig {
            window_ms: u64::MAX,
            ..RateLimitConfig::default()
        };
        assert_eq!(config.window(), MAX_RATE_LIMIT_WINDOW);
        assert_eq!(RateLimitConfig::default().window(), Duration::from_secs(60));
    }

    #[test]
    fn jwt_secret_is_redacted_in_debug() {
        let config = JwtConfig {
            secret: "super-secret-value".to_string(),
        };
        assert!(!format!("{:?}", config).contains("super-secret-value"));
    }
}
