//! Gateway configuration.

use std::env;
use std::str::FromStr;

use thiserror::Error;
use tracing::warn;

use common::{JwtConfig, RateLimitConfig, ServiceClientConfig};
use domain::MIN_SECRET_LENGTH;

const DEV_JWT_SECRET: &str = "dev-jwt-secret-minimum-32-chars!!";
const DEV_INTERNAL_SECRET: &str = "dev-internal-secret-minimum-32-chars";

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} environment variable must be set")]
    Missing(&'static str),

    #[error("{0} must be at least {1} characters long")]
    TooShort(&'static str, usize),
}

/// Gateway configuration.
#[derive(Clone)]
pub struct GatewayConfig {
    /// User service base URL
    pub user_service: ServiceClientConfig,
    /// Post service base URL
    pub post_service: ServiceClientConfig,
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Bearer token verification
    pub jwt: JwtConfig,
    /// Shared secret presented to downstream services
    internal_secret: String,
    /// General rate limit
    pub rate_limit: RateLimitConfig,
    /// Stricter rate limit for /register and /login
    pub auth_rate_limit: RateLimitConfig,
    /// Honour X-Forwarded-For / X-Real-IP when keying the rate limiter
    pub trust_proxy_headers: bool,
    /// Maximum author lookups in flight per feed request
    pub feed_author_concurrency: usize,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("user_service", &self.user_service)
            .field("post_service", &self.post_service)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("jwt", &self.jwt)
            .field("internal_secret", &"[REDACTED]")
            .field("rate_limit", &self.rate_limit)
            .field("auth_rate_limit", &self.auth_rate_limit)
            .field("trust_proxy_headers", &self.trust_proxy_headers)
            .field("feed_author_concurrency", &self.feed_author_concurrency)
            .finish()
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let timeout_ms = parse_or("DOWNSTREAM_TIMEOUT_MS", 5000);

        let mut user_service = ServiceClientConfig::new(
            "user-service",
            env::var("USER_SERVICE_URL").unwrap_or_else(|_| "http://localhost:4001".to_string()),
        );
        user_service.request_timeout_ms = timeout_ms;

        let mut post_service = ServiceClientConfig::new(
            "post-service",
            env::var("POST_SERVICE_URL").unwrap_or_else(|_| "http://localhost:4002".to_string()),
        );
        post_service.request_timeout_ms = timeout_ms;

        let sweep_interval_seconds = parse_or("RATE_LIMIT_SWEEP_INTERVAL_SECONDS", 60);
        let max_tracked_clients = parse_or("RATE_LIMIT_MAX_CLIENTS", 100_000);

        Ok(Self {
            user_service,
            post_service,
            host: env::var("GATEWAY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("GATEWAY_PORT", 3000),
            jwt: JwtConfig {
                secret: load_secret("JWT_SECRET", DEV_JWT_SECRET)?,
            },
            internal_secret: load_secret("INTERNAL_SECRET", DEV_INTERNAL_SECRET)?,
            rate_limit: RateLimitConfig {
                max_requests: parse_or("RATE_LIMIT_REQUESTS", 100),
                window_ms: parse_or("RATE_LIMIT_WINDOW_MS", 60_000),
                sweep_interval_seconds,
                max_tracked_clients,
            },
            auth_rate_limit: RateLimitConfig {
                max_requests: parse_or("RATE_LIMIT_AUTH_REQUESTS", 10),
                window_ms: parse_or("RATE_LIMIT_AUTH_WINDOW_MS", 60_000),
                sweep_interval_seconds,
                max_tracked_clients,
            },
            trust_proxy_headers: parse_or("TRUST_PROXY_HEADERS", false),
            feed_author_concurrency: parse_or("FEED_AUTHOR_CONCURRENCY", 8usize).max(1),
        })
    }

    /// Build a configuration from explicit secrets, everything else default.
    pub fn with_secrets(
        jwt_secret: impl Into<String>,
        internal_secret: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let jwt_secret = check_secret("JWT_SECRET", jwt_secret.into())?;
        let internal_secret = check_secret("INTERNAL_SECRET", internal_secret.into())?;

        Ok(Self {
            user_service: ServiceClientConfig::new("user-service", "http://localhost:4001"),
            post_service: ServiceClientConfig::new("post-service", "http://localhost:4002"),
            host: "0.0.0.0".to_string(),
            port: 3000,
            jwt: JwtConfig { secret: jwt_secret },
            internal_secret,
            rate_limit: RateLimitConfig::default(),
            auth_rate_limit: RateLimitConfig {
                max_requests: 10,
                ..RateLimitConfig::default()
            },
            trust_proxy_headers: false,
            feed_author_concurrency: 8,
        })
    }

    /// Shared secret for the internal channel.
    pub fn internal_secret(&self) -> &str {
        &self.internal_secret
    }

    /// Full bind address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn load_secret(key: &'static str, dev_default: &str) -> Result<String, ConfigError> {
    let secret = match env::var(key) {
        Ok(value) => value,
        Err(_) if cfg!(debug_assertions) => {
            warn!("{} not set, using insecure default for development", key);
            dev_default.to_string()
        }
        Err(_) => return Err(ConfigError::Missing(key)),
    };
    check_secret(key, secret)
}

fn check_secret(key: &'static str, secret: String) -> Result<String, ConfigError> {
    if secret.len() < MIN_SECRET_LENGTH {
        return Err(ConfigError::TooShort(key, MIN_SECRET_LENGTH));
    }
    Ok(secret)
}
