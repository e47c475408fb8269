//! Application state for dependency injection.

use std::sync::Arc;

use crate::clients::{ClientSetupError, PostClient, ServiceClient, UserClient};
use crate::config::GatewayConfig;
use crate::services::{FeedAggregator, ProfileAggregator, RateLimiter, TokenVerifier};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub user_client: Arc<UserClient>,
    pub post_client: Arc<PostClient>,
    pub feed_aggregator: Arc<FeedAggregator>,
    pub profile_aggregator: Arc<ProfileAggregator>,
    pub token_verifier: Arc<TokenVerifier>,
    pub rate_limiter: Arc<RateLimiter>,
    pub auth_rate_limiter: Arc<RateLimiter>,
    pub config: Arc<GatewayConfig>,
}

impl AppState {
    /// Wire clients, limiters and the aggregator from configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, ClientSetupError> {
        let user_service = ServiceClient::new(&config.user_service, config.internal_secret())?;
        let post_service = ServiceClient::new(&config.post_service, config.internal_secret())?;

        let user_client = Arc::new(UserClient::new(Arc::new(user_service)));
        let post_client = Arc::new(PostClient::new(Arc::new(post_service)));

        let feed_aggregator = Arc::new(FeedAggregator::new(
            user_client.clone(),
            post_client.clone(),
            config.feed_author_concurrency,
        ));
        let profile_aggregator = Arc::new(ProfileAggregator::new(
            user_client.clone(),
            post_client.clone(),
        ));

        Ok(Self {
            user_client,
            post_client,
            feed_aggregator,
            profile_aggregator,
            token_verifier: Arc::new(TokenVerifier::new(config.jwt.secret.as_bytes())),
            rate_limiter: Arc::new(RateLimiter::new(&config.rate_limit)),
            auth_rate_limiter: Arc::new(RateLimiter::new(&config.auth_rate_limit)),
            config: Arc::new(config),
        })
    }
}
