//! Gateway-owned request logic.

mod feed_aggregator;
mod profile_aggregator;
mod rate_limiter;
mod token_verifier;

#[cfg(test)]
pub(crate) mod test_support;

pub use feed_aggregator::{FeedAggregator, FeedError};
pub use profile_aggregator::{Profile, ProfileAggregator, ProfileError};
pub use rate_limiter::{Admission, RateLimiter};
pub use token_verifier::{AuthError, Claims, TokenVerifier};
