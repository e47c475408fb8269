//! HTTP clients for calling the backend services.

mod post_client;
mod service_client;
mod user_client;

use async_trait::async_trait;
use serde_json::{Map, Value};

use domain::{AuthorSummary, Identity, PostSummary};

pub use post_client::PostClient;
pub use service_client::{
    ClientError, ClientResult, ClientSetupError, OutboundRequest, ServiceClient, TransportError,
    UpstreamError, UpstreamResponse,
};
pub use user_client::UserClient;

/// Social graph and profile lookups owned by the User Service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Ids the caller follows, as reported (duplicates possible).
    async fn following(&self, caller: &Identity) -> ClientResult<Vec<i64>>;

    /// Public fields of one author.
    async fn author(&self, caller: &Identity, author_id: i64) -> ClientResult<AuthorSummary>;

    /// Full profile record of one user, as the User Service stores it.
    async fn details(&self, caller: &Identity, user_id: i64) -> ClientResult<Map<String, Value>>;

    /// How many users follow the caller.
    async fn follower_count(&self, caller: &Identity) -> ClientResult<u64>;

    /// How many users the caller follows.
    async fn following_count(&self, caller: &Identity) -> ClientResult<u64>;
}

/// Post lookups owned by the Post Service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostCatalog: Send + Sync {
    /// Most recent posts by any of `author_ids`, at most `limit`.
    async fn posts_from_users(
        &self,
        caller: &Identity,
        author_ids: &[i64],
        limit: u32,
    ) -> ClientResult<Vec<PostSummary>>;

    /// Every post by one user, passed through as stored.
    async fn posts_by_user(&self, caller: &Identity, user_id: i64) -> ClientResult<Vec<Value>>;
}
