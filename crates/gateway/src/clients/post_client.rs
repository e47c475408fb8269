//! HTTP client for post-service.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use domain::{Identity, PostSummary};

use super::service_client::{ClientResult, ServiceClient};
use super::PostCatalog;

#[derive(Debug, Deserialize)]
struct PostsResponse {
    #[serde(default, alias = "data")]
    posts: Vec<PostSummary>,
}

/// `GET /posts/by-user/:id` answers `{data: [...]}`; entries are relayed untouched.
#[derive(Debug, Deserialize)]
struct UserPostsResponse {
    #[serde(default, alias = "posts")]
    data: Vec<Value>,
}

/// Client wrapper for post-service.
pub struct PostClient {
    service: Arc<ServiceClient>,
}

impl PostClient {
    pub fn new(service: Arc<ServiceClient>) -> Self {
        Self { service }
    }

    /// Underlying transport, used for 1:1 forwarding.
    pub fn service(&self) -> &ServiceClient {
        &self.service
    }
}

#[async_trait]
impl PostCatalog for PostClient {
    async fn posts_from_users(
        &self,
        caller: &Identity,
        author_ids: &[i64],
        limit: u32,
    ) -> ClientResult<Vec<PostSummary>> {
        let ids = author_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let path = format!("/posts/from-users?ids={}&limit={}", ids, limit);

        let response: PostsResponse = self.service.get_json(&path, Some(caller)).await?;
        Ok(response.posts)
    }

    async fn posts_by_user(&self, caller: &Identity, user_id: i64) -> ClientResult<Vec<Value>> {
        let response: UserPostsResponse = self
            .service
            .get_json(&format!("/posts/by-user/{}", user_id), Some(caller))
            .await?;
        Ok(response.data)
    }
}
