//! HTTP client for user-service.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use domain::{AuthorSummary, Identity};

use super::service_client::{ClientError, ClientResult, ServiceClient, TransportError};
use super::UserDirectory;

#[derive(Debug, Deserialize)]
struct FollowingResponse {
    #[serde(default)]
    following: Vec<i64>,
    count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct FollowersResponse {
    #[serde(default)]
    followers: Vec<Value>,
    count: Option<u64>,
}

/// `GET /users/:id` answers either a bare author or one wrapped in `user`/`data`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AuthorPayload {
    Wrapped {
        #[serde(alias = "data")]
        user: AuthorSummary,
    },
    Bare(AuthorSummary),
}

impl AuthorPayload {
    fn into_author(self) -> AuthorSummary {
        match self {
            AuthorPayload::Wrapped { user } => user,
            AuthorPayload::Bare(author) => author,
        }
    }
}

/// Client wrapper for user-service.
pub struct UserClient {
    service: Arc<ServiceClient>,
}

impl UserClient {
    pub fn new(service: Arc<ServiceClient>) -> Self {
        Self { service }
    }

    /// Underlying transport, used for 1:1 forwarding.
    pub fn service(&self) -> &ServiceClient {
        &self.service
    }
}

#[async_trait]
impl UserDirectory for UserClient {
    async fn following(&self, caller: &Identity) -> ClientResult<Vec<i64>> {
        let response: FollowingResponse = self
            .service
            .get_json("/users/following", Some(caller))
            .await?;
        Ok(response.following)
    }

    async fn author(&self, caller: &Identity, author_id: i64) -> ClientResult<AuthorSummary> {
        let payload: AuthorPayload = self
            .service
            .get_json(&format!("/users/{}", author_id), Some(caller))
            .await?;

        // Every field defaults, so an unrelated JSON object would decode
        // as a blank author. A username is the one field we insist on.
        let mut author = payload.into_author();
        if author.username.trim().is_empty() {
            return Err(ClientError::transport(
                self.service.name(),
                TransportError::Decode(format!("user {} payload has no username", author_id)),
            ));
        }

        // Trust the id we asked for over whatever the payload echoes back
        author.user_id = author_id;
        Ok(author)
    }

    async fn details(&self, caller: &Identity, user_id: i64) -> ClientResult<Map<String, Value>> {
        self.service
            .get_json(&format!("/users/details/{}", user_id), Some(caller))
            .await
    }

    async fn follower_count(&self, caller: &Identity) -> ClientResult<u64> {
        let response: FollowersResponse = self
            .service
            .get_json("/users/followers", Some(caller))
            .await?;
        Ok(response
            .count
            .unwrap_or(response.followers.len() as u64))
    }

    async fn following_count(&self, caller: &Identity) -> ClientResult<u64> {
        let response: FollowingResponse = self
            .service
            .get_json("/users/following", Some(caller))
            .await?;
        Ok(response
            .count
            .unwrap_or(response.following.len() as u64))
    }
}
