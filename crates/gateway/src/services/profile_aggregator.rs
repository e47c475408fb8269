//! Profile assembly for `GET /users/profile/:userId`.
//!
//! The user's details are the primary path. Follower and following counts
//! and the user's posts are secondary: a failed lookup leaves its field
//! `null` instead of failing the profile. The User Service only counts
//! followers for the calling user, so counts are filled in only when the
//! caller views their own profile.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{error, warn};

use common::AppError;
use domain::Identity;

use crate::clients::{ClientError, ClientResult, PostCatalog, UpstreamError, UserDirectory};

/// Fields the gateway adds on top of the stored details.
const PROFILE_FIELDS: [&str; 3] = ["followers", "following", "posts"];

/// User details merged with counts and posts.
#[derive(Debug, Serialize)]
pub struct Profile {
    #[serde(flatten)]
    pub details: Map<String, Value>,
    pub followers: Option<u64>,
    pub following: Option<u64>,
    pub posts: Option<Vec<Value>>,
}

/// Failure of the details lookup.
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("profile details failed: {0}")]
    Unavailable(#[source] ClientError),
    #[error(transparent)]
    Rejected(UpstreamError),
}

impl From<ClientError> for ProfileError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Upstream(e) if !e.status.is_server_error() => ProfileError::Rejected(e),
            other => ProfileError::Unavailable(other),
        }
    }
}

impl From<ProfileError> for AppError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::Unavailable(source) => {
                error!(service = source.service(), error = %source, "Profile details lookup failed");
                AppError::service_unavailable(source.service())
            }
            ProfileError::Rejected(e) => e.into_relay(),
        }
    }
}

/// Joins a user's details, social counts and posts.
pub struct ProfileAggregator {
    users: Arc<dyn UserDirectory>,
    posts: Arc<dyn PostCatalog>,
}

impl ProfileAggregator {
    pub fn new(users: Arc<dyn UserDirectory>, posts: Arc<dyn PostCatalog>) -> Self {
        Self { users, posts }
    }

    /// Build the profile of `user_id` as seen by `caller`. All lookups run
    /// concurrently.
    pub async fn build_profile(
        &self,
        caller: &Identity,
        user_id: i64,
    ) -> Result<Profile, ProfileError> {
        let own = caller.user_id == user_id;

        let (details, followers, following, posts) = tokio::join!(
            self.users.details(caller, user_id),
            async {
                if own {
                    secondary("followers", self.users.follower_count(caller).await)
                } else {
                    None
                }
            },
            async {
                if own {
                    secondary("following", self.users.following_count(caller).await)
                } else {
                    None
                }
            },
            async { secondary("posts", self.posts.posts_by_user(caller, user_id).await) },
        );

        let mut details = details?;
        for field in PROFILE_FIELDS {
            details.remove(field);
        }

        Ok(Profile {
            details,
            followers,
            following,
            posts,
        })
    }
}

fn secondary<T>(step: &'static str, result: ClientResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(step, service = e.service(), error = %e, "Profile lookup failed, leaving it empty");
            None
        }
    }
}
