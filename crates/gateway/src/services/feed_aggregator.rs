//! Personalised feed assembly.
//!
//! The following list and the post list are the primary path: if either call
//! fails the whole feed fails. Author lookups are secondary: each one runs in
//! a bounded group and a failure is replaced by a placeholder author.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::http::StatusCode;
use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{debug, error, warn};

use common::AppError;
use domain::{
    sort_for_feed, AuthorSummary, Feed, FeedEntry, Identity, MissingAuthor, PostSummary,
    FEED_MESSAGE_NOT_FOLLOWING, FEED_MESSAGE_NO_POSTS, FEED_MESSAGE_OK, MAX_FEED_LIMIT,
};

use crate::clients::{ClientError, PostCatalog, UpstreamError, UserDirectory};

/// Primary-path failure while building a feed.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("{step} failed: {source}")]
    Unavailable {
        step: &'static str,
        #[source]
        source: ClientError,
    },
    #[error(transparent)]
    Rejected(UpstreamError),
}

impl FeedError {
    fn from_client(step: &'static str, err: ClientError) -> Self {
        if err.is_unavailable() {
            return FeedError::Unavailable { step, source: err };
        }
        match err {
            ClientError::Upstream(e) => FeedError::Rejected(e),
            transport => FeedError::Unavailable {
                step,
                source: transport,
            },
        }
    }
}

impl From<FeedError> for AppError {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::Unavailable { step, source } => {
                error!(step, service = source.service(), error = %source, "Feed primary path failed");
                AppError::FeedUnavailable
            }
            FeedError::Rejected(e) => e.into_relay(),
        }
    }
}

/// Joins the social graph, posts and author profiles into one feed.
pub struct FeedAggregator {
    users: Arc<dyn UserDirectory>,
    posts: Arc<dyn PostCatalog>,
    author_concurrency: usize,
}

impl FeedAggregator {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        posts: Arc<dyn PostCatalog>,
        author_concurrency: usize,
    ) -> Self {
        Self {
            users,
            posts,
            author_concurrency: author_concurrency.max(1),
        }
    }

    /// Build the feed for `caller`, newest first, at most `limit` entries.
    pub async fn build_feed(&self, caller: &Identity, limit: u32) -> Result<Feed, FeedError> {
        let limit = limit.clamp(1, MAX_FEED_LIMIT);

        let following = self
            .users
            .following(caller)
            .await
            .map_err(|e| FeedError::from_client("following", e))?;
        let following = dedup_in_order(following);

        if following.is_empty() {
            return Ok(Feed::empty(FEED_MESSAGE_NOT_FOLLOWING));
        }

        let mut posts = self
            .posts
            .posts_from_users(caller, &following, limit)
            .await
            .map_err(|e| FeedError::from_client("posts", e))?;

        let followed: HashSet<i64> = following.iter().copied().collect();
        posts.retain(|post| followed.contains(&post.author_id));
        sort_for_feed(&mut posts);
        posts.truncate(limit as usize);

        if posts.is_empty() {
            return Ok(Feed::empty(FEED_MESSAGE_NO_POSTS));
        }

        let authors = self.resolve_authors(caller, &posts).await;

        let entries = posts
            .into_iter()
            .map(|post| {
                let author = authors.get(&post.author_id).cloned().unwrap_or_else(|| {
                    AuthorSummary::placeholder(post.author_id, MissingAuthor::Unknown)
                });
                FeedEntry { post, author }
            })
            .collect();

        Ok(Feed::new(entries, FEED_MESSAGE_OK))
    }

    /// Look up every distinct author, at most `author_concurrency` at a time.
    async fn resolve_authors(
        &self,
        caller: &Identity,
        posts: &[PostSummary],
    ) -> HashMap<i64, AuthorSummary> {
        let author_ids = dedup_in_order(posts.iter().map(|post| post.author_id).collect());
        debug!(
            authors = author_ids.len(),
            concurrency = self.author_concurrency,
            "Resolving feed authors"
        );

        stream::iter(author_ids)
            .map(|author_id| async move {
                let author = match self.users.author(caller, author_id).await {
                    Ok(author) => author,
                    Err(e) => {
                        let reason = missing_reason(&e);
                        warn!(author_id, error = %e, ?reason, "Author lookup failed, using placeholder");
                        AuthorSummary::placeholder(author_id, reason)
                    }
                };
                (author_id, author)
            })
            .buffer_unordered(self.author_concurrency)
            .collect()
            .await
    }
}

fn missing_reason(err: &ClientError) -> MissingAuthor {
    if err.status() == Some(StatusCode::NOT_FOUND) {
        MissingAuthor::Deleted
    } else {
        MissingAuthor::Unknown
    }
}

/// Drop repeated ids, keeping the first occurrence of each.
fn dedup_in_order(ids: Vec<i64>) -> Vec<i64> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
