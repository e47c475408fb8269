//! Feed entities: posts, authors and the joined entries returned to callers.
//!
//! Posts and authors are owned by the Post and User services; the gateway
//! only holds transient copies for the lifetime of one feed request.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::{DELETED_AUTHOR_USERNAME, UNKNOWN_AUTHOR_USERNAME};

/// Post as returned by the Post Service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    #[serde(alias = "post_id")]
    pub post_id: i64,
    #[serde(alias = "author_id")]
    pub author_id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
    /// Tags in the order the author gave them
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    #[serde(default, alias = "media_url")]
    pub media_url: Option<String>,
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
}

impl PostSummary {
    /// Feed order: newest first, higher post id first on equal timestamps.
    pub fn feed_order(a: &PostSummary, b: &PostSummary) -> Ordering {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.post_id.cmp(&a.post_id))
    }
}

/// Sort posts into feed order. Stable, so equal keys keep their input order.
pub fn sort_for_feed(posts: &mut [PostSummary]) {
    posts.sort_by(PostSummary::feed_order);
}

/// Why an author could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingAuthor {
    /// The User Service no longer knows this id
    Deleted,
    /// The lookup failed for any other reason
    Unknown,
}

/// Public author fields attached to each feed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    #[serde(default, alias = "user_id", alias = "id")]
    pub user_id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub username: String,
    #[serde(default, alias = "first_name", alias = "firstname", deserialize_with = "null_as_empty")]
    pub first_name: String,
    #[serde(default, alias = "last_name", alias = "lastname", deserialize_with = "null_as_empty")]
    pub last_name: String,
}

impl AuthorSummary {
    /// Stand-in used when the author lookup failed.
    pub fn placeholder(user_id: i64, reason: MissingAuthor) -> Self {
        let username = match reason {
            MissingAuthor::Deleted => DELETED_AUTHOR_USERNAME,
            MissingAuthor::Unknown => UNKNOWN_AUTHOR_USERNAME,
        };

        Self {
            user_id,
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
        }
    }

    /// Check if this is a placeholder rather than a resolved author.
    pub fn is_placeholder(&self) -> bool {
        self.first_name.is_empty()
            && self.last_name.is_empty()
            && (self.username == DELETED_AUTHOR_USERNAME
                || self.username == UNKNOWN_AUTHOR_USERNAME)
    }
}

/// A post joined with its author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FeedEntry {
    #[serde(flatten)]
    pub post: PostSummary,
    pub author: AuthorSummary,
}

/// Feed response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Feed {
    pub feed: Vec<FeedEntry>,
    /// Always equal to the number of entries
    pub count: usize,
    pub message: String,
}

impl Feed {
    pub fn new(entries: Vec<FeedEntry>, message: impl Into<String>) -> Self {
        Self {
            count: entries.len(),
            feed: entries,
            message: message.into(),
        }
    }

    pub fn empty(message: impl Into<String>) -> Self {
        Self::new(Vec::new(), message)
    }
}

/// Treat an explicit JSON null like an absent field.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn post(id: i64, author: i64, secs: i64) -> PostSummary {
        PostSummary {
            post_id: id,
            author_id: author,
            title: format!("post {}", id),
            content: String::new(),
            tags: vec![],
            media_url: None,
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    #[test]
    fn feed_order_is_newest_first_then_highest_id() {
        let mut posts = vec![post(1, 5, 100), post(3, 7, 200), post(2, 5, 200), post(9, 7, 50)];
        sort_for_feed(&mut posts);
        let ids: Vec<i64> = posts.iter().map(|p| p.post_id).collect();
        assert_eq!(ids, vec![3, 2, 1, 9]);
    }

    #[test]
    fn placeholder_usernames_depend_on_reason() {
        let deleted = AuthorSummary::placeholder(5, MissingAuthor::Deleted);
        let unknown = AuthorSummary::placeholder(5, MissingAuthor::Unknown);
        assert_eq!(deleted.username, "Deleted User");
        assert_eq!(unknown.username, "Unknown User");
        assert_eq!(deleted.user_id, 5);
        assert!(deleted.is_placeholder());
        assert!(unknown.is_placeholder());
    }

    #[test]
    fn post_accepts_snake_case_and_nulls() {
        let json = serde_json::json!({
            "post_id": 11,
            "author_id": 5,
            "title": "hello",
            "content": null,
            "tags": null,
            "media_url": null,
            "created_at": "2024-05-01T10:00:00Z"
        });
        let parsed: PostSummary = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.post_id, 11);
        assert_eq!(parsed.author_id, 5);
        assert!(parsed.content.is_empty());
        assert!(parsed.tags.is_empty());
        assert!(parsed.media_url.is_none());
    }

    #[test]
    fn author_accepts_service_field_names() {
        let json = serde_json::json!({
            "user_id": 7,
            "username": "bob",
            "first_name": "Bob",
            "last_name": null
        });
        let parsed: AuthorSummary = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.user_id, 7);
        assert_eq!(parsed.first_name, "Bob");
        assert_eq!(parsed.last_name, "");
        assert!(!parsed.is_placeholder());
    }

    #[test]
    fn entry_serializes_flat_post_with_nested_author() {
        let entry = FeedEntry {
            post: post(4, 7, 10),
            author: AuthorSummary::placeholder(7, MissingAuthor::Unknown),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["postId"], 4);
        assert_eq!(value["authorId"], 7);
        assert_eq!(value["author"]["username"], "Unknown User");
        assert_eq!(value["author"]["userId"], 7);
    }

    #[test]
    fn feed_count_tracks_entries() {
        let feed = Feed::new(
            vec![FeedEntry {
                post: post(1, 5, 1),
                author: AuthorSummary::placeholder(5, MissingAuthor::Deleted),
            }],
            "ok",
        );
        assert_eq!(feed.count, 1);
        assert_eq!(Feed::empty("none").count, 0);
    }
}
