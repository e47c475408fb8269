//! Domain layer - Feed entities and caller identity.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.

pub mod constants;
pub mod error;
pub mod feed;
pub mod identity;

pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use feed::{sort_for_feed, AuthorSummary, Feed, FeedEntry, MissingAuthor, PostSummary};
pub use identity::Identity;
