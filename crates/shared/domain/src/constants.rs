//! Domain-level constants.
//!
//! These constants define the gateway's wire contract and business rules.

// =============================================================================
// Roles
// =============================================================================

/// Role assumed when a credential carries none
pub const ROLE_USER: &str = "user";

// =============================================================================
// Authentication
// =============================================================================

/// Minimum secret length for signing keys and the internal channel secret
pub const MIN_SECRET_LENGTH: usize = 32;

// =============================================================================
// Internal Channel
// =============================================================================

/// Header carrying the authenticated caller's id to downstream services
pub const HEADER_USER_ID: &str = "x-user-id";

/// Header carrying the shared secret that authorizes the gateway downstream
pub const HEADER_INTERNAL_SECRET: &str = "x-internal-secret";

// =============================================================================
// Feed
// =============================================================================

/// Number of entries returned when the caller gives no limit
pub const DEFAULT_FEED_LIMIT: u32 = 50;

/// Largest limit a caller may request
pub const MAX_FEED_LIMIT: u32 = 100;

/// Placeholder username for authors the User Service reports as gone
pub const DELETED_AUTHOR_USERNAME: &str = "Deleted User";

/// Placeholder username for authors whose lookup failed for any other reason
pub const UNKNOWN_AUTHOR_USERNAME: &str = "Unknown User";

pub const FEED_MESSAGE_OK: &str = "Feed retrieved successfully.";
pub const FEED_MESSAGE_NOT_FOLLOWING: &str = "You are not following anyone yet.";
pub const FEED_MESSAGE_NO_POSTS: &str = "No posts from the users you follow yet.";
