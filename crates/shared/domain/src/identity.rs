//! Caller identity extracted from a verified credential.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Authenticated caller. Lives for exactly one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Identity {
    /// Build an identity, rejecting ids below 1.
    pub fn new(
        user_id: i64,
        username: impl Into<String>,
        role: impl Into<String>,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if user_id < 1 {
            return Err(DomainError::validation(format!(
                "user id must be positive, got {}",
                user_id
            )));
        }

        Ok(Self {
            user_id,
            username: username.into(),
            role: role.into(),
            issued_at,
            expires_at,
        })
    }
}
