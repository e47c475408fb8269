//! Token signing helpers shared by unit tests.

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};

use super::Claims;

pub(crate) const SECRET: &str = "test-secret-key-for-testing-only-32chars";

/// HS256 token for user `id`, expiring `exp_offset_secs` from now.
pub(crate) fn sign(id: i64, exp_offset_secs: i64, secret: &str) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        id,
        username: format!("user{}", id),
        role: Some("user".to_string()),
        iat: now,
        exp: now + exp_offset_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
