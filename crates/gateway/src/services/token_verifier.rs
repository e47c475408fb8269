//! Bearer credential verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use common::AppError;
use domain::{Identity, ROLE_USER};

/// Why a credential was refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("credential missing")]
    MissingCredential,
    #[error("credential invalid")]
    InvalidCredential,
    #[error("credential expired")]
    ExpiredCredential,
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredential => AppError::MissingCredential,
            AuthError::InvalidCredential => AppError::InvalidCredential,
            AuthError::ExpiredCredential => AppError::ExpiredCredential,
        }
    }
}

/// Claims issued by the User Service on login.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub iat: i64,
    pub exp: i64,
}

/// Verifies HS256 tokens signed with the secret shared with the issuer.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Verify a raw token and extract the caller identity.
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::MissingCredential);
        }

        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredCredential,
                _ => AuthError::InvalidCredential,
            }
        })?;
        let claims = data.claims;

        let issued_at = timestamp(claims.iat)?;
        let expires_at = timestamp(claims.exp)?;
        let role = claims.role.unwrap_or_else(|| ROLE_USER.to_string());

        Identity::new(claims.id, claims.username, role, issued_at, expires_at)
            .map_err(|_| AuthError::InvalidCredential)
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, AuthError> {
    DateTime::from_timestamp(secs, 0).ok_or(AuthError::InvalidCredential)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{sign, SECRET};
    use jsonwebtoken::{encode, EncodingKey, Header};

    #[test]
    fn valid_token_yields_identity() {
        let verifier = TokenVerifier::new(SECRET.as_bytes());
        let identity = verifier.verify(&sign(42, 3600, SECRET)).unwrap();
        assert_eq!(identity.user_id, 42);
        assert_eq!(identity.username, "user42");
        assert_eq!(identity.role, "user");
        assert!(identity.expires_at > identity.issued_at);
    }

    #[test]
    fn wrong_signature_is_invalid() {
        let verifier = TokenVerifier::new(SECRET.as_bytes());
        let token = sign(42, 3600, "some-other-secret-that-is-32-chars-long");
        assert_eq!(verifier.verify(&token), Err(AuthError::InvalidCredential));
    }

    #[test]
    fn expired_token_is_expired() {
        let verifier = TokenVerifier::new(SECRET.as_bytes());
        let token = sign(42, -10, SECRET);
        assert_eq!(verifier.verify(&token), Err(AuthError::ExpiredCredential));
    }

    #[test]
    fn garbage_and_empty_tokens() {
        let verifier = TokenVerifier::new(SECRET.as_bytes());
        assert_eq!(verifier.verify("not.a.jwt"), Err(AuthError::InvalidCredential));
        assert_eq!(verifier.verify("  "), Err(AuthError::MissingCredential));
    }

    #[test]
    fn non_positive_user_id_is_invalid() {
        let verifier = TokenVerifier::new(SECRET.as_bytes());
        assert_eq!(
            verifier.verify(&sign(0, 3600, SECRET)),
            Err(AuthError::InvalidCredential)
        );
    }

    #[test]
    fn missing_role_defaults_to_user() {
        let now = Utc::now().timestamp();
        let token = encode(
            &Header::default(),
            &serde_json::json!({ "id": 3, "username": "carol", "iat": now, "exp": now + 60 }),
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let identity = TokenVerifier::new(SECRET.as_bytes()).verify(&token).unwrap();
        assert_eq!(identity.role, ROLE_USER);
    }
}
