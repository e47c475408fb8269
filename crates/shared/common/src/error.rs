//! Unified error handling for the gateway's HTTP boundary.
//!
//! Every error the gateway produces itself becomes a JSON body with a
//! `message` field. Downstream rejections are relayed verbatim.

use axum::{
    body::Bytes,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use domain::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication
    #[error("Access token required")]
    MissingCredential,

    #[error("Invalid token")]
    InvalidCredential,

    #[error("Expired token")]
    ExpiredCredential,

    // Resource errors
    #[error("Resource not found")]
    NotFound,

    // Validation
    #[error("{0}")]
    Validation(String),

    // Rate limiting
    #[error("Too many requests")]
    TooManyRequests { retry_after_secs: u64 },

    // Downstream errors
    #[error("Service unavailable")]
    ServiceUnavailable(String),

    #[error("Feed is temporarily unavailable")]
    FeedUnavailable,

    #[error("Upstream rejected request with status {status}")]
    UpstreamRejected {
        status: StatusCode,
        body: Bytes,
        content_type: Option<HeaderValue>,
    },

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

/// Error response body for HTTP
#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
    code: &'static str,
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    retry_after: Option<String>,
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::MissingCredential => "UNAUTHORIZED",
            AppError::InvalidCredential => "INVALID_TOKEN",
            AppError::ExpiredCredential => "TOKEN_EXPIRED",
            AppError::NotFound => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::TooManyRequests { .. } => "TOO_MANY_REQUESTS",
            AppError::ServiceUnavailable(_) | AppError::FeedUnavailable => "SERVICE_UNAVAILABLE",
            AppError::UpstreamRejected { .. } => "UPSTREAM_REJECTED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingCredential => StatusCode::UNAUTHORIZED,
            AppError::InvalidCredential | AppError::ExpiredCredential => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::ServiceUnavailable(_) | AppError::FeedUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::UpstreamRejected { status, .. } => *status,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::InvalidCredential | AppError::ExpiredCredential => {
                "Invalid or expired token".to_string()
            }
            AppError::TooManyRequests { .. } => {
                "Rate limit exceeded. Try again later.".to_string()
            }
            AppError::ServiceUnavailable(service) => {
                tracing::error!("Service unavailable: {}", service);
                format!("Service {} is unavailable", service)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::UpstreamRejected {
                status,
                body,
                content_type,
            } => {
                let mut response = (status, body).into_response();
                let value = content_type
                    .unwrap_or_else(|| HeaderValue::from_static("application/json"));
                response.headers_mut().insert(header::CONTENT_TYPE, value);
                response
            }
            other => {
                let status = other.status();
                let retry_after = match &other {
                    AppError::TooManyRequests { retry_after_secs } => Some(*retry_after_secs),
                    _ => None,
                };
                let body = ErrorResponse {
                    message: other.user_message(),
                    code: other.code(),
                    retry_after: retry_after.map(|secs| format!("{}s", secs)),
                };

                let mut response = (status, Json(body)).into_response();
                if let Some(secs) = retry_after {
                    response
                        .headers_mut()
                        .insert(header::RETRY_AFTER, HeaderValue::from(secs));
                }
                response
            }
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => AppError::Validation(msg),
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Convenience constructors
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    pub fn service_unavailable(service: impl Into<String>) -> Self {
        AppError::ServiceUnavailable(service.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn credential_errors_map_to_401_and_403() {
        let missing = AppError::MissingCredential.into_response();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(missing).await["message"], "Access token required");

        let invalid = AppError::InvalidCredential.into_response();
        assert_eq!(invalid.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(invalid).await["message"], "Invalid or expired token");

        let expired = AppError::ExpiredCredential.into_response();
        assert_eq!(expired.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn rate_limit_body_carries_retry_after() {
        let response = AppError::TooManyRequests { retry_after_secs: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");

        let body = body_json(response).await;
        assert_eq!(body["retryAfter"], "42s");
        assert_eq!(body["message"], "Rate limit exceeded. Try again later.");
    }

    #[tokio::test]
    async fn upstream_rejection_is_relayed_verbatim() {
        let raw = br#"{"message":"User not found with id:9"}"#;
        let response = AppError::UpstreamRejected {
            status: StatusCode::NOT_FOUND,
            body: Bytes::from_static(raw),
            content_type: Some(HeaderValue::from_static("application/json; charset=utf-8")),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json; charset=utf-8"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], &raw[..]);
    }

    #[tokio::test]
    async fn internal_details_stay_hidden() {
        let response = AppError::internal("connection pool exploded at 10.0.0.3").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], "An internal error occurred");
        assert_eq!(body["code"], "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn feed_outage_has_fixed_message() {
        let response = AppError::FeedUnavailable.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Feed is temporarily unavailable");
        assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
    }

    #[test]
    fn domain_validation_becomes_bad_request() {
        let err: AppError = DomainError::validation("bad id").into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
