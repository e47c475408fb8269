//! Credential handlers, forwarded to the User Service.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method},
    routing::post,
    Router,
};

use common::AppResult;

use crate::clients::UpstreamResponse;
use crate::handlers::proxy_handler::forward;
use crate::state::AppState;

/// Create credential routes.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/register",
    tag = "Authentication",
    request_body(content = String, content_type = "application/json", description = "Registration payload, passed through unchanged"),
    responses(
        (status = 201, description = "Account created"),
        (status = 429, description = "Rate limit exceeded"),
        (status = 503, description = "User service unavailable")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<UpstreamResponse> {
    forward(state.user_client.service(), Method::POST, "/auth/register", None, &headers, body).await
}

/// Log in and receive a bearer token
#[utoipa::path(
    post,
    path = "/login",
    tag = "Authentication",
    request_body(content = String, content_type = "application/json", description = "Credentials, passed through unchanged"),
    responses(
        (status = 200, description = "Token issued"),
        (status = 401, description = "Bad credentials"),
        (status = 429, description = "Rate limit exceeded"),
        (status = 503, description = "User service unavailable")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<UpstreamResponse> {
    forward(state.user_client.service(), Method::POST, "/auth/login", None, &headers, body).await
}
