//! Authentication middleware.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use tracing::debug;

use common::AppError;

use crate::services::AuthError;
use crate::state::AppState;

/// Verify the bearer token and attach the caller's `Identity` to the request.
///
/// A missing header or a non-Bearer scheme is answered with 401, a token
/// that fails verification with 403. Nothing downstream is contacted.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AuthError::MissingCredential)?;

    let identity = state.token_verifier.verify(bearer.token()).map_err(|e| {
        debug!(error = %e, path = %request.uri().path(), "Rejected bearer token");
        e
    })?;

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}
