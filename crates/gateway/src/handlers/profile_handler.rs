//! Profile handler.

use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Extension, Router,
};

use common::{AppError, AppResult};
use domain::Identity;

use crate::services::Profile;
use crate::state::AppState;

/// Create profile routes. Registered beside the `/users/*rest` forward,
/// which still handles every other `/users` path.
pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/users/profile/:user_id", get(get_profile))
}

/// A user's details with follower counts and posts
#[utoipa::path(
    get,
    path = "/users/profile/{user_id}",
    tag = "Profile",
    params(("user_id" = i64, Path, description = "Id of the user to show")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User details with followers, following and posts"),
        (status = 400, description = "Invalid or missing user id"),
        (status = 401, description = "Access token required"),
        (status = 403, description = "Invalid or expired token"),
        (status = 404, description = "User not found"),
        (status = 429, description = "Rate limit exceeded"),
        (status = 503, description = "User service unavailable")
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Profile>> {
    let user_id = parse_user_id(&user_id)?;
    let profile = state.profile_aggregator.build_profile(&caller, user_id).await?;
    Ok(Json(profile))
}

fn parse_user_id(raw: &str) -> AppResult<i64> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::validation("Invalid or missing user id"))
}
