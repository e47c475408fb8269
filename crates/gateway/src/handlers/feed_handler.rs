//! Feed handler.

use axum::{extract::State, response::Json, routing::get, Extension, Router};
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use common::AppResult;
use domain::{Feed, Identity, DEFAULT_FEED_LIMIT};

use crate::extractors::ValidatedQuery;
use crate::state::AppState;

/// Feed query parameters
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeedQuery {
    /// Maximum number of entries (1-100, default 50)
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    #[param(minimum = 1, maximum = 100, example = 20)]
    pub limit: Option<u32>,
}

/// Create feed routes
pub fn feed_routes() -> Router<AppState> {
    Router::new().route("/feed", get(get_feed))
}

/// Personalised feed of posts from followed users
#[utoipa::path(
    get,
    path = "/feed",
    tag = "Feed",
    params(FeedQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Feed, newest first", body = Feed),
        (status = 400, description = "Invalid limit"),
        (status = 401, description = "Access token required"),
        (status = 403, description = "Invalid or expired token"),
        (status = 429, description = "Rate limit exceeded"),
        (status = 503, description = "Feed is temporarily unavailable")
    )
)]
pub async fn get_feed(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    ValidatedQuery(query): ValidatedQuery<FeedQuery>,
) -> AppResult<Json<Feed>> {
    let limit = query.limit.unwrap_or(DEFAULT_FEED_LIMIT);
    let feed = state.feed_aggregator.build_feed(&caller, limit).await?;
    Ok(Json(feed))
}
