//! Health check handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Liveness response.
#[derive(Debug, Serialize, ToSchema)]
pub struct AliveResponse {
    #[schema(example = "Alive!!")]
    pub message: String,
}

/// Readiness response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadinessResponse {
    /// "ready" or "degraded"
    pub status: String,
    pub services: ServiceStatus,
}

/// Reachability of each downstream service.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceStatus {
    pub user_service: ServiceHealth,
    pub post_service: ServiceHealth,
}

/// Health of one downstream service.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceHealth {
    /// "healthy" or "unhealthy"
    pub status: String,
}

impl ServiceHealth {
    fn from_check(healthy: bool) -> Self {
        Self {
            status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        }
    }
}

/// Create health routes.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(readiness_check))
}

/// Liveness check
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Gateway process is up", body = AliveResponse),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn health_check() -> Json<AliveResponse> {
    Json(AliveResponse {
        message: "Alive!!".to_string(),
    })
}

/// Readiness check - checks both downstream services.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "All downstream services reachable", body = ReadinessResponse),
        (status = 503, description = "At least one downstream service unreachable", body = ReadinessResponse)
    )
)]
pub async fn readiness_check(State(state): State<AppState>) -> Response {
    let (users_up, posts_up) = tokio::join!(
        state.user_client.service().check_health(),
        state.post_client.service().check_health(),
    );

    let all_healthy = users_up && posts_up;
    let response = ReadinessResponse {
        status: if all_healthy { "ready" } else { "degraded" }.to_string(),
        services: ServiceStatus {
            user_service: ServiceHealth::from_check(users_up),
            post_service: ServiceHealth::from_check(posts_up),
        },
    };

    if all_healthy {
        (StatusCode::OK, Json(response)).into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response)).into_response()
    }
}
