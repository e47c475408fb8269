//! OpenAPI documentation.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::handlers::health_handler::{AliveResponse, ReadinessResponse, ServiceHealth, ServiceStatus};
use domain::{AuthorSummary, Feed, FeedEntry, PostSummary};

/// API documentation struct.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health_handler::health_check,
        crate::handlers::health_handler::readiness_check,
        crate::handlers::auth_handler::register,
        crate::handlers::auth_handler::login,
        crate::handlers::feed_handler::get_feed,
        crate::handlers::profile_handler::get_profile,
    ),
    components(
        schemas(
            AliveResponse,
            ReadinessResponse,
            ServiceStatus,
            ServiceHealth,
            Feed,
            FeedEntry,
            PostSummary,
            AuthorSummary,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness checks"),
        (name = "Authentication", description = "Registration and login, handled by the User Service"),
        (name = "Feed", description = "Personalised feed of followed users' posts"),
        (name = "Profile", description = "User details joined with social counts and posts"),
    )
)]
pub struct ApiDoc;

/// Security scheme modifier.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
