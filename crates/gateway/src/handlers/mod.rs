//! HTTP request handlers.

pub mod auth_handler;
pub mod feed_handler;
pub mod health_handler;
pub mod profile_handler;
pub mod proxy_handler;

pub use auth_handler::auth_routes;
pub use feed_handler::feed_routes;
pub use health_handler::health_routes;
pub use profile_handler::profile_routes;
pub use proxy_handler::proxy_routes;
