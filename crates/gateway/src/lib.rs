//! Feed gateway library.
//!
//! The single public entry point for clients: it verifies bearer tokens,
//! rate-limits callers, builds the personalised feed and forwards the
//! remaining protected routes to the User and Post services.

pub mod clients;
pub mod config;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod services;
pub mod state;

use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::GatewayConfig;
use crate::routes::create_router;
use crate::state::AppState;

/// Run the HTTP server until Ctrl-C or SIGTERM.
pub async fn run_server(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = config.server_addr().parse()?;

    info!(
        user_service = %config.user_service.base_url,
        post_service = %config.post_service.base_url,
        "Configured downstream services"
    );

    // Create app state
    let state = AppState::new(config)?;

    // Expired rate limit windows are swept until shutdown
    let shutdown = CancellationToken::new();
    state.rate_limiter.spawn_sweeper(shutdown.clone());
    state.auth_rate_limiter.spawn_sweeper(shutdown.clone());

    // Build router
    let app = create_router(state).layer(TraceLayer::new_for_http());

    info!("Gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown))
    .await?;

    info!("Gateway stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM, cancelling `shutdown` for background tasks.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    shutdown.cancel();
}
