//! HTTP API: axum router over the auction ledger and image store.
//!
//! CORS is open to any origin so a browser front end on another port can
//! drive the auction.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

pub use routes::{ApiState, AppState};

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/health", get(routes::health))
        // Teams
        .route("/api/teams", get(routes::list_teams).post(routes::create_team))
        .route("/api/teams/summary", get(routes::team_summaries))
        .route(
            "/api/teams/:id",
            put(routes::update_team).delete(routes::delete_team),
        )
        // Players
        .route(
            "/api/players",
            get(routes::list_players).post(routes::create_player),
        )
        .route("/api/players/available", get(routes::available_players))
        .route(
            "/api/players/:id",
            put(routes::update_player).delete(routes::delete_player),
        )
        // Auction
        .route("/api/auction/bid", post(routes::place_bid))
        .route("/api/auction/sold", post(routes::mark_sold))
        .route("/api/auction/unsold", post(routes::mark_unsold))
        .route("/api/auction/release", post(routes::release))
        .route("/api/auction/history", get(routes::history))
        .route(
            "/api/auction/history/:id",
            axum::routing::delete(routes::delete_bid),
        )
        .route("/api/reset", post(routes::reset))
        .route("/api/stats", get(routes::stats))
        // Administration
        .route("/api/admin/migrate", post(routes::migrate))
        .route(
            "/api/images/:kind/:name",
            put(routes::put_image).get(routes::get_image),
        )
        .layer(cors)
        .with_state(state)
}

/// Bind `host:port` and serve until Ctrl+C.
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))?;
    info!(host, port, "API server listening on http://{host}:{port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")?;

    info!("API server stopped");
    Ok(())
}

/// Resolves on Ctrl+C. If the handler cannot be installed the server simply
/// runs until killed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
