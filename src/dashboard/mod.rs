//! Dashboard: Axum control API for browsers and scripts.
//!
//! Mirrors what the terminal shows and accepts the same actions. Bound to
//! localhost only. CORS enabled so a local page can poll it.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    routing::{delete, get, post},
    Router,
};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

pub use routes::{AppState, DashboardState};

/// Bind the control API and serve it in a background task.
pub async fn spawn_dashboard(state: AppState, port: u16) -> Result<JoinHandle<()>> {
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind dashboard port {port}"))?;

    info!(port, "Control API listening on http://localhost:{port}");
    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "Control API server error");
        }
    }))
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/view", get(routes::get_view))
        .route("/api/notifications", get(routes::get_notifications))
        .route("/api/notifications/:id", delete(routes::delete_notification))
        .route("/api/filters", get(routes::get_filters).put(routes::put_filters))
        .route("/api/scan", post(routes::post_scan))
        .route("/api/auto-refresh", post(routes::post_auto_refresh))
        .route("/api/bets/:id", post(routes::post_bet))
        .route("/api/bankroll", get(routes::get_bankroll))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
