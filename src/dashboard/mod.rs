//! Dashboard — Axum JSON API over the shared table.
//!
//! Lets a front end (or curl) drive the game: pick a color, stage a stake,
//! confirm bets and control auto-bet runs. CORS enabled for local
//! development.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use routes::AppState;

/// Bind the dashboard port and serve in a background task.
///
/// Binding happens before this returns so a busy port is reported to the
/// caller instead of inside the task.
pub async fn spawn_dashboard(state: AppState, port: u16) -> Result<JoinHandle<()>> {
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind dashboard port {port}"))?;
    info!(port, "Dashboard server starting on http://localhost:{port}");

    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "Dashboard server error");
        }
    }))
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        // Observers
        .route("/api/player", get(routes::get_player))
        .route("/api/house", get(routes::get_house))
        .route("/api/shoe", get(routes::get_shoe))
        .route("/api/history", get(routes::get_history))
        .route("/api/results", get(routes::get_results))
        .route("/api/auto-bet", get(routes::get_auto_bet))
        // Commands
        .route("/api/color", post(routes::select_color))
        .route("/api/stake", post(routes::set_stake))
        .route("/api/deck", post(routes::set_deck))
        .route("/api/bet", post(routes::confirm_bet))
        .route("/api/auto-bet/start", post(routes::start_auto_bet))
        .route("/api/auto-bet/stop", post(routes::stop_auto_bet))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
