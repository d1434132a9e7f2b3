//! HTTP/WebSocket API for the game server.
//!
//! # Endpoints Overview
//!
//! - `GET /health` - Server health and lobby counters
//! - `GET /ws` - Establish the game WebSocket
//! - everything else - Static client files
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use hp_server::{api::{AppState, create_router}, config::ServerConfig};
//! use hilo_poker::LobbyActor;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::default();
//! let (actor, lobby) = LobbyActor::new(config.game.clone(), config.room_sweep_interval());
//! tokio::spawn(actor.run());
//!
//! let app = create_router(AppState::new(lobby, config));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively; the client is usually served from the
//! same origin anyway.

pub mod rate_limiter;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use hilo_poker::LobbyHandle;
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::{config::ServerConfig, metrics};

/// Application state shared across all HTTP handlers and WebSocket connections.
#[derive(Clone)]
pub struct AppState {
    pub lobby: LobbyHandle,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(lobby: LobbyHandle, config: ServerConfig) -> Self {
        Self {
            lobby,
            config: Arc::new(config),
        }
    }
}

/// Create the complete router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(websocket::websocket_handler))
        .fallback_service(static_files)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` while the lobby actor answers, `503 Service Unavailable`
/// once it has stopped.
///
/// # Example
///
/// ```bash
/// curl http://localhost:3000/health
/// # {"status":"healthy","version":"0.4.0","rooms":2,"players":7,"connections":6,"timestamp":"..."}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.lobby.stats().await {
        Ok(stats) => {
            metrics::active_rooms(stats.rooms);
            metrics::active_players(stats.players);

            let response = json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "rooms": stats.rooms,
                "players": stats.players,
                "connections": stats.connections,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            });
            (StatusCode::OK, Json(response))
        }
        Err(e) => {
            log::error!("Health check failed: {e}");
            let response = json!({
                "status": "unhealthy",
                "version": env!("CARGO_PKG_VERSION"),
                "error": e,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            });
            (StatusCode::SERVICE_UNAVAILABLE, Json(response))
        }
    }
}
