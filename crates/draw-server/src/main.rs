//! Multi-room five-card draw server.
//!
//! # Routes
//!
//! | Method | Path         | Description                            |
//! |--------|--------------|----------------------------------------|
//! | `GET`  | `/`          | Static web client                      |
//! | `GET`  | `/ws`        | WebSocket upgrade for game connections |
//! | `GET`  | `/api/rooms` | List active room codes (JSON)          |
//!
//! Configuration comes from the environment, see [`config::ServerConfig`].

mod config;
mod room;
mod ws_handler;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing_subscriber::EnvFilter;

use config::ServerConfig;
use room::RoomManager;

/// Shared application state available to all handlers.
#[derive(Clone)]
struct AppState {
    room_manager: Arc<RoomManager>,
}

#[tokio::main]
async fn main() {
    // Initialise tracing (respects RUST_LOG env var).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("Server failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;

    let state = AppState {
        room_manager: Arc::new(RoomManager::new(config.room_defaults, config.bot_timing)),
    };

    let static_dir = &config.static_dir;
    let serve_static = ServeDir::new(static_dir)
        .not_found_service(ServeFile::new(format!("{static_dir}/index.html")));

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/rooms", get(rooms_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
        .fallback_service(serve_static);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Draw server listening on {addr}");
    tracing::info!("Serving static files from {static_dir}");
    tracing::info!(
        max_seats = config.room_defaults.max_seats,
        ante = config.room_defaults.ante,
        min_bet = config.room_defaults.min_bet,
        max_discard = config.room_defaults.max_discard,
        "Room defaults"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// `GET /ws`: upgrade and hand off to [`ws_handler::handle_socket`].
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_handler::handle_socket(socket, state.room_manager))
}

/// `GET /api/rooms`: JSON array of active room codes.
async fn rooms_handler(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.room_manager.list_rooms().await)
}
