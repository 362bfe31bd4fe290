pub mod api;
pub mod config;
pub mod error;
pub mod game;
pub mod health;
pub mod registry;
pub mod room_manager;
pub mod state;
pub mod ws;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use config::ServerConfig;
use state::AppState;

/// Build the Axum router and application state from a config.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let state = AppState::new(config);

    let app = Router::new()
        .route("/create-room", axum::routing::post(api::create_room))
        .route("/join-room", axum::routing::post(api::join_room))
        .route("/room", axum::routing::get(api::get_room))
        .route("/rooms", axum::routing::get(api::list_rooms))
        .route("/clear-rooms", axum::routing::post(api::clear_rooms))
        .route("/health", axum::routing::get(health::health_check))
        .route("/ready", axum::routing::get(health::readiness_check))
        .route("/ws", axum::routing::get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    (app, state)
}
