use crate::interface_adapters::http::{health, reset};
use crate::interface_adapters::net::ws_handler;
use crate::interface_adapters::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

// Any origin may call every route, so a browser front end can be served from elsewhere.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/reset", post(reset))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
