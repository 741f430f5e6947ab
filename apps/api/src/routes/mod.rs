pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::chat::handlers as chat;
use crate::discounts::handlers as discounts;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // Full pipeline
        .route("/api/analyze", post(discounts::handle_analyze))
        .route("/api/upload-file", post(discounts::handle_upload_file))
        // Single chains against an already-uploaded file
        .route(
            "/api/discounts-domestic-air-accesorials",
            post(discounts::handle_domestic_air_accessorials),
        )
        .route(
            "/api/discounts-domestic-ground",
            post(discounts::handle_domestic_ground),
        )
        .route(
            "/api/discounts_international",
            post(discounts::handle_international),
        )
        // Chat
        .route("/api/chat", post(chat::handle_chat))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
