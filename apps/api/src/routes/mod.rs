pub mod chat;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::liveness_handler))
        .route("/health/detailed", get(health::detailed_health_handler))
        .route("/api/career", post(chat::handle_career))
        .route("/api/career/history", get(chat::career_history))
        .route("/api/learning", post(chat::handle_learning))
        .route(
            "/api/learning/history",
            get(chat::learning_history).delete(chat::clear_learning_history),
        )
        .with_state(state)
}
