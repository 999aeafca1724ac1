use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db;
use crate::errors::AppError;
use crate::models::{default_thread, ChatHistoryRow, ChatRequest, ChatResponse};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ThreadQuery {
    #[serde(default = "default_thread")]
    pub thread_id: String,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub history: Vec<ChatHistoryRow>,
}

/// POST /api/career
pub async fn handle_career(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if req
        .resume_text
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .is_empty()
    {
        return Err(AppError::Validation("No resume text provided".to_string()));
    }

    let agent = state.career.get().await?;
    let response = agent.handle(&req).await?;
    Ok(Json(response))
}

/// POST /api/learning
///
/// Bounded by the request-level timeout: a wedged upstream turns into a 504
/// instead of an indefinitely held connection.
pub async fn handle_learning(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if req.message.trim().is_empty() {
        return Err(AppError::Validation(
            "Please provide a topic or question to learn about".to_string(),
        ));
    }

    let agent = state.learning.get().await?;
    let response = tokio::time::timeout(state.config.request_timeout, agent.handle(&req))
        .await
        .map_err(|_| AppError::Timeout)??;
    Ok(Json(response))
}

/// GET /api/career/history
pub async fn career_history(
    State(state): State<AppState>,
    Query(query): Query<ThreadQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let pool = state.db.get().await?;
    let history = db::career_history(&pool, &query.thread_id).await?;
    Ok(Json(HistoryResponse { history }))
}

/// GET /api/learning/history
pub async fn learning_history(
    State(state): State<AppState>,
    Query(query): Query<ThreadQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let pool = state.db.get().await?;
    let history = db::learning_history(&pool, &query.thread_id).await?;
    Ok(Json(HistoryResponse { history }))
}

#[derive(Serialize)]
pub struct ClearResponse {
    pub cleared: u64,
}

/// DELETE /api/learning/history
pub async fn clear_learning_history(
    State(state): State<AppState>,
    Query(query): Query<ThreadQuery>,
) -> Result<Json<ClearResponse>, AppError> {
    let pool = state.db.get().await?;
    let cleared = db::clear_learning_chat(&pool, &query.thread_id).await?;
    Ok(Json(ClearResponse { cleared }))
}
