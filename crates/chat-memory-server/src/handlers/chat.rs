use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::models::chat::{ChatRequest, ChatResponse, HistoryQuery, HistoryResponse};
use crate::state::AppState;
use crate::utils::error::ApiError;

pub async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    let session_id = state.session_or_default(request.session_id);
    info!(
        "Chat request: session={}, message_len={}",
        session_id,
        request.message.len()
    );

    let reply = state
        .conversation_manager
        .send_reply(&request.message, &session_id)
        .await?;

    Ok(Json(ChatResponse {
        session_id,
        session_key: reply.session_key,
        reply: reply.text,
        is_error: reply.failed,
    }))
}

pub async fn history_handler(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let session_id = state.session_or_default(query.session_id);
    let pairs = state.conversation_manager.history(&session_id).await?;

    Ok(Json(HistoryResponse { session_id, pairs }))
}

pub async fn clear_history_handler(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<StatusCode, ApiError> {
    let session_id = state.session_or_default(query.session_id);
    state.conversation_manager.clear_history(&session_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
