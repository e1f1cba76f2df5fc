use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::warn;

use crate::services::BackendHealth;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    status: String,
    database: bool,
    llm: BackendHealth,
}

pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Storage down means not ready. An unavailable LLM only degrades: replies
/// still flow, as stored error messages.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let manager = &state.conversation_manager;

    let database = match manager.storage_ready().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Readiness: database unreachable: {}", e);
            false
        }
    };
    let llm = manager.backend_health().await;

    let (code, status) = match (database, llm.available && llm.model_present) {
        (false, _) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
        (true, false) => (StatusCode::OK, "degraded"),
        (true, true) => (StatusCode::OK, "ready"),
    };

    (
        code,
        Json(ReadinessResponse {
            status: status.to_string(),
            database,
            llm,
        }),
    )
}
