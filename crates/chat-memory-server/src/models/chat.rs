use serde::{Deserialize, Serialize};

use crate::services::conversation::{HistoryPair, SessionKey};

// ===== REQUEST MODELS =====

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub session_id: Option<String>,
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub session_key: SessionKey,
    pub reply: String,
    /// `reply` is a generation failure message, render it as an error
    pub is_error: bool,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub pairs: Vec<HistoryPair>,
}
