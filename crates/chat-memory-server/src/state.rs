use std::sync::Arc;

use crate::config::ConversationConfig;
use crate::services::ConversationManager;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub conversation_manager: Arc<ConversationManager>,
    pub conversation: ConversationConfig,
}

impl AppState {
    /// Session token to use when a request does not name one. Any supplied
    /// token, blank included, is passed through to key resolution.
    pub fn session_or_default(&self, session_id: Option<String>) -> String {
        session_id.unwrap_or_else(|| self.conversation.default_session.clone())
    }
}
