use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::context_builder::ContextBuilder;
use super::session_key::SessionKey;
use super::store::ConversationStore;
use super::types::{pair_turns, ChatReply, HistoryPair, Turn};
use super::verification::inspect_sequence;
use crate::services::llm_service::{format_prompt, BackendHealth, GenerationBackend, GenerationOutcome};
use crate::utils::error::ChatError;

/// Composes key resolution, storage, context windowing and generation into
/// the chat operations.
///
/// Holds no conversation state between calls: every operation re-reads the
/// store.
pub struct ConversationManager {
    store: Arc<dyn ConversationStore>,
    backend: Arc<dyn GenerationBackend>,
    context_builder: ContextBuilder,
}

impl ConversationManager {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        backend: Arc<dyn GenerationBackend>,
        context_builder: ContextBuilder,
    ) -> Self {
        Self {
            store,
            backend,
            context_builder,
        }
    }

    /// Answer `message` in the session named by `session_token` and return
    /// the reply text.
    pub async fn send(&self, message: &str, session_token: &str) -> Result<String, ChatError> {
        self.send_reply(message, session_token)
            .await
            .map(|reply| reply.text)
    }

    /// Like [`send`](Self::send), also reporting whether the text is a
    /// generation failure.
    ///
    /// The human turn and the reply are committed together, and the reply is
    /// returned only after that commit. A generation failure is stored as the
    /// assistant turn, so history shows exactly what the user saw.
    pub async fn send_reply(
        &self,
        message: &str,
        session_token: &str,
    ) -> Result<ChatReply, ChatError> {
        let start = Instant::now();
        let key = SessionKey::resolve(session_token);

        let history = self.store.list(&key).await?;
        let context = self.context_builder.build(&history);
        debug!(
            "Session {}: {} stored turn(s), context {} chars",
            key,
            history.len(),
            context.len()
        );

        let outcome = self.backend.generate(&format_prompt(&context, message)).await;
        let failed = outcome.is_failure();
        match &outcome {
            GenerationOutcome::Completed(_) => {}
            GenerationOutcome::Unavailable(reason) => {
                warn!("Session {}: generation unavailable: {}", key, reason);
            }
            GenerationOutcome::Timeout { after_secs } => {
                warn!("Session {}: generation timed out after {}s", key, after_secs);
            }
        }
        let text = outcome.into_reply();

        self.store
            .append_all(&key, vec![Turn::human(message), Turn::assistant(text.as_str())])
            .await?;

        info!(
            "Session {}: reply stored in {}ms (failed: {})",
            key,
            start.elapsed().as_millis(),
            failed
        );

        Ok(ChatReply {
            session_key: key,
            text,
            failed,
        })
    }

    /// Stored exchanges as (human, assistant) pairs, oldest first.
    pub async fn history(&self, session_token: &str) -> Result<Vec<HistoryPair>, ChatError> {
        let key = SessionKey::resolve(session_token);
        let turns = self.store.list(&key).await?;

        let report = inspect_sequence(&turns);
        if !report.is_regular() {
            warn!(
                "Session {}: irregular turn sequence, {} issue(s): {:?}",
                key,
                report.issues.len(),
                report.issues
            );
        }

        Ok(pair_turns(&turns))
    }

    pub async fn clear_history(&self, session_token: &str) -> Result<(), ChatError> {
        let key = SessionKey::resolve(session_token);
        self.store.clear(&key).await?;
        info!("Session {}: history cleared", key);
        Ok(())
    }

    pub async fn backend_health(&self) -> BackendHealth {
        self.backend.health_check().await
    }

    pub async fn storage_ready(&self) -> Result<(), ChatError> {
        self.store.ping().await
    }
}
