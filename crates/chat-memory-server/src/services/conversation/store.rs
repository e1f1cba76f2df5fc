use async_trait::async_trait;

use super::session_key::SessionKey;
use super::types::Turn;
use crate::utils::error::ChatError;

/// Durable, ordered, append-only turn log keyed by [`SessionKey`].
///
/// Implementations serialize writers per key: a batch passed to
/// [`append_all`](ConversationStore::append_all) lands contiguously and in
/// order, even when several callers write to the same session at once.
/// Different keys never wait on each other.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Append one turn at the end of the session. Creates the session on
    /// first use.
    async fn append(&self, key: &SessionKey, turn: Turn) -> Result<(), ChatError> {
        self.append_all(key, vec![turn]).await
    }

    /// Append all turns atomically: either every turn is committed or none.
    /// Each turn's `created_at` is set to the write time.
    async fn append_all(&self, key: &SessionKey, turns: Vec<Turn>) -> Result<(), ChatError>;

    /// All turns in append order, oldest first. Unknown keys yield an empty
    /// list.
    async fn list(&self, key: &SessionKey) -> Result<Vec<Turn>, ChatError>;

    /// Remove every turn of the session. Succeeds for unknown keys.
    async fn clear(&self, key: &SessionKey) -> Result<(), ChatError>;

    /// Cheap reachability probe.
    async fn ping(&self) -> Result<(), ChatError>;
}
