use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::session_key::SessionKey;
use super::store::ConversationStore;
use super::types::Turn;
use crate::utils::error::ChatError;

/// Thread-safe in-memory conversation store.
///
/// Writes to one key hold that key's shard lock for the whole batch, which
/// gives the same per-key ordering as the PostgreSQL store. Contents are lost
/// on restart.
#[derive(Clone, Default)]
pub struct InMemoryConversationStore {
    /// session_key -> turns in append order
    storage: Arc<DashMap<SessionKey, Vec<Turn>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        info!("Initializing in-memory conversation store");
        Self::default()
    }

    /// Number of sessions holding at least one turn
    pub fn session_count(&self) -> usize {
        self.storage.len()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append_all(&self, key: &SessionKey, turns: Vec<Turn>) -> Result<(), ChatError> {
        if turns.is_empty() {
            return Ok(());
        }

        let count = turns.len();
        let mut entry = self.storage.entry(*key).or_default();
        let written_at = Utc::now();
        entry.extend(turns.into_iter().map(|mut turn| {
            turn.created_at = written_at;
            turn
        }));
        drop(entry);
        debug!("Appended {} turn(s) to session {}", count, key);
        Ok(())
    }

    async fn list(&self, key: &SessionKey) -> Result<Vec<Turn>, ChatError> {
        Ok(self
            .storage
            .get(key)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn clear(&self, key: &SessionKey) -> Result<(), ChatError> {
        if let Some((_, turns)) = self.storage.remove(key) {
            debug!("Cleared {} turn(s) from session {}", turns.len(), key);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), ChatError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::conversation::types::Role;

    #[tokio::test]
    async fn test_append_preserves_order() {
        let store = InMemoryConversationStore::new();
        let key = SessionKey::resolve("order");

        store.append(&key, Turn::human("t1")).await.unwrap();
        store.append(&key, Turn::assistant("t2")).await.unwrap();

        let turns = store.list(&key).await.unwrap();
        let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["t1", "t2"]);
        assert_eq!(turns[0].role, Role::Human);
    }

    #[tokio::test]
    async fn test_turns_stamped_at_write_time() {
        let store = InMemoryConversationStore::new();
        let key = SessionKey::resolve("stamps");

        let mut question = Turn::human("asked before generation");
        question.created_at = Utc::now() - chrono::Duration::minutes(5);
        let before = Utc::now();
        store
            .append_all(&key, vec![question, Turn::assistant("answer")])
            .await
            .unwrap();

        let turns = store.list(&key).await.unwrap();
        assert!(turns[0].created_at >= before);
        assert_eq!(turns[0].created_at, turns[1].created_at);
    }

    #[tokio::test]
    async fn test_unseen_key_lists_empty() {
        let store = InMemoryConversationStore::new();
        let turns = store.list(&SessionKey::resolve("nobody")).await.unwrap();
        assert!(turns.is_empty());
    }

    #[tokio::test]
    async fn test_clear_then_list() {
        let store = InMemoryConversationStore::new();
        let key = SessionKey::resolve("clear");
        let other = SessionKey::resolve("keep");

        store
            .append_all(&key, vec![Turn::human("a"), Turn::assistant("b")])
            .await
            .unwrap();
        store.append(&other, Turn::human("c")).await.unwrap();

        store.clear(&key).await.unwrap();
        assert!(store.list(&key).await.unwrap().is_empty());
        assert_eq!(store.list(&other).await.unwrap().len(), 1);

        // idempotent
        store.clear(&key).await.unwrap();
        store.clear(&SessionKey::resolve("never-seen")).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_batches_stay_contiguous() {
        let store = InMemoryConversationStore::new();
        let key = SessionKey::resolve("busy");

        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append_all(
                        &key,
                        vec![
                            Turn::human(format!("q{}", i)),
                            Turn::assistant(format!("a{}", i)),
                        ],
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let turns = store.list(&key).await.unwrap();
        assert_eq!(turns.len(), 64);
        for pair in turns.chunks(2) {
            assert_eq!(pair[0].content[1..], pair[1].content[1..]);
        }
        assert_eq!(store.session_count(), 1);
    }
}
