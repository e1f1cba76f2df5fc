use super::{DbPool, TurnRow};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use crate::services::conversation::{ConversationStore, SessionKey, Turn};
use crate::utils::error::ChatError;

const CREATE_SESSIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS chat_sessions (
        session_key UUID PRIMARY KEY,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#;

const CREATE_HISTORY_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS chat_history (
        id          BIGSERIAL PRIMARY KEY,
        session_key UUID NOT NULL REFERENCES chat_sessions (session_key) ON DELETE CASCADE,
        position    INTEGER NOT NULL,
        role        TEXT NOT NULL,
        content     TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (session_key, position)
    )"#;

/// Advisory lock key serializing schema bootstrap across instances.
const SCHEMA_LOCK_KEY: i64 = 0x6368_6174_6d65_6d31;

/// PostgreSQL-backed [`ConversationStore`].
///
/// Every write transaction starts by upserting the session row. The upsert
/// takes that row's lock and keeps it until commit, so writers on one key
/// queue behind each other while other keys proceed.
pub struct PgConversationStore {
    pool: DbPool,
}

impl PgConversationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create tables if they do not exist yet.
    ///
    /// Concurrent `CREATE TABLE IF NOT EXISTS` can still collide in the
    /// catalog, so instances starting together take a transaction-scoped
    /// advisory lock first and run the DDL one at a time.
    pub async fn ensure_schema(&self) -> Result<(), ChatError> {
        let mut transaction = self.pool.get_pool().begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(SCHEMA_LOCK_KEY)
            .execute(&mut *transaction)
            .await?;
        sqlx::query(CREATE_SESSIONS_TABLE)
            .execute(&mut *transaction)
            .await?;
        sqlx::query(CREATE_HISTORY_TABLE)
            .execute(&mut *transaction)
            .await?;

        transaction.commit().await?;

        info!("Conversation schema ready");
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for PgConversationStore {
    async fn append_all(&self, key: &SessionKey, turns: Vec<Turn>) -> Result<(), ChatError> {
        if turns.is_empty() {
            return Ok(());
        }

        let turn_count = turns.len();
        let mut transaction = self.pool.get_pool().begin().await?;

        // Insert-if-absent; locks the session row until commit
        sqlx::query(
            r#"INSERT INTO chat_sessions (session_key)
               VALUES ($1)
               ON CONFLICT (session_key)
               DO UPDATE SET updated_at = now()"#,
        )
        .bind(key.as_uuid())
        .execute(&mut *transaction)
        .await?;

        let next_position: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM chat_history WHERE session_key = $1",
        )
        .bind(key.as_uuid())
        .fetch_one(&mut *transaction)
        .await?;

        // Stamped once the session lock is held, so timestamps follow positions
        let written_at = Utc::now();
        for (offset, turn) in turns.into_iter().enumerate() {
            sqlx::query(
                r#"INSERT INTO chat_history
                   (session_key, position, role, content, created_at)
                   VALUES ($1, $2, $3, $4, $5)"#,
            )
            .bind(key.as_uuid())
            .bind(next_position + offset as i32)
            .bind(turn.role.as_marker())
            .bind(&turn.content)
            .bind(written_at)
            .execute(&mut *transaction)
            .await?;
        }

        transaction.commit().await?;
        debug!(
            "Appended {} turn(s) to session {} at position {}",
            turn_count, key, next_position
        );

        Ok(())
    }

    async fn list(&self, key: &SessionKey) -> Result<Vec<Turn>, ChatError> {
        let rows = sqlx::query_as::<_, TurnRow>(
            r#"SELECT role, content, created_at
               FROM chat_history
               WHERE session_key = $1
               ORDER BY position ASC"#,
        )
        .bind(key.as_uuid())
        .fetch_all(self.pool.get_pool())
        .await?;

        debug!("Loaded {} turn(s) for session {}", rows.len(), key);

        Ok(rows.into_iter().map(Turn::from).collect())
    }

    async fn clear(&self, key: &SessionKey) -> Result<(), ChatError> {
        // chat_history rows go with the session via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM chat_sessions WHERE session_key = $1")
            .bind(key.as_uuid())
            .execute(self.pool.get_pool())
            .await?;

        debug!(
            "Cleared session {} ({} session row(s) removed)",
            key,
            result.rows_affected()
        );

        Ok(())
    }

    async fn ping(&self) -> Result<(), ChatError> {
        sqlx::query("SELECT 1")
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }
}
