use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::services::conversation::{Role, Turn};

#[derive(Debug, Clone, FromRow)]
pub struct TurnRow {
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<TurnRow> for Turn {
    fn from(row: TurnRow) -> Self {
        Turn {
            role: Role::from_marker(&row.role),
            content: row.content,
            created_at: row.created_at,
        }
    }
}
