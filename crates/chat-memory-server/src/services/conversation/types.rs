use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::session_key::SessionKey;

/// Who said a turn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Human,
    Assistant,
    /// A stored marker this version does not understand. Kept so that reads
    /// never fail on foreign rows.
    Unrecognized(String),
}

impl Role {
    /// Marker written to storage.
    pub fn as_marker(&self) -> &str {
        match self {
            Role::Human => "human",
            Role::Assistant => "assistant",
            Role::Unrecognized(marker) => marker,
        }
    }

    /// Parse a stored marker. `user` and `ai` are accepted as aliases.
    pub fn from_marker(marker: &str) -> Self {
        match marker {
            "human" | "user" => Role::Human,
            "assistant" | "ai" => Role::Assistant,
            other => Role::Unrecognized(other.to_string()),
        }
    }

    /// Prompt label, `None` for roles that are not rendered.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Role::Human => Some("Human"),
            Role::Assistant => Some("Assistant"),
            Role::Unrecognized(_) => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_marker())
    }
}

/// One immutable message of a conversation. Its sequence position is the
/// storage order.
///
/// `created_at` is provisional until the turn is appended; stores overwrite
/// it with the write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self::new(Role::Human, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// One question/answer exchange as shown to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryPair {
    pub human: String,
    pub assistant: String,
}

/// Pair turns positionally: (0, 1), (2, 3), ...
///
/// A position pair is kept only when it is exactly (human, assistant); any
/// other pair and an odd trailing turn are left out of the paired view.
pub fn pair_turns(turns: &[Turn]) -> Vec<HistoryPair> {
    turns
        .chunks_exact(2)
        .filter_map(|pair| match (&pair[0].role, &pair[1].role) {
            (Role::Human, Role::Assistant) => Some(HistoryPair {
                human: pair[0].content.clone(),
                assistant: pair[1].content.clone(),
            }),
            _ => None,
        })
        .collect()
}

/// Result of a `send`, with enough detail for a caller to render failures
/// differently from real answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatReply {
    pub session_key: SessionKey,
    pub text: String,
    /// The text is a generation failure message, not a model answer.
    pub failed: bool,
}
