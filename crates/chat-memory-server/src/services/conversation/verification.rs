//! Detects irregular turn sequences without failing on them.
//!
//! Well-formed conversations alternate human/assistant, starting with a
//! human turn. Partial failures or foreign writers can leave other shapes in
//! storage; readers report them instead of crashing.

use serde::Serialize;

use super::types::{Role, Turn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SequenceIssue {
    /// The conversation starts with an assistant turn.
    LeadingAssistant { position: usize },
    /// Same role as the previous recognized turn.
    ConsecutiveRole { position: usize, role: String },
    /// Stored role marker is not understood.
    UnrecognizedRole { position: usize, marker: String },
    /// Last turn is a human turn without an answer.
    UnansweredTrailing { position: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceReport {
    pub turn_count: usize,
    pub issues: Vec<SequenceIssue>,
}

impl SequenceReport {
    pub fn is_regular(&self) -> bool {
        self.issues.is_empty()
    }
}

pub fn inspect_sequence(turns: &[Turn]) -> SequenceReport {
    let mut issues = Vec::new();
    let mut previous: Option<&Role> = None;

    for (position, turn) in turns.iter().enumerate() {
        match &turn.role {
            Role::Unrecognized(marker) => {
                issues.push(SequenceIssue::UnrecognizedRole {
                    position,
                    marker: marker.clone(),
                });
                continue;
            }
            Role::Assistant if previous.is_none() => {
                issues.push(SequenceIssue::LeadingAssistant { position });
            }
            role if previous == Some(role) => {
                issues.push(SequenceIssue::ConsecutiveRole {
                    position,
                    role: role.to_string(),
                });
            }
            _ => {}
        }
        previous = Some(&turn.role);
    }

    if let Some(position) = turns.iter().rposition(|t| t.role.label().is_some()) {
        if turns[position].role == Role::Human {
            issues.push(SequenceIssue::UnansweredTrailing { position });
        }
    }

    SequenceReport {
        turn_count: turns.len(),
        issues,
    }
}
