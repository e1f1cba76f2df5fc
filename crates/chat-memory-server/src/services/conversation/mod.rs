//! Session-scoped conversation memory
//!
//! - Session token -> canonical [`SessionKey`]
//! - Append-only turn storage ([`ConversationStore`])
//! - Bounded prompt context ([`ContextBuilder`])
//! - Orchestration of the chat operations ([`ConversationManager`])

mod context_builder;
pub mod manager;
pub mod memory_store;
pub mod session_key;
pub mod store;
pub mod types;
pub mod verification;

pub use context_builder::{build_context, ContextBuilder, DEFAULT_MAX_TURNS};
pub use manager::ConversationManager;
pub use memory_store::InMemoryConversationStore;
pub use session_key::{SessionKey, SESSION_NAMESPACE};
pub use store::ConversationStore;
pub use types::{pair_turns, ChatReply, HistoryPair, Role, Turn};
pub use verification::{inspect_sequence, SequenceIssue, SequenceReport};
