pub mod settings;

pub use settings::{ConversationConfig, DatabaseConfig, LlmConfig, ServerConfig, Settings};
