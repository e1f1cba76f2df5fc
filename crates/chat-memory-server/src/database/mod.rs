pub mod models;
pub mod pool;
pub mod repository;

pub use models::TurnRow;
pub use pool::DbPool;
pub use repository::PgConversationStore;
