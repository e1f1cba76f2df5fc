pub mod error;
pub mod logger;

pub use error::{ApiError, ChatError};
pub use logger::init_logger;
