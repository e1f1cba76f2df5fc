pub mod config;
pub mod database;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

pub use crate::config::Settings;
pub use utils::error::{ApiError, ChatError};
