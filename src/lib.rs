pub mod config;
pub mod dispatcher;
pub mod fetcher;
pub mod image_cache;
pub mod models;
pub mod plugins;
pub mod provider;
pub mod scheduler;
pub mod tracker;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use dispatcher::NotificationDispatcher;
pub use scheduler::{PollLoop, PollScheduler};
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
