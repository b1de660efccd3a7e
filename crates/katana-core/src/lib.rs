//! Shared types for Katana: client configuration, result envelope, action tags, settings

pub mod model;
pub mod action;
pub mod tokens;
pub mod config;
pub mod error;


pub use model::{ApiResult, ClientConfig, ConfigStore};
pub use action::Action;
pub use tokens::{TokenUsage, estimate_tokens};
pub use config::{
    DEFAULT_BACKEND_URL, DEFAULT_MODEL, DEFAULT_POLL_INTERVAL_SECS, SETTINGS_FILE, Settings,
    settings_path,
};
pub use error::ConfigError;
