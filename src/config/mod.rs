/// Application settings loaded from config.toml
pub mod app;

/// Database connection and schema migrations
pub mod database;

pub use app::{AppConfig, VipTier, load_config, load_default_config};
