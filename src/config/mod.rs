#[cfg(feature = "cli")]
pub mod cli;
pub mod manager;
pub mod schema;

pub use manager::ConfigManager;
pub use schema::AppConfig;
