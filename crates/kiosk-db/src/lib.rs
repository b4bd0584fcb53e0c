pub mod config;
pub mod database;
pub mod settings_repository;
pub mod source_repository;

pub use config::DatabaseConfig;
pub use database::Database;
pub use settings_repository::SettingsRepository;
pub use source_repository::SourceRepository;
