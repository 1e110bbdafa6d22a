//! Listing Harvester: a resumable classifieds ingestion pipeline
//!
//! This crate discovers property listings across a city × purpose × category
//! search space, captures each listing page, and extracts structured
//! attributes into SQLite. Every stage hands off through storage, so each one
//! can be stopped and resumed independently.

pub mod api;
pub mod capture;
pub mod config;
pub mod crawler;
pub mod drain;
pub mod extract;
pub mod frontier;
pub mod html;
pub mod ingest;
pub mod output;
pub mod storage;

use thiserror::Error;

/// Main error type for Listing Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Listing Harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use drain::{DrainReport, StopReason};
pub use ingest::{run_ingestion, start_ingestion, IngestContext, IngestReport, StartOutcome};
pub use storage::{SqliteStorage, Storage};
