//! Configuration module for Listing Harvester
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, with environment overrides for the values deployments usually
//! inject (`BASE_URL`, `CITY_NAMES`, `DATABASE_PATH`).
//!
//! # Example
//!
//! ```no_run
//! use listing_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvester.toml")).unwrap();
//! println!("Drain batch size: {}", config.crawler.batch_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, OutputConfig, ServerConfig, SourceConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{load_config, load_config_with, ENV_BASE_URL, ENV_CITY_NAMES, ENV_DATABASE_PATH};
