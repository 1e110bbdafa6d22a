//! Storage module for persisting ingestion data
//!
//! This module handles all database operations for the pipeline, including:
//! - SQLite database initialization and schema management
//! - City rows created from configuration
//! - Frontier, raw page and property tables with insert-or-ignore semantics
//! - Transactional batch commits that flip upstream `is_processed` flags
//! - Ingestion run bookkeeping

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use serde::Serialize;

/// A configured city
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct City {
    pub id: i64,
    pub name: String,
}

/// A listing link found on a search-result page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFrontierUrl {
    pub url: String,
    pub city_id: i64,
}

/// A discovered listing URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierUrl {
    pub url: String,
    pub city_id: i64,
    pub is_processed: bool,
}

/// Cleaned HTML of one listing, waiting for extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    pub url: String,
    pub html: String,
    pub city_id: i64,
    pub is_processed: bool,
}

/// Structured attributes extracted from one listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub url: String,
    pub title: String,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub price_unit: Option<String>,
    pub price_raw: String,
    pub description: String,
    pub main_features: Vec<String>,
    pub last_updated: Option<String>,
    pub city_id: i64,
}

/// Represents one ingestion run
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub urls_discovered: u64,
    pub pages_captured: u64,
    pub properties_extracted: u64,
    pub error_message: Option<String>,
}

/// Counters written when a run finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTotals {
    pub urls_discovered: u64,
    pub pages_captured: u64,
    pub properties_extracted: u64,
}

/// Status of an ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
