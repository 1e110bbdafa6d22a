//! Output module for reporting on ingested data
//!
//! This module handles:
//! - Paged listing of discovered URLs
//! - Pipeline statistics and the latest run summary

mod listing;
pub mod stats;

pub use listing::{list_urls, ListQuery, UrlPage, DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT};
pub use stats::{load_statistics, print_statistics, IngestStatistics};
