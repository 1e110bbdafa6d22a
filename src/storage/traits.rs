//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{
    City, FrontierUrl, NewFrontierUrl, Property, RawPage, RunRecord, RunStatus, RunTotals,
};
use std::time::Instant;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Transaction exceeded its deadline during {0}")]
    TransactionTimeout(&'static str),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Each pipeline stage writes only its own table and flips the processed
/// flag of its upstream table, so the operations below are grouped by
/// stage. Flags only ever go from false to true.
pub trait Storage {
    // ===== Cities =====

    /// Creates any missing cities and returns all of `names` with their IDs,
    /// in the order given
    fn ensure_cities(&mut self, names: &[String]) -> StorageResult<Vec<City>>;

    /// Lists every known city ordered by ID
    fn list_cities(&self) -> StorageResult<Vec<City>>;

    // ===== Frontier =====

    /// Inserts discovered listing URLs, ignoring ones already known
    ///
    /// # Returns
    ///
    /// The number of rows actually inserted
    fn insert_frontier_urls(&mut self, entries: &[NewFrontierUrl]) -> StorageResult<usize>;

    /// Gets up to `limit` unprocessed frontier rows whose URL is not in `skip`
    fn fetch_unprocessed_frontier(
        &self,
        limit: usize,
        skip: &[String],
    ) -> StorageResult<Vec<FrontierUrl>>;

    /// Gets a frontier row by URL
    fn get_frontier_url(&self, url: &str) -> StorageResult<Option<FrontierUrl>>;

    /// Lists frontier URLs in discovery order
    fn list_frontier_urls(&self, offset: u64, limit: u64) -> StorageResult<Vec<String>>;

    /// Counts every frontier row
    fn count_frontier_urls(&self) -> StorageResult<u64>;

    /// Counts frontier rows with the given processed flag
    fn count_frontier_by_processed(&self, processed: bool) -> StorageResult<u64>;

    // ===== Raw pages =====

    /// Stores captured pages and marks their frontier rows processed, in one
    /// transaction that is rolled back if `deadline` passes first
    ///
    /// # Returns
    ///
    /// The number of frontier rows marked processed
    fn commit_raw_pages(&mut self, pages: &[RawPage], deadline: Instant) -> StorageResult<usize>;

    /// Gets up to `limit` unprocessed raw pages whose URL is not in `skip`
    fn fetch_unprocessed_raw(&self, limit: usize, skip: &[String]) -> StorageResult<Vec<RawPage>>;

    /// Gets a raw page by URL
    fn get_raw_page(&self, url: &str) -> StorageResult<Option<RawPage>>;

    /// Counts raw pages with the given processed flag
    fn count_raw_by_processed(&self, processed: bool) -> StorageResult<u64>;

    // ===== Properties =====

    /// Stores extracted properties and marks their raw pages processed, in
    /// one transaction that is rolled back if `deadline` passes first
    ///
    /// # Returns
    ///
    /// The number of raw pages marked processed
    fn commit_properties(
        &mut self,
        properties: &[Property],
        deadline: Instant,
    ) -> StorageResult<usize>;

    /// Gets a property by URL
    fn get_property(&self, url: &str) -> StorageResult<Option<Property>>;

    /// Counts stored properties
    fn count_properties(&self) -> StorageResult<u64>;

    // ===== Run Management =====

    /// Creates a new ingestion run in the running state
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Closes a run with its final status and counters
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        totals: RunTotals,
        error_message: Option<&str>,
    ) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;
}
