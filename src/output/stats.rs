//! Statistics generation from the ingestion database
//!
//! This module provides functionality for extracting and displaying
//! pipeline statistics from the storage layer.

use crate::storage::{RunRecord, Storage};
use crate::Result;
use serde::Serialize;

/// Pipeline statistics summary
#[derive(Debug, Clone, Serialize)]
pub struct IngestStatistics {
    /// Number of configured cities
    pub cities: u64,

    /// Total listing URLs discovered
    pub frontier_total: u64,

    /// Listing URLs already captured
    pub frontier_processed: u64,

    /// Raw pages waiting for extraction
    pub raw_pending: u64,

    /// Raw pages already extracted
    pub raw_processed: u64,

    /// Structured properties stored
    pub properties: u64,

    /// Most recent ingestion run
    pub latest_run: Option<RunRecord>,
}

impl IngestStatistics {
    /// Listing URLs still waiting for capture
    pub fn frontier_pending(&self) -> u64 {
        self.frontier_total.saturating_sub(self.frontier_processed)
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(IngestStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<IngestStatistics> {
    Ok(IngestStatistics {
        cities: storage.list_cities()?.len() as u64,
        frontier_total: storage.count_frontier_urls()?,
        frontier_processed: storage.count_frontier_by_processed(true)?,
        raw_pending: storage.count_raw_by_processed(false)?,
        raw_processed: storage.count_raw_by_processed(true)?,
        properties: storage.count_properties()?,
        latest_run: storage.get_latest_run()?,
    })
}

fn percentage(part: u64, total: u64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &IngestStatistics) {
    println!("=== Ingestion Statistics ===\n");

    println!("Overview:");
    println!("  Cities: {}", stats.cities);
    println!("  Listing URLs discovered: {}", stats.frontier_total);
    println!(
        "  Captured: {} ({:.1}%), pending: {}",
        stats.frontier_processed,
        percentage(stats.frontier_processed, stats.frontier_total),
        stats.frontier_pending()
    );
    let raw_total = stats.raw_pending + stats.raw_processed;
    println!(
        "  Raw pages: {} ({} extracted, {:.1}%)",
        raw_total,
        stats.raw_processed,
        percentage(stats.raw_processed, raw_total)
    );
    println!("  Properties: {}", stats.properties);
    println!();

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run:");
            println!("  ID: {}", run.id);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!(
                "  URLs discovered: {}, pages captured: {}, properties extracted: {}",
                run.urls_discovered, run.pages_captured, run.properties_extracted
            );
            if let Some(error) = &run.error_message {
                println!("  Error: {}", error);
            }
        }
        None => println!("No ingestion runs recorded yet."),
    }
}
