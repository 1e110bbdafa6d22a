//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Listing Harvester
//! database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Configured cities
CREATE TABLE IF NOT EXISTS cities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

-- Listing URLs discovered on search-result pages
CREATE TABLE IF NOT EXISTS frontier_urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    city_id INTEGER NOT NULL REFERENCES cities(id),
    is_processed INTEGER NOT NULL DEFAULT 0,
    discovered_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_frontier_processed ON frontier_urls(is_processed);

-- Cleaned HTML captured for each listing
CREATE TABLE IF NOT EXISTS raw_pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    html TEXT NOT NULL,
    city_id INTEGER NOT NULL REFERENCES cities(id),
    is_processed INTEGER NOT NULL DEFAULT 0,
    captured_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_raw_processed ON raw_pages(is_processed);

-- Structured listing attributes
CREATE TABLE IF NOT EXISTS properties (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    price_min REAL,
    price_max REAL,
    price_unit TEXT,
    price_raw TEXT NOT NULL,
    description TEXT NOT NULL,
    main_features TEXT NOT NULL,
    last_updated TEXT,
    city_id INTEGER NOT NULL REFERENCES cities(id),
    extracted_at TEXT NOT NULL
);

-- Track ingestion runs
CREATE TABLE IF NOT EXISTS ingestion_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    urls_discovered INTEGER NOT NULL DEFAULT 0,
    pages_captured INTEGER NOT NULL DEFAULT 0,
    properties_extracted INTEGER NOT NULL DEFAULT 0,
    error_message TEXT
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
