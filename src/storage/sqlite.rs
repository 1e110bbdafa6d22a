//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    City, FrontierUrl, NewFrontierUrl, Property, RawPage, RunRecord, RunStatus, RunTotals,
};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::time::{Duration, Instant};

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database, used by tests and throwaway runs
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Fails the surrounding transaction once its deadline has passed
///
/// Returning an error drops the `Transaction`, which rolls it back.
fn check_deadline(deadline: Instant, step: &'static str) -> StorageResult<()> {
    if Instant::now() >= deadline {
        return Err(StorageError::TransactionTimeout(step));
    }
    Ok(())
}

fn urls_json<'a>(urls: impl Iterator<Item = &'a str>) -> StorageResult<String> {
    Ok(serde_json::to_string(&urls.collect::<Vec<_>>())?)
}

fn frontier_from_row(row: &Row<'_>) -> rusqlite::Result<FrontierUrl> {
    Ok(FrontierUrl {
        url: row.get(0)?,
        city_id: row.get(1)?,
        is_processed: row.get(2)?,
    })
}

fn raw_page_from_row(row: &Row<'_>) -> rusqlite::Result<RawPage> {
    Ok(RawPage {
        url: row.get(0)?,
        html: row.get(1)?,
        city_id: row.get(2)?,
        is_processed: row.get(3)?,
    })
}

fn property_from_row(row: &Row<'_>) -> rusqlite::Result<Property> {
    let features_json: String = row.get(7)?;
    let main_features = serde_json::from_str(&features_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;

    Ok(Property {
        url: row.get(0)?,
        title: row.get(1)?,
        price_min: row.get(2)?,
        price_max: row.get(3)?,
        price_unit: row.get(4)?,
        price_raw: row.get(5)?,
        description: row.get(6)?,
        main_features,
        last_updated: row.get(8)?,
        city_id: row.get(9)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Failed),
        urls_discovered: row.get::<_, i64>(5)? as u64,
        pages_captured: row.get::<_, i64>(6)? as u64,
        properties_extracted: row.get::<_, i64>(7)? as u64,
        error_message: row.get(8)?,
    })
}

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, urls_discovered,
     pages_captured, properties_extracted, error_message";

impl Storage for SqliteStorage {
    // ===== Cities =====

    fn ensure_cities(&mut self, names: &[String]) -> StorageResult<Vec<City>> {
        let tx = self.conn.transaction()?;
        let mut cities = Vec::with_capacity(names.len());
        {
            let mut insert = tx.prepare("INSERT OR IGNORE INTO cities (name) VALUES (?1)")?;
            let mut lookup = tx.prepare("SELECT id, name FROM cities WHERE name = ?1")?;
            for name in names {
                insert.execute(params![name])?;
                let city = lookup.query_row(params![name], |row| {
                    Ok(City {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?;
                cities.push(city);
            }
        }
        tx.commit()?;
        Ok(cities)
    }

    fn list_cities(&self) -> StorageResult<Vec<City>> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM cities ORDER BY id")?;
        let cities = stmt
            .query_map([], |row| {
                Ok(City {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cities)
    }

    // ===== Frontier =====

    fn insert_frontier_urls(&mut self, entries: &[NewFrontierUrl]) -> StorageResult<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO frontier_urls (url, city_id, is_processed, discovered_at)
                 VALUES (?1, ?2, 0, ?3)",
            )?;
            for entry in entries {
                inserted += stmt.execute(params![entry.url, entry.city_id, now])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn fetch_unprocessed_frontier(
        &self,
        limit: usize,
        skip: &[String],
    ) -> StorageResult<Vec<FrontierUrl>> {
        let skip_json = urls_json(skip.iter().map(String::as_str))?;
        let mut stmt = self.conn.prepare(
            "SELECT url, city_id, is_processed FROM frontier_urls
             WHERE is_processed = 0
               AND url NOT IN (SELECT value FROM json_each(?1))
             ORDER BY id
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![skip_json, limit as i64], frontier_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_frontier_url(&self, url: &str) -> StorageResult<Option<FrontierUrl>> {
        let row = self
            .conn
            .query_row(
                "SELECT url, city_id, is_processed FROM frontier_urls WHERE url = ?1",
                params![url],
                frontier_from_row,
            )
            .optional()?;
        Ok(row)
    }

    fn list_frontier_urls(&self, offset: u64, limit: u64) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url FROM frontier_urls ORDER BY id LIMIT ?1 OFFSET ?2")?;
        // SQLite reads a negative OFFSET as zero
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let urls = stmt
            .query_map(params![limit, offset], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(urls)
    }

    fn count_frontier_urls(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM frontier_urls", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_frontier_by_processed(&self, processed: bool) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM frontier_urls WHERE is_processed = ?1",
            params![processed],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Raw pages =====

    fn commit_raw_pages(&mut self, pages: &[RawPage], deadline: Instant) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let urls = urls_json(pages.iter().map(|p| p.url.as_str()))?;

        let tx = self.conn.transaction()?;
        {
            let mut insert = tx.prepare(
                "INSERT OR IGNORE INTO raw_pages (url, html, city_id, is_processed, captured_at)
                 VALUES (?1, ?2, ?3, 0, ?4)",
            )?;
            for page in pages {
                insert.execute(params![page.url, page.html, page.city_id, now])?;
            }
        }
        check_deadline(deadline, "raw page insert")?;

        let marked = tx.execute(
            "UPDATE frontier_urls SET is_processed = 1
             WHERE is_processed = 0
               AND url IN (SELECT value FROM json_each(?1))
               AND url IN (SELECT url FROM raw_pages)",
            params![urls],
        )?;
        check_deadline(deadline, "frontier update")?;

        tx.commit()?;
        Ok(marked)
    }

    fn fetch_unprocessed_raw(&self, limit: usize, skip: &[String]) -> StorageResult<Vec<RawPage>> {
        let skip_json = urls_json(skip.iter().map(String::as_str))?;
        let mut stmt = self.conn.prepare(
            "SELECT url, html, city_id, is_processed FROM raw_pages
             WHERE is_processed = 0
               AND url NOT IN (SELECT value FROM json_each(?1))
             ORDER BY id
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![skip_json, limit as i64], raw_page_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_raw_page(&self, url: &str) -> StorageResult<Option<RawPage>> {
        let row = self
            .conn
            .query_row(
                "SELECT url, html, city_id, is_processed FROM raw_pages WHERE url = ?1",
                params![url],
                raw_page_from_row,
            )
            .optional()?;
        Ok(row)
    }

    fn count_raw_by_processed(&self, processed: bool) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM raw_pages WHERE is_processed = ?1",
            params![processed],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Properties =====

    fn commit_properties(
        &mut self,
        properties: &[Property],
        deadline: Instant,
    ) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let urls = urls_json(properties.iter().map(|p| p.url.as_str()))?;

        let tx = self.conn.transaction()?;
        {
            let mut insert = tx.prepare(
                "INSERT OR IGNORE INTO properties
                 (url, title, price_min, price_max, price_unit, price_raw, description,
                  main_features, last_updated, city_id, extracted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for property in properties {
                let features = serde_json::to_string(&property.main_features)?;
                insert.execute(params![
                    property.url,
                    property.title,
                    property.price_min,
                    property.price_max,
                    property.price_unit,
                    property.price_raw,
                    property.description,
                    features,
                    property.last_updated,
                    property.city_id,
                    now,
                ])?;
            }
        }
        check_deadline(deadline, "property insert")?;

        let marked = tx.execute(
            "UPDATE raw_pages SET is_processed = 1
             WHERE is_processed = 0
               AND url IN (SELECT value FROM json_each(?1))
               AND url IN (SELECT url FROM properties)",
            params![urls],
        )?;
        check_deadline(deadline, "raw page update")?;

        tx.commit()?;
        Ok(marked)
    }

    fn get_property(&self, url: &str) -> StorageResult<Option<Property>> {
        let row = self
            .conn
            .query_row(
                "SELECT url, title, price_min, price_max, price_unit, price_raw, description,
                 main_features, last_updated, city_id
                 FROM properties WHERE url = ?1",
                params![url],
                property_from_row,
            )
            .optional()?;
        Ok(row)
    }

    fn count_properties(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM properties", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO ingestion_runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        totals: RunTotals,
        error_message: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE ingestion_runs
             SET status = ?1, finished_at = ?2, urls_discovered = ?3, pages_captured = ?4,
                 properties_extracted = ?5, error_message = ?6
             WHERE id = ?7",
            params![
                status.to_db_string(),
                now,
                totals.urls_discovered as i64,
                totals.pages_captured as i64,
                totals.properties_extracted as i64,
                error_message,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM ingestion_runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM ingestion_runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }
}
