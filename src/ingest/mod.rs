//! Ingestion orchestration
//!
//! An ingestion run goes through every stage in order:
//! 1. Create city rows from configuration
//! 2. Generate seed URLs for every city, purpose and category
//! 3. Crawl all result pages of each seed into the frontier
//! 4. Drain the frontier into raw pages
//! 5. Drain raw pages into properties
//!
//! Each run is recorded in `ingestion_runs` so callers can poll its outcome.

use crate::capture::run_capture;
use crate::config::Config;
use crate::crawler::{build_http_client, CrawlReport, PaginationCrawler};
use crate::drain::DrainReport;
use crate::extract::run_extraction;
use crate::frontier::generate_seeds;
use crate::storage::{RunStatus, RunTotals, SqliteStorage, Storage};
use crate::{HarvestError, Result};
use reqwest::Client;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::task::JoinHandle;

/// Everything a pipeline stage needs, built once and passed explicitly
#[derive(Clone)]
pub struct IngestContext {
    pub config: Arc<Config>,
    pub storage: Arc<Mutex<SqliteStorage>>,
    pub client: Client,
    running: Arc<AtomicBool>,
}

impl IngestContext {
    /// Creates a context around an opened storage
    pub fn new(config: Config, storage: SqliteStorage) -> Result<Self> {
        let client = build_http_client(&config.user_agent)?;
        Ok(Self {
            config: Arc::new(config),
            storage: Arc::new(Mutex::new(storage)),
            client,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Opens the configured database and creates a context
    pub fn open(config: Config) -> Result<Self> {
        let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
        Self::new(config, storage)
    }

    /// Locks the shared storage
    ///
    /// The guard must be dropped before the next `.await`.
    pub fn lock_storage(&self) -> Result<MutexGuard<'_, SqliteStorage>> {
        self.storage.lock().map_err(|_| HarvestError::LockPoisoned)
    }

    /// True while a background ingestion started from this context runs
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Results of one complete ingestion
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub run_id: i64,
    pub seeds: usize,
    pub crawl: CrawlReport,
    pub capture: DrainReport,
    pub extraction: DrainReport,
}

impl IngestReport {
    pub fn totals(&self) -> RunTotals {
        RunTotals {
            urls_discovered: self.crawl.urls_inserted,
            pages_captured: self.capture.committed,
            properties_extracted: self.extraction.committed,
        }
    }
}

/// Result of asking for a background ingestion
#[derive(Debug)]
pub enum StartOutcome {
    Started(JoinHandle<()>),
    AlreadyRunning,
}

/// Runs one ingestion to completion in the current task
///
/// # Returns
///
/// * `Ok(IngestReport)` - Every stage finished; the run is marked completed
/// * `Err(HarvestError)` - A stage failed; the run is marked failed
pub async fn run_ingestion(ctx: &IngestContext) -> Result<IngestReport> {
    let run_id = ctx.lock_storage()?.create_run(&ctx.config.fingerprint())?;
    tracing::info!("Starting ingestion run {}", run_id);

    match run_stages(ctx).await {
        Ok(mut report) => {
            report.run_id = run_id;
            finish(ctx, run_id, RunStatus::Completed, report.totals(), None)?;
            Ok(report)
        }
        Err(e) => {
            let message = e.to_string();
            if let Err(finish_err) = finish(ctx, run_id, RunStatus::Failed, RunTotals::default(), Some(&message)) {
                tracing::error!("Failed to record failure of run {}: {}", run_id, finish_err);
            }
            Err(e)
        }
    }
}

async fn run_stages(ctx: &IngestContext) -> Result<IngestReport> {
    let names = ctx.config.source.city_names();
    let cities = ctx.lock_storage()?.ensure_cities(&names)?;

    let seeds = generate_seeds(&ctx.config.source.base_url, &cities);
    tracing::info!("Generated {} seed URLs for {} cities", seeds.len(), cities.len());

    let crawler = PaginationCrawler::new(
        ctx.client.clone(),
        Arc::clone(&ctx.storage),
        ctx.config.crawler.page_concurrency as usize,
    );
    let crawl = crawler.crawl_all(&seeds).await;
    tracing::info!(
        "Crawl finished: {} pages fetched, {} failed, {} new URLs",
        crawl.pages_fetched,
        crawl.pages_failed,
        crawl.urls_inserted
    );

    let capture = run_capture(ctx).await?;
    let extraction = run_extraction(ctx).await?;

    Ok(IngestReport {
        run_id: 0,
        seeds: seeds.len(),
        crawl,
        capture,
        extraction,
    })
}

fn finish(
    ctx: &IngestContext,
    run_id: i64,
    status: RunStatus,
    totals: RunTotals,
    error: Option<&str>,
) -> Result<()> {
    ctx.lock_storage()?.finish_run(run_id, status, totals, error)?;
    Ok(())
}

/// Logs completion and clears the running flag when the background task
/// ends, including by panic
struct RunningGuard {
    running: Arc<AtomicBool>,
    started: Instant,
}

impl RunningGuard {
    fn new(running: Arc<AtomicBool>) -> Self {
        Self {
            running,
            started: Instant::now(),
        }
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::error!("Ingestion task panicked");
        }
        tracing::info!("Ingestion finished in {:.2?}", self.started.elapsed());
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Starts an ingestion in the background and returns immediately
///
/// Errors never reach the caller; they are logged by the background task,
/// which always logs its completion with the elapsed time.
pub fn start_ingestion(ctx: IngestContext) -> StartOutcome {
    if ctx
        .running
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        tracing::warn!("Ingestion already running, not starting another");
        return StartOutcome::AlreadyRunning;
    }

    let handle = tokio::spawn(async move {
        let _guard = RunningGuard::new(Arc::clone(&ctx.running));

        match run_ingestion(&ctx).await {
            Ok(report) => {
                let totals = report.totals();
                tracing::info!(
                    "Run {} completed: {} URLs discovered, {} pages captured, {} properties extracted",
                    report.run_id,
                    totals.urls_discovered,
                    totals.pages_captured,
                    totals.properties_extracted
                );
            }
            Err(e) => tracing::error!("Ingestion failed: {}", e),
        }
    });

    StartOutcome::Started(handle)
}
