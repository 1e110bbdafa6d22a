//! Pagination crawler
//!
//! Walks every result page of a seed search and records the listing links
//! it finds in the frontier table. Page 1 tells us how many pages exist;
//! pages 2..=N are fetched with bounded concurrency.

use crate::crawler::fetcher::fetch_html;
use crate::crawler::parser::{last_page, listing_links};
use crate::frontier::SeedUrl;
use crate::html::{strip_noise, Document};
use crate::storage::{NewFrontierUrl, SqliteStorage, Storage};
use crate::{HarvestError, Result};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::sync::{Arc, Mutex};
use url::Url;

/// Counters for one or more crawled seeds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Result pages fetched successfully
    pub pages_fetched: u64,
    /// Result pages whose fetch or frontier insert failed
    pub pages_failed: u64,
    /// Listing links seen, before deduplication against storage
    pub links_found: u64,
    /// Frontier rows actually inserted
    pub urls_inserted: u64,
    /// Last page number of the seed (largest across seeds when merged)
    pub last_page: u32,
}

impl CrawlReport {
    fn merge(&mut self, other: CrawlReport) {
        self.pages_fetched += other.pages_fetched;
        self.pages_failed += other.pages_failed;
        self.links_found += other.links_found;
        self.urls_inserted += other.urls_inserted;
        self.last_page = self.last_page.max(other.last_page);
    }
}

/// Crawls the paginated search results of seed URLs
pub struct PaginationCrawler {
    client: Client,
    storage: Arc<Mutex<SqliteStorage>>,
    page_concurrency: usize,
}

impl PaginationCrawler {
    /// Creates a crawler
    ///
    /// # Arguments
    ///
    /// * `client` - The shared HTTP client
    /// * `storage` - Storage receiving frontier rows
    /// * `page_concurrency` - Maximum result pages in flight per seed
    pub fn new(client: Client, storage: Arc<Mutex<SqliteStorage>>, page_concurrency: usize) -> Self {
        Self {
            client,
            storage,
            page_concurrency: page_concurrency.max(1),
        }
    }

    /// Crawls every result page of one seed
    ///
    /// A fetch failure on page 1 ends the seed (the page count is unknown).
    /// Any other page whose fetch or frontier insert fails is logged and
    /// counted in `pages_failed`; the remaining pages are still processed.
    pub async fn crawl(&self, seed: &SeedUrl) -> CrawlReport {
        let mut report = CrawlReport::default();

        let first_url = seed.page_url(1);
        tracing::debug!("Fetching search page {}", first_url);
        let body = match fetch_html(&self.client, &first_url).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Seed {} ({}) skipped: {}", seed.city, seed.kind, e);
                report.pages_failed += 1;
                return report;
            }
        };

        let (pages, links) = parse_results(&body, &first_url, true);
        report.last_page = pages;
        self.record_page(seed, &first_url, links, &mut report);

        let mut rest = stream::iter(2..=pages)
            .map(|page| {
                let url = seed.page_url(page);
                let client = &self.client;
                async move {
                    tracing::debug!("Fetching search page {}", url);
                    let result = fetch_html(client, &url).await;
                    (url, result)
                }
            })
            .buffer_unordered(self.page_concurrency);

        while let Some((url, result)) = rest.next().await {
            match result {
                Ok(body) => {
                    let (_, links) = parse_results(&body, &url, false);
                    self.record_page(seed, &url, links, &mut report);
                }
                Err(e) => {
                    tracing::warn!("Search page {} failed: {}", url, e);
                    report.pages_failed += 1;
                }
            }
        }

        tracing::info!(
            "Seed {} ({}): {} pages, {} links, {} new",
            seed.city,
            seed.kind,
            report.pages_fetched,
            report.links_found,
            report.urls_inserted
        );

        report
    }

    /// Crawls seeds one after another and sums their reports
    pub async fn crawl_all(&self, seeds: &[SeedUrl]) -> CrawlReport {
        let mut total = CrawlReport::default();
        for seed in seeds {
            let report = self.crawl(seed).await;
            total.merge(report);
        }
        total
    }

    fn record_page(&self, seed: &SeedUrl, url: &str, links: Vec<String>, report: &mut CrawlReport) {
        match self.record(seed, links, report) {
            Ok(()) => report.pages_fetched += 1,
            Err(e) => {
                tracing::warn!("Links from search page {} not stored: {}", url, e);
                report.pages_failed += 1;
            }
        }
    }

    fn record(&self, seed: &SeedUrl, links: Vec<String>, report: &mut CrawlReport) -> Result<()> {
        if links.is_empty() {
            tracing::debug!("No listings found on a page of {}", seed.template);
            return Ok(());
        }

        let entries: Vec<NewFrontierUrl> = links
            .into_iter()
            .map(|url| NewFrontierUrl {
                url,
                city_id: seed.city_id,
            })
            .collect();
        report.links_found += entries.len() as u64;

        let inserted = self
            .storage
            .lock()
            .map_err(|_| HarvestError::LockPoisoned)?
            .insert_frontier_urls(&entries)?;
        report.urls_inserted += inserted as u64;
        Ok(())
    }
}

/// Parses a search page into (last page, listing links)
///
/// Kept synchronous so no parsed document lives across an await point.
fn parse_results(body: &str, page_url: &str, read_pagination: bool) -> (u32, Vec<String>) {
    let mut document = Document::parse(body);
    strip_noise(&mut document);

    let pages = if read_pagination { last_page(&document) } else { 1 };
    let links = match Url::parse(page_url) {
        Ok(base) => listing_links(&document, &base),
        Err(e) => {
            tracing::warn!("Invalid search page URL {}: {}", page_url, e);
            Vec::new()
        }
    };
    (pages, links)
}
