//! Raw capture stage
//!
//! Drains the frontier: every pending listing URL is fetched, its markup is
//! cleaned, and the result is stored as a raw page. Committing a batch marks
//! the frontier rows whose page now exists.

use crate::crawler::fetch_html;
use crate::drain::{drain, BatchFetch, DrainOptions, DrainReport, ItemError};
use crate::html::{strip_noise, Document};
use crate::ingest::IngestContext;
use crate::storage::{FrontierUrl, RawPage, Storage};
use crate::Result;
use reqwest::Client;

/// Elements dropped from captured listing pages
const CAPTURE_NOISE: &[&str] = &["link", "meta", "svg"];

/// Cleans a listing page for storage
///
/// Drops style, script, link, meta and svg elements, turns every `br` into a
/// newline and serializes what remains.
pub fn clean_item_html(html: &str) -> String {
    let mut document = Document::parse(html);
    strip_noise(&mut document);
    for css in CAPTURE_NOISE {
        document.remove(css);
    }
    document.replace_with_text("br", "\n");
    document.to_html()
}

/// Fetches and cleans one frontier entry
///
/// # Returns
///
/// * `Ok(RawPage)` - The cleaned page, not yet processed
/// * `Err(ItemError)` - The fetch failed; the entry stays pending
pub async fn capture_page(client: &Client, entry: &FrontierUrl) -> std::result::Result<RawPage, ItemError> {
    tracing::debug!("Capturing {}", entry.url);
    let body = fetch_html(client, &entry.url).await?;

    Ok(RawPage {
        url: entry.url.clone(),
        html: clean_item_html(&body),
        city_id: entry.city_id,
        is_processed: false,
    })
}

/// Runs the capture drain until the frontier has no pending rows
pub async fn run_capture(ctx: &IngestContext) -> Result<DrainReport> {
    let options = DrainOptions::from_config(&ctx.config.crawler);
    let client = &ctx.client;

    drain(
        "capture",
        &options,
        |limit, skip| {
            let entries = ctx.lock_storage()?.fetch_unprocessed_frontier(limit, skip)?;
            Ok(BatchFetch::from_items(entries))
        },
        |entry: FrontierUrl| async move { capture_page(client, &entry).await },
        |pages: Vec<RawPage>, deadline| Ok(ctx.lock_storage()?.commit_raw_pages(&pages, deadline)?),
    )
    .await
}
