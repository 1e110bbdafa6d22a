//! Extraction stage
//!
//! Drains captured raw pages into structured property rows. Committing a
//! batch marks the raw pages whose property now exists.

mod parser;
mod price;

pub use parser::extract_property;
pub use price::{parse_number, parse_price, PriceInfo};

use crate::drain::{drain, BatchFetch, DrainOptions, DrainReport};
use crate::ingest::IngestContext;
use crate::storage::{Property, RawPage, Storage};
use crate::Result;

/// Runs the extraction drain until no unprocessed raw page is left
pub async fn run_extraction(ctx: &IngestContext) -> Result<DrainReport> {
    let options = DrainOptions::from_config(&ctx.config.crawler);

    drain(
        "extract",
        &options,
        |limit, skip| {
            let pages = ctx.lock_storage()?.fetch_unprocessed_raw(limit, skip)?;
            Ok(BatchFetch::from_items(pages))
        },
        |page: RawPage| async move { extract_property(&page) },
        |properties: Vec<Property>, deadline| {
            Ok(ctx.lock_storage()?.commit_properties(&properties, deadline)?)
        },
    )
    .await
}
