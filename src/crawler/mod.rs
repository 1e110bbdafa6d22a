//! Crawler module for search-result discovery
//!
//! This module contains the pagination crawling logic, including:
//! - HTTP fetching and error classification
//! - Search-page parsing (last page number, listing links)
//! - Bounded-concurrency crawling of every result page of a seed

mod fetcher;
mod pagination;
mod parser;

pub use fetcher::{build_http_client, fetch_html, FetchError};
pub use pagination::{CrawlReport, PaginationCrawler};
pub use parser::{last_page, listing_links};
