//! Paged listing of discovered URLs

use crate::storage::Storage;
use crate::Result;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 1000;

/// Page request; both fields are 1-based and optional
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl ListQuery {
    /// Effective (page, limit), applying defaults and the limit cap
    pub fn resolve(&self) -> (u64, u64) {
        let page = self.page.filter(|p| *p > 0).unwrap_or(DEFAULT_PAGE);
        let limit = self
            .limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);
        (page, limit)
    }
}

/// One page of discovered URLs with the overall count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlPage {
    pub data: Vec<String>,
    pub total_count: u64,
    pub page: u64,
    pub limit: u64,
}

/// Lists discovered URLs in discovery order
///
/// `total_count` covers every known URL, not just the returned page.
pub fn list_urls(storage: &dyn Storage, query: ListQuery) -> Result<UrlPage> {
    let (page, limit) = query.resolve();
    let offset = (page - 1).saturating_mul(limit);

    Ok(UrlPage {
        data: storage.list_frontier_urls(offset, limit)?,
        total_count: storage.count_frontier_urls()?,
        page,
        limit,
    })
}
