//! Search-result page parser
//!
//! This module reads the two things the pagination crawler needs from a
//! search-result page:
//! - The number of the last result page
//! - Listing links (resolved to absolute URLs)

use crate::html::Document;
use url::Url;

/// Items of the pagination control; the last one holds the last page number
const PAGINATION_ITEMS: &str = ".in-pagination .in-pagination__list > *";

/// One search result
const RESULT_ITEM: &str = "ul.ls-results li.in-searchLayoutListItem";

/// Title anchor inside a search result
const RESULT_LINK: &str = "a.in-listingCardTitle";

/// Reads the last page number from the pagination control
///
/// Returns 1 when the control is absent, when its last item is not a
/// number, or when the number is zero.
///
/// # Example
///
/// ```
/// use listing_harvester::crawler::last_page;
/// use listing_harvester::html::Document;
///
/// let doc = Document::parse(r#"<div class="in-pagination"><div class="in-pagination__list">
///     <a>1</a><a>2</a><div>...</div><a>17</a></div></div>"#);
/// assert_eq!(last_page(&doc), 17);
/// ```
pub fn last_page(document: &Document) -> u32 {
    document
        .select(PAGINATION_ITEMS)
        .last()
        .map(|el| document.element_text(*el))
        .and_then(|text| text.trim().parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(1)
}

/// Extracts listing links from a search-result page
///
/// For every result item the first title anchor's `href` is resolved
/// against `page_url`. Results without a usable link are skipped and
/// duplicates are dropped, keeping first-seen order.
///
/// # Arguments
///
/// * `document` - The parsed search-result page
/// * `page_url` - The URL the page was fetched from
pub fn listing_links(document: &Document, page_url: &Url) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();

    for item in document.select(RESULT_ITEM) {
        let href = document
            .select_within(item, RESULT_LINK)
            .into_iter()
            .next()
            .and_then(|a| a.value().attr("href").map(str::trim));

        let Some(href) = href.filter(|h| !h.is_empty()) else {
            continue;
        };

        match page_url.join(href) {
            Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
                let absolute = absolute.to_string();
                if !links.contains(&absolute) {
                    links.push(absolute);
                }
            }
            Ok(other) => tracing::debug!("Skipping non-HTTP listing link {}", other),
            Err(e) => tracing::debug!("Failed to resolve listing link {}: {}", href, e),
        }
    }

    links
}
