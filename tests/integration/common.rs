//! Shared fixtures for integration tests

use listing_harvester::config::{
    Config, CrawlerConfig, OutputConfig, ServerConfig, SourceConfig, UserAgentConfig,
};
use listing_harvester::ingest::IngestContext;
use listing_harvester::storage::{SqliteStorage, Storage};

/// Creates a test configuration pointing at `base_url`
pub fn create_test_config(base_url: &str, cities: &str) -> Config {
    Config {
        source: SourceConfig {
            base_url: base_url.to_string(),
            cities: cities.to_string(),
        },
        crawler: CrawlerConfig {
            page_concurrency: 2,
            batch_size: 2,
            transaction_timeout_secs: 30,
            max_commit_failures: 3,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: ":memory:".to_string(),
        },
        server: ServerConfig::default(),
    }
}

/// Context over an in-memory database with the configured cities created
pub fn create_test_context(base_url: &str) -> (IngestContext, i64) {
    let config = create_test_config(base_url, "milano");
    let storage = SqliteStorage::new_in_memory().unwrap();
    let ctx = IngestContext::new(config, storage).unwrap();
    let city_id = ctx
        .lock_storage()
        .unwrap()
        .ensure_cities(&["milano".to_string()])
        .unwrap()[0]
        .id;
    (ctx, city_id)
}

/// A search-result page with the given listing hrefs and optional pagination
pub fn results_page(hrefs: &[String], last_page: Option<u32>) -> String {
    let pagination = match last_page {
        Some(last) => {
            let items: String = (1..=last).map(|n| format!("<a>{}</a>", n)).collect();
            format!(
                r#"<div class="in-pagination"><div class="in-pagination__list">{}</div></div>"#,
                items
            )
        }
        None => String::new(),
    };
    let items: String = hrefs
        .iter()
        .map(|h| {
            format!(
                r#"<li class="in-searchLayoutListItem"><a class="in-listingCardTitle" href="{}">Listing</a></li>"#,
                h
            )
        })
        .collect();
    format!(
        r#"<html><head><script>window.x = 1;</script></head><body>
        <ul class="ls-results">{}</ul>{}</body></html>"#,
        items, pagination
    )
}

/// Relative hrefs `/annunci/{from}/` ..= `/annunci/{to}/`
pub fn listing_hrefs(from: u32, to: u32) -> Vec<String> {
    (from..=to).map(|n| format!("/annunci/{}/", n)).collect()
}

/// A listing detail page
pub fn listing_page(title: &str, price: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><meta charset="utf-8"><link rel="icon" href="/f.ico"></head>
        <body>
          <h1 class="re-title__title">{}</h1>
          <div class="re-overview__price"><span>{}</span></div>
          <ul><li class="re-mainFeatures__item">2 locali</li><li class="re-mainFeatures__item">60 m²</li></ul>
          <h2 class="re-contentDescriptionHeading__title">Centrale</h2>
          <div class="in-readAll">Vicino<br>alla metro</div>
          <p class="re-lastUpdate__text">Aggiornato il 01/02/2024</p>
          <svg><circle r="1"/></svg>
        </body></html>"#,
        title, price
    )
}
