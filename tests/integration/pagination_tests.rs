//! Pagination crawler against a mock listing site

use crate::common::{create_test_context, listing_hrefs, results_page};
use listing_harvester::crawler::PaginationCrawler;
use listing_harvester::frontier::{Category, Purpose, SearchKind, SeedUrl};
use listing_harvester::storage::Storage;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH_PATH: &str = "/vendita-case/milano/";

fn seed(server: &MockServer, city_id: i64) -> SeedUrl {
    SeedUrl::new(
        format!(
            "{}{}?criterio=data&ordine=desc&pag=*",
            server.uri(),
            SEARCH_PATH
        ),
        city_id,
        "milano",
        SearchKind::Shared(Purpose::Sale, Category::Houses),
    )
}

async fn mount_page(server: &MockServer, page: &str, status: u16, body: String, hits: u64) {
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("pag", page))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .expect(hits)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_three_pages_yield_twelve_urls() {
    let server = MockServer::start().await;
    mount_page(&server, "1", 200, results_page(&listing_hrefs(1, 5), Some(3)), 1).await;
    mount_page(&server, "2", 200, results_page(&listing_hrefs(6, 10), Some(3)), 1).await;
    mount_page(&server, "3", 200, results_page(&listing_hrefs(11, 12), Some(3)), 1).await;

    let (ctx, city_id) = create_test_context(&server.uri());
    let crawler = PaginationCrawler::new(ctx.client.clone(), Arc::clone(&ctx.storage), 2);

    let report = crawler.crawl(&seed(&server, city_id)).await;

    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.pages_failed, 0);
    assert_eq!(report.last_page, 3);
    assert_eq!(report.urls_inserted, 12);

    let storage = ctx.lock_storage().unwrap();
    assert_eq!(storage.count_frontier_urls().unwrap(), 12);
    let row = storage
        .get_frontier_url(&format!("{}/annunci/12/", server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(row.city_id, city_id);
    assert!(!row.is_processed);
}

#[tokio::test]
async fn test_missing_pagination_fetches_once() {
    let server = MockServer::start().await;
    mount_page(&server, "1", 200, results_page(&listing_hrefs(1, 4), None), 1).await;
    mount_page(&server, "2", 200, results_page(&listing_hrefs(5, 6), None), 0).await;

    let (ctx, city_id) = create_test_context(&server.uri());
    let crawler = PaginationCrawler::new(ctx.client.clone(), Arc::clone(&ctx.storage), 4);

    let report = crawler.crawl(&seed(&server, city_id)).await;

    assert_eq!(report.last_page, 1);
    assert_eq!(report.pages_fetched, 1);
    assert_eq!(ctx.lock_storage().unwrap().count_frontier_urls().unwrap(), 4);
}

#[tokio::test]
async fn test_failed_page_does_not_stop_others() {
    let server = MockServer::start().await;
    mount_page(&server, "1", 200, results_page(&listing_hrefs(1, 3), Some(3)), 1).await;
    mount_page(&server, "2", 503, String::new(), 1).await;
    mount_page(&server, "3", 200, results_page(&listing_hrefs(4, 5), Some(3)), 1).await;

    let (ctx, city_id) = create_test_context(&server.uri());
    let crawler = PaginationCrawler::new(ctx.client.clone(), Arc::clone(&ctx.storage), 2);

    let report = crawler.crawl(&seed(&server, city_id)).await;

    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.pages_failed, 1);
    assert_eq!(ctx.lock_storage().unwrap().count_frontier_urls().unwrap(), 5);
}

#[tokio::test]
async fn test_failed_first_page_ends_seed() {
    let server = MockServer::start().await;
    mount_page(&server, "1", 500, String::new(), 1).await;
    mount_page(&server, "2", 200, results_page(&listing_hrefs(1, 2), Some(2)), 0).await;

    let (ctx, city_id) = create_test_context(&server.uri());
    let crawler = PaginationCrawler::new(ctx.client.clone(), Arc::clone(&ctx.storage), 2);

    let report = crawler.crawl(&seed(&server, city_id)).await;

    assert_eq!(report.pages_fetched, 0);
    assert_eq!(report.pages_failed, 1);
    assert_eq!(ctx.lock_storage().unwrap().count_frontier_urls().unwrap(), 0);
}

#[tokio::test]
async fn test_repeated_links_across_pages_are_stored_once() {
    let server = MockServer::start().await;
    mount_page(&server, "1", 200, results_page(&listing_hrefs(1, 3), Some(2)), 1).await;
    mount_page(&server, "2", 200, results_page(&listing_hrefs(3, 5), Some(2)), 1).await;

    let (ctx, city_id) = create_test_context(&server.uri());
    let crawler = PaginationCrawler::new(ctx.client.clone(), Arc::clone(&ctx.storage), 2);

    let report = crawler.crawl(&seed(&server, city_id)).await;

    assert_eq!(report.links_found, 6);
    assert_eq!(report.urls_inserted, 5);
    assert_eq!(ctx.lock_storage().unwrap().count_frontier_urls().unwrap(), 5);
}

#[tokio::test]
async fn test_crawl_all_sums_seeds() {
    let server = MockServer::start().await;
    mount_page(&server, "1", 200, results_page(&listing_hrefs(1, 2), None), 2).await;

    let (ctx, city_id) = create_test_context(&server.uri());
    let crawler = PaginationCrawler::new(ctx.client.clone(), Arc::clone(&ctx.storage), 2);
    let seeds = vec![seed(&server, city_id), seed(&server, city_id)];

    let report = crawler.crawl_all(&seeds).await;

    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.links_found, 4);
    // Second seed finds only known URLs
    assert_eq!(report.urls_inserted, 2);
}

#[tokio::test]
async fn test_storage_failure_skips_only_that_seed() {
    let server = MockServer::start().await;
    mount_page(&server, "1", 200, results_page(&listing_hrefs(1, 3), None), 2).await;

    let (ctx, city_id) = create_test_context(&server.uri());
    let crawler = PaginationCrawler::new(ctx.client.clone(), Arc::clone(&ctx.storage), 2);
    // No city row 9999, so the frontier insert violates the foreign key
    let seeds = vec![seed(&server, 9999), seed(&server, city_id)];

    let report = crawler.crawl_all(&seeds).await;

    assert_eq!(report.pages_failed, 1);
    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.urls_inserted, 3);
    assert_eq!(ctx.lock_storage().unwrap().count_frontier_urls().unwrap(), 3);
}
