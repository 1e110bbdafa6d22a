//! Capture, extraction and full ingestion against a mock listing site

use crate::common::{create_test_config, create_test_context, listing_page, results_page};
use listing_harvester::capture::run_capture;
use listing_harvester::drain::StopReason;
use listing_harvester::extract::run_extraction;
use listing_harvester::ingest::run_ingestion;
use listing_harvester::storage::{NewFrontierUrl, RunStatus, SqliteStorage, Storage};
use listing_harvester::IngestContext;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_listing(server: &MockServer, id: u32, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/annunci/{}/", id)))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

fn seed_frontier(ctx: &IngestContext, server: &MockServer, city_id: i64, ids: &[u32]) {
    let entries: Vec<_> = ids
        .iter()
        .map(|id| NewFrontierUrl {
            url: format!("{}/annunci/{}/", server.uri(), id),
            city_id,
        })
        .collect();
    ctx.lock_storage().unwrap().insert_frontier_urls(&entries).unwrap();
}

#[tokio::test]
async fn test_capture_drains_frontier_in_batches() {
    let server = MockServer::start().await;
    for id in 1..=5 {
        mount_listing(&server, id, 200, listing_page(&format!("Casa {}", id), "€ 100.000")).await;
    }

    let (ctx, city_id) = create_test_context(&server.uri());
    seed_frontier(&ctx, &server, city_id, &[1, 2, 3, 4, 5]);

    let report = run_capture(&ctx).await.unwrap();

    // batch size 2 over 5 URLs
    assert_eq!(report.batches, 3);
    assert_eq!(report.committed, 5);
    assert_eq!(report.stop, StopReason::Exhausted);

    let storage = ctx.lock_storage().unwrap();
    assert_eq!(storage.count_frontier_by_processed(false).unwrap(), 0);
    assert_eq!(storage.count_raw_by_processed(false).unwrap(), 5);

    let raw = storage
        .get_raw_page(&format!("{}/annunci/3/", server.uri()))
        .unwrap()
        .unwrap();
    assert!(raw.html.contains("Casa 3"));
    assert!(!raw.html.contains("<meta"));
    assert!(!raw.html.contains("<svg"));
    assert!(raw.html.contains("Vicino\nalla metro"));
}

#[tokio::test]
async fn test_capture_isolates_failing_listing() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, 200, listing_page("Uno", "€ 1")).await;
    mount_listing(&server, 2, 500, String::new()).await;
    mount_listing(&server, 3, 200, listing_page("Tre", "€ 3")).await;

    let (ctx, city_id) = create_test_context(&server.uri());
    seed_frontier(&ctx, &server, city_id, &[1, 2, 3]);

    let report = run_capture(&ctx).await.unwrap();

    assert_eq!(report.committed, 2);
    assert_eq!(report.item_failures, 1);

    let storage = ctx.lock_storage().unwrap();
    let failed = storage
        .get_frontier_url(&format!("{}/annunci/2/", server.uri()))
        .unwrap()
        .unwrap();
    assert!(!failed.is_processed);
    assert!(storage
        .get_raw_page(&format!("{}/annunci/2/", server.uri()))
        .unwrap()
        .is_none());
    assert!(storage
        .get_frontier_url(&format!("{}/annunci/3/", server.uri()))
        .unwrap()
        .unwrap()
        .is_processed);
}

#[tokio::test]
async fn test_capture_then_extract() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, 200, listing_page("Bilocale Navigli", "€ 320.000")).await;
    mount_listing(&server, 2, 200, listing_page("Monolocale", "€ 1.200/mese")).await;

    let (ctx, city_id) = create_test_context(&server.uri());
    seed_frontier(&ctx, &server, city_id, &[1, 2]);

    run_capture(&ctx).await.unwrap();
    let report = run_extraction(&ctx).await.unwrap();

    assert_eq!(report.committed, 2);
    assert_eq!(report.item_failures, 0);

    let storage = ctx.lock_storage().unwrap();
    assert_eq!(storage.count_properties().unwrap(), 2);
    assert_eq!(storage.count_raw_by_processed(false).unwrap(), 0);

    let property = storage
        .get_property(&format!("{}/annunci/1/", server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(property.title, "Bilocale Navigli");
    assert_eq!(property.price_min, Some(320000.0));
    assert_eq!(property.price_max, None);
    assert_eq!(property.price_unit.as_deref(), Some("€"));
    assert_eq!(property.main_features, vec!["2 locali", "60 m²"]);
    assert_eq!(property.description, "Centrale\nVicino\nalla metro");
    assert_eq!(property.last_updated.as_deref(), Some("01/02/2024"));
    assert_eq!(property.city_id, city_id);

    let rent = storage
        .get_property(&format!("{}/annunci/2/", server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(rent.price_min, None);
    assert_eq!(rent.price_raw, "€ 1.200/mese");
}

#[tokio::test]
async fn test_extraction_on_empty_store_is_noop() {
    let (ctx, _) = create_test_context("http://127.0.0.1:9");

    let report = run_extraction(&ctx).await.unwrap();

    assert_eq!(report.batches, 0);
    assert_eq!(report.stop, StopReason::Exhausted);
}

#[tokio::test]
async fn test_full_ingestion_run() {
    let server = MockServer::start().await;

    // Only the houses-for-sale search has results; every other seed 404s
    Mock::given(method("GET"))
        .and(path("/vendita-case/milano/"))
        .and(query_param("pag", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(
            &["/annunci/1/".to_string(), "/annunci/2/".to_string()],
            Some(2),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vendita-case/milano/"))
        .and(query_param("pag", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(results_page(&["/annunci/3/".to_string()], Some(2))),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_listing(&server, 1, 200, listing_page("Uno", "€ 150.000 - 200.000")).await;
    mount_listing(&server, 2, 200, listing_page("Due", "€ 99.000")).await;
    mount_listing(&server, 3, 404, String::new()).await;

    let config = create_test_config(&server.uri(), "Milano");
    let ctx = IngestContext::new(config, SqliteStorage::new_in_memory().unwrap()).unwrap();

    let report = run_ingestion(&ctx).await.unwrap();

    assert_eq!(report.seeds, 14);
    assert_eq!(report.crawl.urls_inserted, 3);
    assert_eq!(report.crawl.pages_failed, 13);
    assert_eq!(report.capture.committed, 2);
    assert_eq!(report.capture.item_failures, 1);
    assert_eq!(report.extraction.committed, 2);

    let storage = ctx.lock_storage().unwrap();
    assert_eq!(storage.list_cities().unwrap()[0].name, "milano");

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.id, report.run_id);
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.urls_discovered, 3);
    assert_eq!(run.pages_captured, 2);
    assert_eq!(run.properties_extracted, 2);
    assert_eq!(run.config_hash, ctx.config.fingerprint());
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vendita-case/milano/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(results_page(&["/annunci/1/".to_string()], None)),
        )
        .mount(&server)
        .await;
    mount_listing(&server, 1, 200, listing_page("Uno", "€ 10.000")).await;

    let config = create_test_config(&server.uri(), "milano");
    let ctx = IngestContext::new(config, SqliteStorage::new_in_memory().unwrap()).unwrap();

    run_ingestion(&ctx).await.unwrap();
    let second = run_ingestion(&ctx).await.unwrap();

    assert_eq!(second.crawl.urls_inserted, 0);
    assert_eq!(second.capture.batches, 0);
    assert_eq!(second.extraction.batches, 0);

    let storage = ctx.lock_storage().unwrap();
    assert_eq!(storage.count_frontier_urls().unwrap(), 1);
    assert_eq!(storage.count_properties().unwrap(), 1);
    assert_eq!(storage.list_cities().unwrap().len(), 1);
}
