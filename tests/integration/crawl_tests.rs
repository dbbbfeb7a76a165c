//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the catalog API and run the
//! full listing -> detail -> sink cycle over real HTTP.

use catalog_crawler::catalog::CategoryId;
use catalog_crawler::config::{Config, OutputConfig, SinkKind};
use catalog_crawler::crawler::{crawl, Coordinator, CrawlEvent, FailureKind};
use catalog_crawler::output::{JsonLinesSink, MemorySink, RunStatus, SqliteSink};
use catalog_crawler::WalkState;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(server: &MockServer, output: OutputConfig) -> Config {
    let mut config = Config::new(output);
    config.api.base_url = format!("{}/buyer/v1", server.uri());
    config.api.catalog_url = "https://fix-price.com/catalog".to_string();
    config.crawler.page_size = 2;
    config.crawler.per_request_timeout = 2_000;
    config.crawler.max_retries = 1;
    config.crawler.retry_delay = 10;
    config
}

fn listing(entries: &[(&str, &str)]) -> Value {
    Value::Array(
        entries
            .iter()
            .map(|(url, title)| json!({"url": url, "category": {"title": title}}))
            .collect(),
    )
}

async fn mount_listing_page(server: &MockServer, category: &str, page: u32, body: Value) {
    Mock::given(method("POST"))
        .and(path(format!("/buyer/v1/product/in/{}", category)))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, slug: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/buyer/v1/product/{}", slug)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn simple_detail(id: u64, price: f64) -> Value {
    json!({"id": id, "title": format!("Товар {}", id), "variants": [{"fixPrice": price, "count": 1}]})
}

#[tokio::test]
async fn test_full_crawl_to_jsonl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("products.jsonl");

    // Listing requests must carry the city header and the category filter
    Mock::given(method("POST"))
        .and(path("/buyer/v1/product/in/igrushki"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "2"))
        .and(query_param("sort", "sold"))
        .and(header("x-city", "55"))
        .and(body_partial_json(json!({"category": "igrushki"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&[
            ("p-101-myach", "Игрушки"),
            ("p-102-kukla", "Игрушки"),
        ])))
        .expect(1)
        .mount(&server)
        .await;
    mount_listing_page(&server, "igrushki", 2, listing(&[("p-103-kubiki", "Игрушки")])).await;
    mount_listing_page(&server, "igrushki", 3, json!([])).await;

    mount_detail(
        &server,
        "p-101-myach",
        json!({
            "id": 101,
            "title": "Мяч",
            "description": "Резиновый мяч",
            "sku": "4601234",
            "price": "149",
            "specialPrice": {"price": 99},
            "brand": {"title": "Fix Toys"},
            "images": [{"src": "https://img.example.com/1.jpg"}, {"src": "https://img.example.com/2.jpg"}],
            "properties": [{"title": "Страна производства", "value": "Китай"}],
            "variants": [{"fixPrice": 149, "count": 12, "dimensions": {"Вес": "0.2"}}]
        }),
    )
    .await;
    mount_detail(&server, "p-102-kukla", simple_detail(102, 199.0)).await;
    mount_detail(&server, "p-103-kubiki", simple_detail(103, 59.0)).await;

    let mut config = create_test_config(
        &server,
        OutputConfig::new(SinkKind::Jsonl, out.to_string_lossy()),
    );
    config.categories = vec!["igrushki".to_string()];

    let sink = Arc::new(JsonLinesSink::open(&out).await.unwrap());
    let summary = crawl(config, sink).await.unwrap();

    assert_eq!(summary.records_written, 3);
    assert_eq!(summary.categories_exhausted, 1);
    assert_eq!(summary.pages_fetched, 3);
    assert_eq!(summary.total_failures(), 0);

    let content = std::fs::read_to_string(&out).unwrap();
    let records: Vec<Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 3);

    let ball = records.iter().find(|r| r["RPC"] == "101").unwrap();
    assert_eq!(ball["url"], "https://fix-price.com/catalog/p-101-myach");
    assert_eq!(ball["title"], "Мяч");
    assert_eq!(ball["brand"], "Fix Toys");
    assert_eq!(ball["section"], "Игрушки");
    assert_eq!(ball["price_data"]["current"], 99.0);
    assert_eq!(ball["price_data"]["original"], 149.0);
    assert_eq!(ball["price_data"]["sale_tag"], "Скидка 34%");
    assert_eq!(ball["stock"]["in_stock"], true);
    assert_eq!(ball["stock"]["count"], 12);
    assert_eq!(ball["assets"]["main_image"], "https://img.example.com/1.jpg");
    assert_eq!(ball["assets"]["set_images"].as_array().unwrap().len(), 2);
    assert_eq!(ball["metadata"]["Страна производства"], "Китай");
    assert_eq!(ball["metadata"]["Вес"], "0.2");
    assert_eq!(ball["metadata"]["Артикул"], "4601234");
    assert_eq!(ball["variants"], 1);

    // Non-ASCII text is written as-is
    assert!(content.contains("Игрушки"));
}

#[tokio::test]
async fn test_detail_error_does_not_block_others() {
    let server = MockServer::start().await;

    mount_listing_page(
        &server,
        "posuda",
        1,
        listing(&[("p-1", "Посуда"), ("p-2", "Посуда")]),
    )
    .await;
    mount_listing_page(&server, "posuda", 2, listing(&[("p-3", "Посуда")])).await;
    mount_listing_page(&server, "posuda", 3, json!([])).await;

    // Retried once by the HTTP fetcher, then reported
    Mock::given(method("GET"))
        .and(path("/buyer/v1/product/p-2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;
    mount_detail(&server, "p-1", simple_detail(1, 100.0)).await;
    mount_detail(&server, "p-3", simple_detail(3, 100.0)).await;

    let sink = Arc::new(MemorySink::new());
    let config = create_test_config(&server, OutputConfig::new(SinkKind::Jsonl, "unused"));
    let coordinator = Coordinator::with_http(config, sink.clone()).unwrap();

    let mut handle = coordinator
        .spawn(CategoryId::parse_all(["posuda"]).unwrap())
        .unwrap();
    let mut failed_items = Vec::new();
    while let Some(event) = handle.next_event().await {
        if let CrawlEvent::Failure(failure) = event {
            failed_items.push(failure.to_string());
        }
    }
    let summary = handle.finish().await.unwrap();

    assert_eq!(summary.records_written, 2);
    assert_eq!(summary.failures_of(FailureKind::DetailFetch), 1);
    assert_eq!(failed_items.len(), 1);
    assert!(failed_items[0].contains("p-2"));

    let mut rpcs: Vec<_> = sink.records().into_iter().map(|r| r.rpc).collect();
    rpcs.sort();
    assert_eq!(rpcs, ["1", "3"]);
}

#[tokio::test]
async fn test_schema_error_isolated_to_category() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/buyer/v1/product/in/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;
    mount_listing_page(&server, "healthy", 1, listing(&[("p-7", "Канцтовары")])).await;
    mount_listing_page(&server, "healthy", 2, json!([])).await;
    mount_detail(&server, "p-7", simple_detail(7, 35.0)).await;

    let sink = Arc::new(MemorySink::new());
    let config = create_test_config(&server, OutputConfig::new(SinkKind::Jsonl, "unused"));
    let coordinator = Coordinator::with_http(config, sink.clone()).unwrap();

    let mut handle = coordinator
        .spawn(CategoryId::parse_all(["broken", "healthy"]).unwrap())
        .unwrap();
    let mut states = Vec::new();
    while let Some(event) = handle.next_event().await {
        if let CrawlEvent::CategoryFinished {
            category, state, ..
        } = event
        {
            states.push((category.to_string(), state));
        }
    }
    let summary = handle.finish().await.unwrap();

    states.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        states,
        vec![
            ("broken".to_string(), WalkState::Failed),
            ("healthy".to_string(), WalkState::Exhausted)
        ]
    );
    assert_eq!(summary.failures_of(FailureKind::ListingSchema), 1);
    assert_eq!(summary.records_written, 1);
    assert_eq!(sink.records()[0].section, "Канцтовары");
}

#[tokio::test]
async fn test_empty_first_page() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/buyer/v1/product/in/pusto"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let config = create_test_config(&server, OutputConfig::new(SinkKind::Jsonl, "unused"));
    let summary = Coordinator::with_http(config, sink.clone())
        .unwrap()
        .run(CategoryId::parse_all(["pusto"]).unwrap())
        .await
        .unwrap();

    assert_eq!(summary.records_written, 0);
    assert_eq!(summary.categories_exhausted, 1);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_crawl_into_sqlite() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("catalog.db");

    mount_listing_page(
        &server,
        "dom",
        1,
        listing(&[("p-11", "Для дома"), ("p-12", "Для дома")]),
    )
    .await;
    mount_listing_page(&server, "dom", 2, json!([])).await;
    mount_detail(&server, "p-11", simple_detail(11, 100.0)).await;
    mount_detail(
        &server,
        "p-12",
        json!({"id": 12, "title": "Ваза", "specialPrice": {"price": 75}, "variants": [{"fixPrice": 100, "count": 0}]}),
    )
    .await;

    let sink = Arc::new(SqliteSink::open(&db_path).unwrap());
    let run_id = sink.begin_run("test-hash").unwrap();

    let mut config = create_test_config(
        &server,
        OutputConfig::new(SinkKind::Sqlite, db_path.to_string_lossy()),
    );
    config.categories = vec!["dom".to_string()];
    let summary = crawl(config, sink.clone()).await.unwrap();
    sink.finish_run(
        run_id,
        RunStatus::Completed,
        summary.records_written,
        summary.total_failures(),
    )
    .unwrap();

    assert_eq!(sink.count_records().unwrap(), 2);
    assert_eq!(sink.count_on_sale().unwrap(), 1);
    assert_eq!(sink.count_in_stock().unwrap(), 1);

    let vase = sink.get_record("12").unwrap().unwrap();
    assert_eq!(vase.price_data.sale_tag, "Скидка 25%");
    assert!(!vase.stock.in_stock);

    let run = sink.latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.records_written, 2);
}
