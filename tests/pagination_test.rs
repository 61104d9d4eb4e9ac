//! Paginator behavior against a fake data API

mod common;

use common::{numbered_rows, FakeUpstream};
use serde_json::Value;
use vos_gateway::{FetchOutcome, PageParam, Paginator, UpstreamClient};

fn paginator(base_url: &str, page_size: u32, max_pages: u32, param: PageParam) -> Paginator {
    Paginator::new(
        UpstreamClient::new(reqwest::Client::new(), base_url),
        page_size,
        max_pages,
        param,
    )
}

#[tokio::test]
async fn test_three_pages_of_1000_1000_400() {
    let (base_url, fake) = FakeUpstream::new()
        .with_collection("customer", numbered_rows(2400))
        .start()
        .await;

    let fetch = paginator(&base_url, 1000, 50, PageParam::Offset)
        .fetch_all::<Value>("customer")
        .await
        .unwrap();

    assert_eq!(fake.hits("customer"), 3, "exactly three page requests");
    assert_eq!(fetch.records.len(), 2400);
    assert_eq!(fetch.pages_fetched, 3);
    assert_eq!(fetch.outcome, FetchOutcome::Complete);
    assert_eq!(fetch.records[2399]["id"], 2400);
}

#[tokio::test]
async fn test_exact_multiple_needs_an_empty_page() {
    let (base_url, fake) = FakeUpstream::new()
        .with_collection("customer", numbered_rows(2000))
        .start()
        .await;

    let fetch = paginator(&base_url, 1000, 50, PageParam::Offset)
        .fetch_all::<Value>("customer")
        .await
        .unwrap();

    assert_eq!(fake.hits("customer"), 3);
    assert_eq!(fetch.records.len(), 2000);
    assert!(fetch.is_complete());
}

#[tokio::test]
async fn test_page_style_parameters() {
    let (base_url, fake) = FakeUpstream::new()
        .with_collection("salesman", numbered_rows(25))
        .start()
        .await;

    let fetch = paginator(&base_url, 10, 50, PageParam::Page)
        .fetch_all::<Value>("salesman")
        .await
        .unwrap();

    assert_eq!(fake.hits("salesman"), 3);
    assert_eq!(fetch.records.len(), 25);
    assert_eq!(fetch.records[10]["id"], 11, "second page starts at row 11");
}

#[tokio::test]
async fn test_upstream_error_keeps_partial_records() {
    let (base_url, fake) = FakeUpstream::new()
        .with_collection("customer", numbered_rows(2400))
        .failing_from("customer", 1, 503)
        .start()
        .await;

    let fetch = paginator(&base_url, 1000, 50, PageParam::Offset)
        .fetch_all::<Value>("customer")
        .await
        .unwrap();

    assert_eq!(fake.hits("customer"), 2);
    assert_eq!(fetch.records.len(), 1000);
    assert_eq!(fetch.outcome, FetchOutcome::Truncated { page: 1, status: 503 });
    assert!(!fetch.is_complete());
}

#[tokio::test]
async fn test_page_cap_stops_the_loop() {
    let (base_url, fake) = FakeUpstream::new()
        .with_collection("customer", numbered_rows(2400))
        .start()
        .await;

    let fetch = paginator(&base_url, 1000, 2, PageParam::Offset)
        .fetch_all::<Value>("customer")
        .await
        .unwrap();

    assert_eq!(fake.hits("customer"), 2);
    assert_eq!(fetch.records.len(), 2000);
    assert_eq!(fetch.outcome, FetchOutcome::PageCapReached);
}

#[tokio::test]
async fn test_requests_disable_caching() {
    let (base_url, fake) = FakeUpstream::new()
        .with_collection("customer", numbered_rows(3))
        .start()
        .await;

    paginator(&base_url, 1000, 50, PageParam::Offset)
        .fetch_all::<Value>("customer")
        .await
        .unwrap();

    assert_eq!(fake.cache_headers(), vec!["no-cache".to_string()]);
}

#[tokio::test]
async fn test_unreachable_upstream_is_an_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = paginator(&format!("http://{}", addr), 1000, 50, PageParam::Offset)
        .fetch_all::<Value>("customer")
        .await;

    assert!(matches!(result, Err(vos_gateway::AppError::Upstream(_))));
}
