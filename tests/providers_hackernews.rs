// tests/providers_hackernews.rs
use serde_json::json;
use std::time::Duration;
use tech_trends_hub::config::SourcesConfig;
use tech_trends_hub::ingest::providers::hackernews::{HackerNewsClient, StoryFilter};
use tech_trends_hub::ingest::types::{ConnectionState, TrendingSource};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(base: &str) -> HackerNewsClient {
    client_with_timeout(base, 10)
}

fn client_with_timeout(base: &str, timeout_secs: u64) -> HackerNewsClient {
    let mut cfg = SourcesConfig::default();
    cfg.hackernews.api_base = base.to_string();
    cfg.http.timeout_secs = timeout_secs;
    let http = cfg.http.build_client().expect("http client");
    HackerNewsClient::new(http, &cfg.hackernews, cfg.http.timeout())
}

async fn mount_item(server: &MockServer, id: u64, body: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/item/{id}.json")))
        .respond_with(body)
        .mount(server)
        .await;
}

#[tokio::test]
async fn bad_items_are_skipped_and_front_page_order_kept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/topstories.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([7, 1, 2, 3, 4, 5, 99])))
        .mount(&server)
        .await;

    let ok = |id: u64, score: i64| {
        ResponseTemplate::new(200).set_body_json(json!({
            "id": id, "type": "story", "title": format!("Story {id}"),
            "by": "pg", "score": score, "descendants": 3, "time": 1755700000,
            "url": format!("https://example.com/{id}")
        }))
    };
    mount_item(&server, 7, ok(7, 80)).await;
    mount_item(&server, 1, ok(1, 50)).await;
    // deleted item
    mount_item(&server, 2, ResponseTemplate::new(200).set_body_string("null")).await;
    mount_item(&server, 3, ResponseTemplate::new(500)).await;
    mount_item(&server, 4, ok(4, 3)).await;
    mount_item(
        &server,
        5,
        ResponseTemplate::new(200).set_body_json(json!({"id": 5, "type": "job", "score": 40})),
    )
    .await;

    // id 99 is beyond the limit and must never be requested.
    Mock::given(method("GET"))
        .and(path("/item/99.json"))
        .respond_with(ok(99, 500))
        .expect(0)
        .mount(&server)
        .await;

    let hn = client(&server.uri());
    let items = hn.fetch_records(&StoryFilter::new(6)).await;

    let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["7", "1"]);
    assert_eq!(items[0].primary_metric, 80);
    assert_eq!(items[0].created_time, "2025-08-20T14:26:40Z");
}

#[tokio::test]
async fn id_list_failure_yields_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/topstories.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let hn = client(&server.uri());
    assert!(hn.fetch_trending().await.is_empty());
    assert_eq!(hn.fetch_status().await.status, ConnectionState::Error);
}

#[tokio::test]
async fn malformed_id_list_yields_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/topstories.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[1, 2,"))
        .mount(&server)
        .await;

    assert!(client(&server.uri()).fetch_trending().await.is_empty());
}

#[tokio::test]
async fn timeout_yields_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/topstories.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([1]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/item/1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1, "title": "Slow", "score": 99
        })))
        .mount(&server)
        .await;

    let hn = client_with_timeout(&server.uri(), 1);
    assert!(hn.fetch_records(&StoryFilter::new(5)).await.is_empty());
}

#[tokio::test]
async fn status_counts_available_ids() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/topstories.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2, 3])))
        .mount(&server)
        .await;

    let status = client(&server.uri()).fetch_status().await;
    assert_eq!(status.status, ConnectionState::Connected);
    assert_eq!(status.count, 3);
    assert_eq!(
        status.message.as_deref(),
        Some("Connected to Hacker News API. 3 top stories available")
    );
}
