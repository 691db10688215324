// tests/providers_reddit.rs
use serde_json::{json, Value};
use std::time::Duration;
use tech_trends_hub::config::SourcesConfig;
use tech_trends_hub::ingest::providers::reddit::{PostFilter, RedditClient, RedditSort};
use tech_trends_hub::ingest::types::{ConnectionState, TrendingSource};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(base: &str, subreddits: &[&str]) -> RedditClient {
    client_with_timeout(base, subreddits, 10)
}

fn client_with_timeout(base: &str, subreddits: &[&str], timeout_secs: u64) -> RedditClient {
    let mut cfg = SourcesConfig::default();
    cfg.reddit.api_base = base.to_string();
    cfg.reddit.subreddits = subreddits.iter().map(|s| s.to_string()).collect();
    cfg.http.timeout_secs = timeout_secs;
    let http = cfg.http.build_client().expect("http client");
    RedditClient::new(http, &cfg.reddit, cfg.http.timeout())
}

fn listing(posts: Vec<Value>) -> Value {
    let children: Vec<Value> = posts
        .into_iter()
        .map(|p| json!({"kind": "t3", "data": p}))
        .collect();
    json!({"kind": "Listing", "data": {"after": null, "children": children}})
}

fn post(id: &str, score: i64) -> Value {
    json!({
        "id": id,
        "title": format!("Post {id}"),
        "author": "poster",
        "score": score,
        "num_comments": 7,
        "permalink": format!("/r/programming/comments/{id}/post/"),
        "url": format!("https://blog.example/{id}"),
        "selftext": "",
        "created_utc": 1755700000.0,
        "subreddit": "programming",
        "stickied": false,
        "is_self": false
    })
}

#[tokio::test]
async fn listing_is_filtered_and_keeps_native_order() {
    let server = MockServer::start().await;

    let mut pinned = post("pin", 900);
    pinned["stickied"] = json!(true);
    let mut ad = post("ad", 900);
    ad["promoted"] = json!(true);
    let mut removed = post("rm", 900);
    removed["removed_by_category"] = json!("moderator");

    Mock::given(method("GET"))
        .and(path("/r/programming/hot.json"))
        .and(query_param("limit", "10"))
        .and(query_param("raw_json", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![
            pinned,
            post("a", 40),
            ad,
            post("low", 4),
            removed,
            post("b", 300),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let rd = client(&server.uri(), &["programming"]);
    let items = rd
        .fetch_records(&PostFilter::new("programming", RedditSort::Hot, 10))
        .await;

    let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(items[0].url, "https://www.reddit.com/r/programming/comments/a/post/");
    assert_eq!(items[0].external_url, "https://blog.example/a");
    assert_eq!(items[0].secondary_metric, 7);
    assert_eq!(items[0].description, "");
}

#[tokio::test]
async fn top_sort_asks_for_the_day_window() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/r/rust/top.json"))
        .and(query_param("t", "day"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![post("t1", 99)])))
        .expect(1)
        .mount(&server)
        .await;

    let rd = client(&server.uri(), &["rust"]);
    let items = rd.fetch_records(&PostFilter::new("rust", RedditSort::Top, 5)).await;
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn throttling_errors_and_garbage_yield_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/r/slow/hot.json"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/r/down/hot.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/r/private/hot.json"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"reason": "private"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/r/html/hot.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>blocked</html>"))
        .mount(&server)
        .await;

    let rd = client(&server.uri(), &["programming"]);
    for sub in ["slow", "down", "private", "html"] {
        let items = rd.fetch_records(&PostFilter::new(sub, RedditSort::Hot, 5)).await;
        assert!(items.is_empty(), "r/{sub} should yield nothing");
    }
}

#[tokio::test]
async fn timeout_yields_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/r/programming/hot.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing(vec![post("late", 500)]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let rd = client_with_timeout(&server.uri(), &["programming"], 1);
    assert_eq!(rd.default_filter().subreddit, "programming");
    assert!(rd.fetch_trending().await.is_empty());
}

#[tokio::test]
async fn subreddit_stats_summarize_each_configured_subreddit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/r/rust/hot.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![
            post("r1", 10),
            post("r2", 30),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/r/golang/hot.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let rd = client(&server.uri(), &["rust", "golang"]);
    let stats = rd.subreddit_stats().await;

    assert_eq!(stats.len(), 1, "failed subreddit is omitted");
    let rust = &stats["rust"];
    assert_eq!(rust.posts_count, 2);
    assert_eq!(rust.total_score, 40);
    assert_eq!(rust.avg_score, 20);
    assert_eq!(rust.total_comments, 14);
    assert_eq!(rust.top_post.as_ref().unwrap().id, "r2");
}

#[tokio::test]
async fn status_probe_uses_one_item_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/r/programming/hot.json"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![post("p", 1)])))
        .mount(&server)
        .await;

    let rd = client(&server.uri(), &["programming"]);
    let status = rd.fetch_status().await;
    assert_eq!(status.status, ConnectionState::Connected);
    assert_eq!(status.count, 1);

    let dead = client("http://127.0.0.1:9", &["programming"]);
    assert_eq!(dead.fetch_status().await.status, ConnectionState::Error);
}
