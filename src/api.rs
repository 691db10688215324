use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::anyhow;
use axum::{
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::aggregate::{Aggregator, FeedStatus, TrendingFeed};
use crate::config::SourcesConfig;
use crate::ingest::providers::github::{GithubClient, LanguageStats, RepoFilter};
use crate::ingest::providers::hackernews::{HackerNewsClient, StoryFilter};
use crate::ingest::providers::reddit::{
    PostFilter, RedditClient, RedditSort, SubredditStats, DEFAULT_SUBREDDIT,
};
use crate::ingest::types::{now_rfc3339, NormalizedItem, Platform, TrendingSource};
use crate::status::{StatusReport, StatusReporter};
use crate::ws::{self, DashboardHub};

/// Clients are built once at startup and shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub github: Arc<GithubClient>,
    pub reddit: Arc<RedditClient>,
    pub hackernews: Arc<HackerNewsClient>,
    pub aggregator: Aggregator,
    pub status: StatusReporter,
    pub hub: DashboardHub,
}

impl AppState {
    pub fn from_config(cfg: &SourcesConfig) -> anyhow::Result<Self> {
        let http = cfg.http.build_client()?;
        let timeout = cfg.http.timeout();

        let github = Arc::new(GithubClient::new(http.clone(), &cfg.github, timeout));
        let reddit = Arc::new(RedditClient::new(http.clone(), &cfg.reddit, timeout));
        let hackernews = Arc::new(HackerNewsClient::new(http, &cfg.hackernews, timeout));

        // Priority order of the merged feed.
        let sources: Vec<Arc<dyn TrendingSource>> =
            vec![github.clone(), reddit.clone(), hackernews.clone()];

        Ok(Self {
            github,
            reddit,
            hackernews,
            aggregator: Aggregator::new(sources.clone()),
            status: StatusReporter::new(sources),
            hub: DashboardHub::default(),
        })
    }
}

impl FromRef<AppState> for DashboardHub {
    fn from_ref(state: &AppState) -> Self {
        state.hub.clone()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(|| async { "ok" }))
        .route("/api/status/", get(api_status))
        .route("/api/trending/", get(trending_topics))
        .route("/api/github/repos/", get(github_repositories))
        .route("/api/github/languages/", get(github_languages))
        .route("/api/reddit/posts/", get(reddit_posts))
        .route("/api/reddit/subreddits/", get(reddit_subreddits))
        .route("/api/hackernews/stories/", get(hackernews_stories))
        .route("/ws/dashboard/", get(ws::ws_handler))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn home() -> Json<Value> {
    Json(json!({
        "project": "CS Student Hub - Real-Time Tech Ecosystem Dashboard",
        "status": "running",
        "description": "Trending content aggregated from GitHub, Reddit and Hacker News",
        "api_endpoints": {
            "status": "/api/status/",
            "trending": "/api/trending/",
            "github_repos": "/api/github/repos/",
            "github_languages": "/api/github/languages/",
            "reddit_posts": "/api/reddit/posts/",
            "reddit_subreddits": "/api/reddit/subreddits/",
            "hackernews_stories": "/api/hackernews/stories/",
        },
        "websocket": "/ws/dashboard/",
    }))
}

async fn api_status(State(state): State<AppState>) -> Json<StatusReport> {
    Json(state.status.report().await)
}

async fn trending_topics(State(state): State<AppState>) -> Json<TrendingFeed> {
    let feed = state.aggregator.get_trending_topics().await;
    if feed.status == FeedStatus::Success {
        let per_platform: BTreeMap<&str, usize> = Platform::ALL
            .iter()
            .map(|p| (p.key(), feed.topics_for(*p).count()))
            .collect();
        state.hub.publish(
            "trending_update",
            json!({
                "total_topics": feed.total_topics,
                "per_platform": per_platform,
                "last_updated": feed.last_updated,
            }),
        );
    }
    Json(feed)
}

/// Lenient query parsing: missing or unparsable values use the default.
fn param_or<T: FromStr>(q: &HashMap<String, String>, key: &str, default: T) -> T {
    q.get(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Run a detail handler in its own task; errors and panics become 500 `{error, message}`.
async fn guarded<F>(what: &'static str, work: F) -> Response
where
    F: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    let outcome = match tokio::spawn(work).await {
        Ok(res) => res,
        Err(e) => Err(anyhow!("handler task aborted: {e}")),
    };
    match outcome {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            error!(endpoint = what, error = %e, "detail endpoint failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": format!("Failed to fetch {what}"),
                    "message": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

#[derive(Serialize)]
struct RepositoriesOut {
    repositories: Vec<NormalizedItem>,
    count: usize,
    filters: RepoFilter,
    last_updated: String,
}

async fn github_repositories(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let filter = RepoFilter::new(
        q.get("language").cloned().unwrap_or_default(),
        param_or(&q, "days", 7),
        param_or(&q, "limit", 30),
    );
    guarded("GitHub repositories", async move {
        let repositories = state.github.fetch_records(&filter).await;
        anyhow::Ok(serde_json::to_value(RepositoriesOut {
            count: repositories.len(),
            repositories,
            filters: filter,
            last_updated: now_rfc3339(),
        })?)
    })
    .await
}

#[derive(Serialize)]
struct LanguagesOut {
    languages: BTreeMap<String, LanguageStats>,
    last_updated: String,
}

async fn github_languages(State(state): State<AppState>) -> Response {
    guarded("GitHub language stats", async move {
        let languages = state.github.language_stats().await;
        anyhow::Ok(serde_json::to_value(LanguagesOut {
            languages,
            last_updated: now_rfc3339(),
        })?)
    })
    .await
}

#[derive(Serialize)]
struct PostsOut {
    posts: Vec<NormalizedItem>,
    count: usize,
    filters: PostFilter,
    last_updated: String,
}

async fn reddit_posts(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let filter = PostFilter::new(
        q.get("subreddit").map(String::as_str).unwrap_or(DEFAULT_SUBREDDIT),
        RedditSort::parse(q.get("sort").map(String::as_str).unwrap_or("hot")),
        param_or(&q, "limit", 25),
    );
    guarded("Reddit posts", async move {
        let posts = state.reddit.fetch_records(&filter).await;
        anyhow::Ok(serde_json::to_value(PostsOut {
            count: posts.len(),
            posts,
            filters: filter,
            last_updated: now_rfc3339(),
        })?)
    })
    .await
}

#[derive(Serialize)]
struct SubredditsOut {
    subreddits: BTreeMap<String, SubredditStats>,
    last_updated: String,
}

async fn reddit_subreddits(State(state): State<AppState>) -> Response {
    guarded("Reddit subreddit stats", async move {
        let subreddits = state.reddit.subreddit_stats().await;
        anyhow::Ok(serde_json::to_value(SubredditsOut {
            subreddits,
            last_updated: now_rfc3339(),
        })?)
    })
    .await
}

#[derive(Serialize)]
struct StoriesOut {
    stories: Vec<NormalizedItem>,
    count: usize,
    last_updated: String,
}

async fn hackernews_stories(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let filter = StoryFilter::new(param_or(&q, "limit", 30));
    guarded("Hacker News stories", async move {
        let stories = state.hackernews.fetch_records(&filter).await;
        anyhow::Ok(serde_json::to_value(StoriesOut {
            count: stories.len(),
            stories,
            last_updated: now_rfc3339(),
        })?)
    })
    .await
}
