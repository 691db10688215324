// src/ingest/types.rs
use serde::{Deserialize, Serialize};

/// Upstream platforms, in feed priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Platform {
    GitHub,
    Reddit,
    HackerNews,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::GitHub, Platform::Reddit, Platform::HackerNews];

    /// Lowercase key used in the `platforms` maps and metric labels.
    pub fn key(self) -> &'static str {
        match self {
            Platform::GitHub => "github",
            Platform::Reddit => "reddit",
            Platform::HackerNews => "hackernews",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Platform::GitHub => "GitHub",
            Platform::Reddit => "Reddit",
            Platform::HackerNews => "Hacker News",
        }
    }
}

/// One upstream record after normalization at the client boundary.
///
/// Absent upstream fields are replaced by sentinels ("Unknown", 0, "") so the
/// serialized form never carries nulls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedItem {
    pub id: String,
    pub title: String,
    pub author: String,
    /// Stars (GitHub) or score (Reddit, Hacker News).
    pub primary_metric: u64,
    /// Forks (GitHub) or comments (Reddit, Hacker News).
    pub secondary_metric: u64,
    pub url: String,
    pub external_url: String,
    pub description: String,
    pub created_time: String,
    /// Language, subreddit or item type depending on the platform.
    pub category: String,
    pub tags: Vec<String>,
    pub source_platform: Platform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Error,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    pub reset_time: u64,
}

/// Per-request outcome of one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformStatus {
    pub status: ConnectionState,
    pub last_fetch: String,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimit>,
}

impl PlatformStatus {
    pub fn connected(count: usize, message: impl Into<String>) -> Self {
        Self {
            status: ConnectionState::Connected,
            last_fetch: now_rfc3339(),
            count,
            error: None,
            message: Some(message.into()),
            rate_limit: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            status: ConnectionState::Error,
            last_fetch: now_rfc3339(),
            count: 0,
            error: Some(error.into()),
            message: None,
            rate_limit: None,
        }
    }

    pub fn pending() -> Self {
        Self {
            status: ConnectionState::Pending,
            last_fetch: now_rfc3339(),
            count: 0,
            error: None,
            message: None,
            rate_limit: None,
        }
    }

    pub fn with_rate_limit(mut self, rl: RateLimit) -> Self {
        self.rate_limit = Some(rl);
        self
    }
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Why an upstream call produced nothing. Never leaves a client; see `ingest::absorb`.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("credential not configured")]
    MissingCredential,
    #[error("rate limit exceeded (reset: {})", reset.as_deref().unwrap_or("unknown"))]
    RateLimited { reset: Option<String> },
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::MissingCredential => "credential",
            FetchError::RateLimited { .. } => "rate_limited",
            FetchError::Status { .. } => "status",
            FetchError::Transport(e) if e.is_timeout() => "timeout",
            FetchError::Transport(_) => "transport",
            FetchError::Decode(_) => "decode",
        }
    }
}

/// What the aggregator and status reporter need from each upstream client.
#[async_trait::async_trait]
pub trait TrendingSource: Send + Sync {
    fn platform(&self) -> Platform;

    /// Trending records with the configured default filter. Empty on any failure.
    async fn fetch_trending(&self) -> Vec<NormalizedItem>;

    /// Lightweight connectivity probe. Never fails; errors become `ConnectionState::Error`.
    async fn fetch_status(&self) -> PlatformStatus;
}
