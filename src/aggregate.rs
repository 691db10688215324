// src/aggregate.rs
//! Merged trending feed: fan out to every source, budget the slices, project
//! each item into a `TrendingTopic`.
//!
//! Sources are isolated from each other: a source that returns nothing only
//! shows up as `error` in its platform status. The feed is concatenated in
//! source priority order (GitHub, Reddit, Hacker News), not re-sorted by score.

use futures::future::join_all;
use metrics::gauge;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::ingest::truncate_with_ellipsis;
use crate::ingest::types::{now_rfc3339, NormalizedItem, Platform, PlatformStatus, TrendingSource};

pub const KEYWORD_MAX_CHARS: usize = 50;
/// Slots for the only healthy source.
pub const SINGLE_SOURCE_CEILING: usize = 20;

/// Per-source slot budget, indexed by rank among the sources that returned data.
pub fn slot_budgets(healthy_sources: usize) -> &'static [usize] {
    match healthy_sources {
        3 => &[6, 5, 4],
        2 => &[8, 7],
        1 => &[SINGLE_SOURCE_CEILING],
        _ => &[],
    }
}

/// Linear 0..=100 rescale of the primary metric, one decimal.
pub fn trend_score(platform: Platform, primary_metric: u64) -> f64 {
    let divisor = match platform {
        Platform::GitHub => 10.0,
        Platform::Reddit => 20.0,
        Platform::HackerNews => 5.0,
    };
    let scaled = (primary_metric as f64 / divisor).clamp(0.0, 100.0);
    (scaled * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicKind {
    Repository,
    Discussion,
    News,
}

impl From<Platform> for TopicKind {
    fn from(p: Platform) -> Self {
        match p {
            Platform::GitHub => TopicKind::Repository,
            Platform::Reddit => TopicKind::Discussion,
            Platform::HackerNews => TopicKind::News,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingTopic {
    pub id: String,
    pub keyword: String,
    pub platform: Platform,
    pub trend_score: f64,
    pub posts_count: u64,
    pub description: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: TopicKind,
    /// Raw primary metric (stars or points).
    pub score: u64,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subreddit: Option<String>,
}

impl From<NormalizedItem> for TrendingTopic {
    fn from(item: NormalizedItem) -> Self {
        let platform = item.source_platform;
        let prefix = match platform {
            Platform::GitHub => "github",
            Platform::Reddit => "reddit",
            Platform::HackerNews => "hn",
        };
        let (language, subreddit) = match platform {
            Platform::GitHub => (Some(item.category), None),
            Platform::Reddit => (None, Some(item.category)),
            Platform::HackerNews => (None, None),
        };

        Self {
            id: format!("{prefix}_{}", item.id),
            keyword: truncate_with_ellipsis(&item.title, KEYWORD_MAX_CHARS),
            platform,
            trend_score: trend_score(platform, item.primary_metric),
            posts_count: item.secondary_metric,
            description: item.description,
            url: item.url,
            kind: platform.into(),
            score: item.primary_metric,
            author: item.author,
            language,
            subreddit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedStatus {
    Success,
    Error,
}

/// Response envelope of the merged feed. Always well formed, even on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingFeed {
    pub status: FeedStatus,
    pub last_updated: String,
    pub trending_topics: Vec<TrendingTopic>,
    pub platforms: BTreeMap<String, PlatformStatus>,
    pub total_topics: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TrendingFeed {
    /// Uniform all-sources-error envelope.
    pub fn failed(reason: &str) -> Self {
        let platforms = Platform::ALL
            .iter()
            .map(|p| (p.key().to_string(), PlatformStatus::error(reason.to_string())))
            .collect();
        Self {
            status: FeedStatus::Error,
            last_updated: now_rfc3339(),
            trending_topics: Vec::new(),
            platforms,
            total_topics: 0,
            error: Some("Failed to fetch trending topics".to_string()),
            message: Some(reason.to_string()),
        }
    }

    /// Topics of one platform, in feed order.
    pub fn topics_for(&self, platform: Platform) -> impl Iterator<Item = &TrendingTopic> {
        self.trending_topics
            .iter()
            .filter(move |t| t.platform == platform)
    }
}

/// Owns the injected upstream clients; cheap to clone.
#[derive(Clone)]
pub struct Aggregator {
    sources: Vec<Arc<dyn TrendingSource>>,
}

impl Aggregator {
    pub fn new(sources: Vec<Arc<dyn TrendingSource>>) -> Self {
        Self { sources }
    }

    /// Never fails: a panic while merging becomes the all-error envelope.
    pub async fn get_trending_topics(&self) -> TrendingFeed {
        let sources = self.sources.clone();
        match tokio::spawn(collect(sources)).await {
            Ok(feed) => feed,
            Err(e) => {
                error!(error = %e, "trending aggregation aborted");
                TrendingFeed::failed(&format!("aggregation aborted: {e}"))
            }
        }
    }
}

async fn collect(sources: Vec<Arc<dyn TrendingSource>>) -> TrendingFeed {
    let mut fetched = join_all(sources.iter().map(|s| async move {
        (s.platform(), s.fetch_trending().await)
    }))
    .await;
    fetched.sort_by_key(|(p, _)| *p);

    let healthy = fetched.iter().filter(|(_, items)| !items.is_empty()).count();
    let budgets = slot_budgets(healthy);

    let mut platforms = BTreeMap::new();
    let mut topics = Vec::new();
    let mut rank = 0;
    for (platform, items) in fetched {
        if items.is_empty() {
            platforms.insert(
                platform.key().to_string(),
                PlatformStatus::error(format!("No data returned from {}", platform.display_name())),
            );
            continue;
        }

        let budget = budgets.get(rank).copied().unwrap_or(0);
        rank += 1;
        let available = items.len();
        let included: Vec<TrendingTopic> =
            items.into_iter().take(budget).map(TrendingTopic::from).collect();

        platforms.insert(
            platform.key().to_string(),
            PlatformStatus::connected(
                available,
                format!("{} of {available} items included", included.len()),
            ),
        );
        topics.extend(included);
    }

    gauge!("trending_topics_last_count").set(topics.len() as f64);
    info!(topics = topics.len(), healthy, "trending feed assembled");

    TrendingFeed {
        status: FeedStatus::Success,
        last_updated: now_rfc3339(),
        total_topics: topics.len(),
        trending_topics: topics,
        platforms,
        error: None,
        message: None,
    }
}
