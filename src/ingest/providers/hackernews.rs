// src/ingest/providers/hackernews.rs
//! Top-stories client for the Hacker News Firebase API.

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::sources::HackerNewsConfig;
use crate::ingest::types::{FetchError, NormalizedItem, Platform, PlatformStatus, TrendingSource};
use crate::ingest::{absorb, excerpt, get_json, unix_to_rfc3339};

const ITEM_PAGE: &str = "https://news.ycombinator.com/item?id=";

#[derive(Debug, Deserialize)]
pub struct RawStory {
    id: u64,
    title: Option<String>,
    by: Option<String>,
    score: Option<i64>,
    descendants: Option<u64>,
    url: Option<String>,
    text: Option<String>,
    #[serde(default)]
    time: i64,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryFilter {
    pub limit: u32,
}

impl StoryFilter {
    pub fn new(limit: u32) -> Self {
        Self {
            limit: limit.clamp(1, 50),
        }
    }
}

fn is_listable(raw: &RawStory, min_score: i64) -> bool {
    let has_title = raw.title.as_deref().is_some_and(|t| !t.trim().is_empty());
    has_title && raw.score.unwrap_or(0) >= min_score
}

/// Map one story into the shared shape.
pub fn normalize(raw: RawStory) -> NormalizedItem {
    let page = format!("{ITEM_PAGE}{}", raw.id);
    let external_url = raw.url.filter(|u| !u.is_empty()).unwrap_or_default();
    let url = if external_url.is_empty() {
        page
    } else {
        external_url.clone()
    };

    NormalizedItem {
        id: raw.id.to_string(),
        title: raw.title.unwrap_or_default().trim().to_string(),
        author: raw
            .by
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| "Unknown".to_string()),
        primary_metric: raw.score.unwrap_or(0).max(0) as u64,
        secondary_metric: raw.descendants.unwrap_or(0),
        url,
        external_url,
        description: raw.text.as_deref().map(excerpt).unwrap_or_default(),
        created_time: unix_to_rfc3339(raw.time),
        category: raw.kind.unwrap_or_else(|| "story".to_string()),
        tags: Vec::new(),
        source_platform: Platform::HackerNews,
    }
}

pub struct HackerNewsClient {
    http: reqwest::Client,
    api_base: String,
    timeout: Duration,
    min_score: i64,
    defaults: StoryFilter,
}

impl HackerNewsClient {
    pub fn new(http: reqwest::Client, cfg: &HackerNewsConfig, timeout: Duration) -> Self {
        Self {
            http,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            timeout,
            min_score: cfg.min_score,
            defaults: StoryFilter::new(cfg.trending_limit),
        }
    }

    async fn top_story_ids(&self) -> Result<Vec<u64>, FetchError> {
        let req = self
            .http
            .get(format!("{}/topstories.json", self.api_base))
            .timeout(self.timeout);
        get_json(Platform::HackerNews, req).await
    }

    /// A failing or deleted item is skipped rather than failing the batch.
    async fn story(&self, id: u64) -> Option<RawStory> {
        let req = self
            .http
            .get(format!("{}/item/{id}.json", self.api_base))
            .timeout(self.timeout);
        match get_json::<Option<RawStory>>(Platform::HackerNews, req).await {
            Ok(story) => story,
            Err(e) => {
                tracing::debug!(platform = "hackernews", id, error = %e, "item fetch skipped");
                None
            }
        }
    }

    async fn stories(&self, filter: &StoryFilter) -> Result<Vec<NormalizedItem>, FetchError> {
        let ids = self.top_story_ids().await?;
        let wanted = ids.into_iter().take(filter.limit as usize);
        let fetched = join_all(wanted.map(|id| self.story(id))).await;

        let min_score = self.min_score;
        Ok(fetched
            .into_iter()
            .flatten()
            .filter(|s| is_listable(s, min_score))
            .map(normalize)
            .collect())
    }

    /// Top stories in front-page order after quality filtering. Empty on failure.
    pub async fn fetch_records(&self, filter: &StoryFilter) -> Vec<NormalizedItem> {
        absorb(Platform::HackerNews, "top_stories", self.stories(filter).await)
    }
}

#[async_trait]
impl TrendingSource for HackerNewsClient {
    fn platform(&self) -> Platform {
        Platform::HackerNews
    }

    async fn fetch_trending(&self) -> Vec<NormalizedItem> {
        self.fetch_records(&self.defaults).await
    }

    async fn fetch_status(&self) -> PlatformStatus {
        match self.top_story_ids().await {
            Ok(ids) => PlatformStatus::connected(
                ids.len(),
                format!("Connected to Hacker News API. {} top stories available", ids.len()),
            ),
            Err(e) => {
                tracing::warn!(platform = "hackernews", error = %e, "status probe failed");
                PlatformStatus::error(format!("Failed to connect to Hacker News API: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: serde_json::Value) -> RawStory {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn untitled_or_low_score_stories_are_dropped() {
        assert!(is_listable(&raw(serde_json::json!({"id": 1, "title": "Hi", "score": 10})), 10));
        assert!(!is_listable(&raw(serde_json::json!({"id": 2, "title": "Hi", "score": 9})), 10));
        assert!(!is_listable(&raw(serde_json::json!({"id": 3, "title": "  ", "score": 99})), 10));
        assert!(!is_listable(&raw(serde_json::json!({"id": 4, "score": 99})), 10));
    }

    #[test]
    fn ask_story_links_to_item_page_and_cleans_text() {
        let item = normalize(raw(serde_json::json!({
            "id": 8863,
            "title": "Ask HN: Anyone else?",
            "by": "dhouston",
            "score": 111,
            "descendants": 71,
            "text": "<p>Line one&#x2F;two</p><p>Line three</p>",
            "time": 1175714200,
            "type": "story"
        })));
        assert_eq!(item.url, "https://news.ycombinator.com/item?id=8863");
        assert_eq!(item.external_url, "");
        assert_eq!(item.description, "Line one/two Line three");
        assert_eq!(item.primary_metric, 111);
        assert_eq!(item.secondary_metric, 71);
        assert_eq!(item.author, "dhouston");
        assert_eq!(item.category, "story");
    }

    #[test]
    fn link_story_keeps_external_url() {
        let item = normalize(raw(serde_json::json!({
            "id": 1, "title": "Show HN", "score": 20, "url": "https://example.com"
        })));
        assert_eq!(item.url, "https://example.com");
        assert_eq!(item.external_url, "https://example.com");
        assert_eq!(item.secondary_metric, 0);
        assert_eq!(item.author, "Unknown");
        assert_eq!(item.description, "");
    }
}
