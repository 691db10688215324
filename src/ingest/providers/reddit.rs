// src/ingest/providers/reddit.rs
//! Subreddit listing client (public JSON endpoints, no credential).

use async_trait::async_trait;
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::sources::RedditConfig;
use crate::ingest::types::{FetchError, NormalizedItem, Platform, PlatformStatus, TrendingSource};
use crate::ingest::{absorb, excerpt, get_json, unix_to_rfc3339};

pub const DEFAULT_SUBREDDIT: &str = "programming";
const STATS_LIMIT: u32 = 10;

static RE_SUBREDDIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_+]{1,100}$").expect("subreddit regex"));

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: RawPost,
}

#[derive(Debug, Deserialize)]
pub struct RawPost {
    id: String,
    #[serde(default)]
    title: String,
    author: Option<String>,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: u64,
    #[serde(default)]
    permalink: String,
    url: Option<String>,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    subreddit: String,
    #[serde(default)]
    stickied: bool,
    #[serde(default)]
    promoted: Option<bool>,
    removed_by_category: Option<String>,
    #[serde(default)]
    is_self: bool,
    link_flair_text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RedditSort {
    Hot,
    New,
    Top,
    Rising,
}

impl RedditSort {
    /// Unknown values fall back to `hot`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => RedditSort::New,
            "top" => RedditSort::Top,
            "rising" => RedditSort::Rising,
            _ => RedditSort::Hot,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            RedditSort::Hot => "hot",
            RedditSort::New => "new",
            RedditSort::Top => "top",
            RedditSort::Rising => "rising",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostFilter {
    pub subreddit: String,
    pub sort: RedditSort,
    pub limit: u32,
}

impl PostFilter {
    pub fn new(subreddit: &str, sort: RedditSort, limit: u32) -> Self {
        let subreddit = subreddit.trim();
        let subreddit = if RE_SUBREDDIT.is_match(subreddit) {
            subreddit.to_string()
        } else {
            DEFAULT_SUBREDDIT.to_string()
        };
        Self {
            subreddit,
            sort,
            limit: limit.clamp(1, 100),
        }
    }
}

/// Pinned, sponsored, removed or low-score posts are not trending material.
fn is_listable(raw: &RawPost, min_score: i64) -> bool {
    !raw.stickied
        && raw.promoted != Some(true)
        && raw.removed_by_category.is_none()
        && raw.score >= min_score
}

/// Map one listing child into the shared shape.
pub fn normalize(raw: RawPost) -> NormalizedItem {
    let external_url = if raw.is_self {
        String::new()
    } else {
        raw.url.unwrap_or_default()
    };

    NormalizedItem {
        id: raw.id,
        title: raw.title,
        author: raw
            .author
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| "Unknown".to_string()),
        primary_metric: raw.score.max(0) as u64,
        secondary_metric: raw.num_comments,
        url: format!("https://www.reddit.com{}", raw.permalink),
        external_url,
        description: excerpt(&raw.selftext),
        created_time: unix_to_rfc3339(raw.created_utc as i64),
        category: raw.subreddit,
        tags: raw.link_flair_text.into_iter().filter(|f| !f.is_empty()).collect(),
        source_platform: Platform::Reddit,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubredditStats {
    pub posts_count: usize,
    pub total_score: u64,
    pub avg_score: u64,
    pub total_comments: u64,
    pub top_post: Option<NormalizedItem>,
}

impl SubredditStats {
    pub fn from_posts(posts: &[NormalizedItem]) -> Option<Self> {
        if posts.is_empty() {
            return None;
        }
        let total_score: u64 = posts.iter().map(|p| p.primary_metric).sum();
        Some(Self {
            posts_count: posts.len(),
            total_score,
            avg_score: total_score / posts.len() as u64,
            total_comments: posts.iter().map(|p| p.secondary_metric).sum(),
            top_post: posts.iter().max_by_key(|p| p.primary_metric).cloned(),
        })
    }
}

/// Merged-feed filter over all configured subreddits; `true` when the
/// joined name was rejected and replaced by the fallback.
fn trending_filter(cfg: &RedditConfig) -> (PostFilter, bool) {
    let joined = cfg.subreddits.join("+");
    let filter = PostFilter::new(&joined, RedditSort::parse(&cfg.sort), cfg.trending_limit);
    let replaced = filter.subreddit != joined.trim();
    (filter, replaced)
}

pub struct RedditClient {
    http: reqwest::Client,
    api_base: String,
    timeout: Duration,
    min_score: i64,
    subreddits: Vec<String>,
    defaults: PostFilter,
}

impl RedditClient {
    pub fn new(http: reqwest::Client, cfg: &RedditConfig, timeout: Duration) -> Self {
        let (defaults, replaced) = trending_filter(cfg);
        if replaced {
            tracing::warn!(
                platform = "reddit",
                configured = %cfg.subreddits.join("+"),
                fallback = %defaults.subreddit,
                "configured subreddits rejected; trending feed uses the fallback subreddit"
            );
        }
        Self {
            http,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            timeout,
            min_score: cfg.min_score,
            subreddits: cfg.subreddits.clone(),
            defaults,
        }
    }

    pub fn default_filter(&self) -> &PostFilter {
        &self.defaults
    }

    async fn listing(&self, filter: &PostFilter) -> Result<Vec<RawPost>, FetchError> {
        let url = format!(
            "{}/r/{}/{}.json",
            self.api_base,
            filter.subreddit,
            filter.sort.as_str()
        );
        let mut query = vec![
            ("limit", filter.limit.to_string()),
            ("raw_json", "1".to_string()),
        ];
        if filter.sort == RedditSort::Top {
            query.push(("t", "day".to_string()));
        }
        let req = self.http.get(url).query(&query).timeout(self.timeout);
        let body: Listing = get_json(Platform::Reddit, req).await?;
        Ok(body.data.children.into_iter().map(|c| c.data).collect())
    }

    /// Posts in listing order after quality filtering. Empty on failure.
    pub async fn fetch_records(&self, filter: &PostFilter) -> Vec<NormalizedItem> {
        let min_score = self.min_score;
        let res = self.listing(filter).await.map(|posts| {
            posts
                .into_iter()
                .filter(|p| is_listable(p, min_score))
                .map(normalize)
                .collect()
        });
        absorb(Platform::Reddit, "subreddit_listing", res)
    }

    /// Hot-post summary per configured subreddit. Subreddits without results are omitted.
    pub async fn subreddit_stats(&self) -> BTreeMap<String, SubredditStats> {
        let filters: Vec<PostFilter> = self
            .subreddits
            .iter()
            .map(|s| PostFilter::new(s, RedditSort::Hot, STATS_LIMIT))
            .collect();
        let results = join_all(filters.iter().map(|f| self.fetch_records(f))).await;

        filters
            .into_iter()
            .zip(results)
            .filter_map(|(f, posts)| SubredditStats::from_posts(&posts).map(|s| (f.subreddit, s)))
            .collect()
    }
}

#[async_trait]
impl TrendingSource for RedditClient {
    fn platform(&self) -> Platform {
        Platform::Reddit
    }

    async fn fetch_trending(&self) -> Vec<NormalizedItem> {
        self.fetch_records(&self.defaults).await
    }

    async fn fetch_status(&self) -> PlatformStatus {
        let probe = PostFilter::new(DEFAULT_SUBREDDIT, RedditSort::Hot, 1);
        match self.listing(&probe).await {
            Ok(posts) => PlatformStatus::connected(posts.len(), "Connected to Reddit API"),
            Err(e) => {
                tracing::warn!(platform = "reddit", error = %e, "status probe failed");
                PlatformStatus::error(format!("Failed to connect to Reddit API: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: serde_json::Value) -> RawPost {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn quality_filter_rejects_pinned_sponsored_removed_and_low_score() {
        let ok = raw(serde_json::json!({"id": "a", "score": 5}));
        assert!(is_listable(&ok, 5));

        let low = raw(serde_json::json!({"id": "b", "score": 4}));
        assert!(!is_listable(&low, 5));

        let pinned = raw(serde_json::json!({"id": "c", "score": 50, "stickied": true}));
        assert!(!is_listable(&pinned, 5));

        let ad = raw(serde_json::json!({"id": "d", "score": 50, "promoted": true}));
        assert!(!is_listable(&ad, 5));

        let removed = raw(serde_json::json!({
            "id": "e", "score": 50, "removed_by_category": "moderator"
        }));
        assert!(!is_listable(&removed, 5));
    }

    #[test]
    fn self_post_has_no_external_url() {
        let item = normalize(raw(serde_json::json!({
            "id": "x1",
            "title": "Ask: favourite editor?",
            "author": null,
            "score": 12,
            "num_comments": 30,
            "permalink": "/r/programming/comments/x1/ask/",
            "url": "https://www.reddit.com/r/programming/comments/x1/ask/",
            "selftext": "&gt; quoted\n\nbody",
            "created_utc": 1700000000.0,
            "subreddit": "programming",
            "is_self": true
        })));
        assert_eq!(item.author, "Unknown");
        assert_eq!(item.external_url, "");
        assert_eq!(item.url, "https://www.reddit.com/r/programming/comments/x1/ask/");
        assert_eq!(item.description, "> quoted body");
        assert_eq!(item.created_time, "2023-11-14T22:13:20Z");
        assert_eq!(item.category, "programming");
    }

    #[test]
    fn trending_filter_flags_rejected_subreddit_lists() {
        let cfg = RedditConfig::default();
        let (f, replaced) = trending_filter(&cfg);
        assert!(!replaced);
        assert!(f.subreddit.starts_with("programming+technology"));

        let too_long = RedditConfig {
            subreddits: (0..20).map(|i| format!("subreddit{i}")).collect(),
            ..RedditConfig::default()
        };
        let (f, replaced) = trending_filter(&too_long);
        assert!(replaced);
        assert_eq!(f.subreddit, DEFAULT_SUBREDDIT);

        let invalid = RedditConfig {
            subreddits: vec!["rust".into(), "c sharp".into()],
            ..RedditConfig::default()
        };
        assert!(trending_filter(&invalid).1);
    }

    #[test]
    fn filter_sanitizes_subreddit_and_sort() {
        let f = PostFilter::new("../../etc", RedditSort::parse("bogus"), 0);
        assert_eq!(f.subreddit, DEFAULT_SUBREDDIT);
        assert_eq!(f.sort, RedditSort::Hot);
        assert_eq!(f.limit, 1);

        let multi = PostFilter::new("rust+golang", RedditSort::parse("TOP"), 500);
        assert_eq!(multi.subreddit, "rust+golang");
        assert_eq!(multi.sort, RedditSort::Top);
        assert_eq!(multi.limit, 100);
    }
}
