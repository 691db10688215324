// src/ingest/providers/github.rs
//! Repository-search client: recent repositories ranked by stars.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use futures::future::join_all;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::sources::GithubConfig;
use crate::ingest::types::{
    FetchError, NormalizedItem, Platform, PlatformStatus, RateLimit, TrendingSource,
};
use crate::ingest::{absorb, excerpt, get_json};

pub const STATS_LANGUAGES: [&str; 8] = [
    "Python",
    "JavaScript",
    "TypeScript",
    "Java",
    "Go",
    "Rust",
    "C++",
    "C#",
];
const STATS_DAYS: u32 = 30;
const STATS_LIMIT: u32 = 10;
const NO_DESCRIPTION: &str = "No description available";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<RawRepository>,
}

#[derive(Debug, Deserialize)]
struct Owner {
    login: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawRepository {
    id: u64,
    name: String,
    #[serde(default)]
    full_name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    language: Option<String>,
    #[serde(default)]
    html_url: String,
    homepage: Option<String>,
    created_at: Option<String>,
    #[serde(default)]
    topics: Vec<String>,
    owner: Option<Owner>,
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    #[serde(default)]
    rate: RawRate,
}

#[derive(Debug, Default, Deserialize)]
struct RawRate {
    #[serde(default)]
    limit: u64,
    #[serde(default)]
    remaining: u64,
    #[serde(default)]
    reset: u64,
}

/// Search filter. Construct with [`RepoFilter::new`] to get clamped bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoFilter {
    pub language: String,
    pub days: u32,
    pub limit: u32,
}

impl RepoFilter {
    pub fn new(language: impl Into<String>, days: u32, limit: u32) -> Self {
        Self {
            language: language.into().trim().to_string(),
            days: days.clamp(1, 365),
            limit: limit.clamp(1, 100),
        }
    }

    fn query(&self) -> String {
        let since = (Utc::now() - ChronoDuration::days(i64::from(self.days))).format("%Y-%m-%d");
        let mut q = format!("created:>{since}");
        if !self.language.is_empty() {
            q.push_str(&format!(" language:{}", self.language));
        }
        q
    }
}

/// Map one search hit into the shared shape.
pub fn normalize(raw: RawRepository) -> NormalizedItem {
    let description = raw
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(excerpt)
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());
    let title = if raw.name.is_empty() {
        raw.full_name.unwrap_or_default()
    } else {
        raw.name
    };

    NormalizedItem {
        id: raw.id.to_string(),
        title,
        author: raw
            .owner
            .and_then(|o| o.login)
            .unwrap_or_else(|| "Unknown".to_string()),
        primary_metric: raw.stargazers_count,
        secondary_metric: raw.forks_count,
        url: raw.html_url,
        external_url: raw.homepage.unwrap_or_default(),
        description,
        created_time: raw.created_at.unwrap_or_default(),
        category: raw
            .language
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| "Unknown".to_string()),
        tags: raw.topics,
        source_platform: Platform::GitHub,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageStats {
    pub repos_count: usize,
    pub total_stars: u64,
    pub avg_stars: u64,
    pub top_repo: Option<NormalizedItem>,
}

impl LanguageStats {
    /// `None` when there is nothing to summarize.
    pub fn from_repos(repos: &[NormalizedItem]) -> Option<Self> {
        if repos.is_empty() {
            return None;
        }
        let total_stars: u64 = repos.iter().map(|r| r.primary_metric).sum();
        Some(Self {
            repos_count: repos.len(),
            total_stars,
            avg_stars: total_stars / repos.len() as u64,
            top_repo: repos.first().cloned(),
        })
    }
}

pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    token: Option<String>,
    timeout: Duration,
    defaults: RepoFilter,
}

impl GithubClient {
    pub fn new(http: reqwest::Client, cfg: &GithubConfig, timeout: Duration) -> Self {
        if cfg.token.is_none() {
            tracing::warn!(platform = "github", "GITHUB_TOKEN not configured; GitHub data disabled");
        }
        Self {
            http,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            token: cfg.token.clone(),
            timeout,
            defaults: RepoFilter::new(
                cfg.trending_language.clone(),
                cfg.trending_days,
                cfg.trending_limit,
            ),
        }
    }

    fn get(&self, path: &str) -> Result<reqwest::RequestBuilder, FetchError> {
        let token = self.token.as_deref().ok_or(FetchError::MissingCredential)?;
        Ok(self
            .http
            .get(format!("{}/{}", self.api_base, path))
            .bearer_auth(token)
            .header(ACCEPT, "application/vnd.github.v3+json")
            .timeout(self.timeout))
    }

    async fn search(&self, filter: &RepoFilter) -> Result<Vec<NormalizedItem>, FetchError> {
        let limit = filter.limit.to_string();
        let req = self.get("search/repositories")?.query(&[
            ("q", filter.query().as_str()),
            ("sort", "stars"),
            ("order", "desc"),
            ("per_page", limit.as_str()),
        ]);
        let body: SearchResponse = get_json(Platform::GitHub, req).await?;

        let mut out: Vec<NormalizedItem> = body.items.into_iter().map(normalize).collect();
        out.sort_by(|a, b| b.primary_metric.cmp(&a.primary_metric));
        out.truncate(filter.limit as usize);
        Ok(out)
    }

    /// Repositories created in the last `days`, most starred first. Empty on failure.
    pub async fn fetch_records(&self, filter: &RepoFilter) -> Vec<NormalizedItem> {
        absorb(Platform::GitHub, "search_repositories", self.search(filter).await)
    }

    /// Per-language summary of the last 30 days. Languages without results are omitted.
    pub async fn language_stats(&self) -> BTreeMap<String, LanguageStats> {
        let filters: Vec<RepoFilter> = STATS_LANGUAGES
            .iter()
            .map(|lang| RepoFilter::new(*lang, STATS_DAYS, STATS_LIMIT))
            .collect();
        let results = join_all(filters.iter().map(|f| self.fetch_records(f))).await;

        filters
            .into_iter()
            .zip(results)
            .filter_map(|(f, repos)| LanguageStats::from_repos(&repos).map(|s| (f.language, s)))
            .collect()
    }

    pub fn default_filter(&self) -> &RepoFilter {
        &self.defaults
    }
}

#[async_trait]
impl TrendingSource for GithubClient {
    fn platform(&self) -> Platform {
        Platform::GitHub
    }

    async fn fetch_trending(&self) -> Vec<NormalizedItem> {
        self.fetch_records(&self.defaults).await
    }

    async fn fetch_status(&self) -> PlatformStatus {
        if self.token.is_none() {
            return PlatformStatus::error("GitHub token not configured");
        }
        let req = match self.get("rate_limit") {
            Ok(r) => r,
            Err(e) => return PlatformStatus::error(e.to_string()),
        };
        match get_json::<RateLimitResponse>(Platform::GitHub, req).await {
            Ok(body) => {
                let rate = body.rate;
                PlatformStatus::connected(
                    0,
                    format!(
                        "Connected to GitHub API. {}/{} requests remaining",
                        rate.remaining, rate.limit
                    ),
                )
                .with_rate_limit(RateLimit {
                    limit: rate.limit,
                    remaining: rate.remaining,
                    reset_time: rate.reset,
                })
            }
            Err(e) => {
                tracing::warn!(platform = "github", error = %e, "status probe failed");
                PlatformStatus::error(format!("Failed to connect to GitHub API: {e}"))
            }
        }
    }
}
