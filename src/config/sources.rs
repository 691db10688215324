// src/config/sources.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_SOURCES_CONFIG_PATH: &str = "SOURCES_CONFIG_PATH";
pub const DEFAULT_SOURCES_CONFIG_PATH: &str = "config/sources.toml";

const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
const ENV_GITHUB_API_BASE: &str = "GITHUB_API_BASE";
const ENV_REDDIT_API_BASE: &str = "REDDIT_API_BASE";
const ENV_HACKERNEWS_API_BASE: &str = "HACKERNEWS_API_BASE";
const ENV_UPSTREAM_TIMEOUT_SECS: &str = "UPSTREAM_TIMEOUT_SECS";

const MIN_TIMEOUT_SECS: u64 = 1;
const MAX_TIMEOUT_SECS: u64 = 15;

/// Upstream endpoints, credential and default filters for the three sources.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub github: GithubConfig,
    pub reddit: RedditConfig,
    pub hackernews: HackerNewsConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub api_base: String,
    /// Never read from the file; only `$GITHUB_TOKEN` sets it.
    #[serde(skip)]
    pub token: Option<String>,
    pub trending_language: String,
    pub trending_days: u32,
    pub trending_limit: u32,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            token: None,
            trending_language: String::new(),
            trending_days: 7,
            trending_limit: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedditConfig {
    pub api_base: String,
    pub subreddits: Vec<String>,
    pub sort: String,
    pub trending_limit: u32,
    pub min_score: i64,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.reddit.com".to_string(),
            subreddits: [
                "programming",
                "technology",
                "webdev",
                "learnprogramming",
                "cscareerquestions",
                "MachineLearning",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            sort: "hot".to_string(),
            trending_limit: 25,
            min_score: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HackerNewsConfig {
    pub api_base: String,
    pub trending_limit: u32,
    pub min_score: i64,
}

impl Default for HackerNewsConfig {
    fn default() -> Self {
        Self {
            api_base: "https://hacker-news.firebaseio.com/v0".to_string(),
            trending_limit: 15,
            min_score: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: "CS-Student-Hub/1.0".to_string(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS))
    }

    /// Shared client for every upstream source.
    pub fn build_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .connect_timeout(Duration::from_secs(4).min(self.timeout()))
            .timeout(self.timeout())
            .build()
            .context("building upstream http client")
    }
}

impl SourcesConfig {
    /// Load from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading sources config from {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("parsing sources config {}", path.display()))
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $SOURCES_CONFIG_PATH
    /// 2) config/sources.toml
    /// 3) built-in defaults
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_SOURCES_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_SOURCES_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_SOURCES_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from(&default_p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env();
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        self.github.token = env_non_empty(ENV_GITHUB_TOKEN);
        if let Some(v) = env_non_empty(ENV_GITHUB_API_BASE) {
            self.github.api_base = v;
        }
        if let Some(v) = env_non_empty(ENV_REDDIT_API_BASE) {
            self.reddit.api_base = v;
        }
        if let Some(v) = env_non_empty(ENV_HACKERNEWS_API_BASE) {
            self.hackernews.api_base = v;
        }
        if let Some(v) = env_non_empty(ENV_UPSTREAM_TIMEOUT_SECS).and_then(|s| s.parse().ok()) {
            self.http.timeout_secs = v;
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
