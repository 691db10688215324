// src/status.rs
//! Combined connectivity report for `/api/status/`.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ingest::types::{now_rfc3339, PlatformStatus, TrendingSource};

pub const FEATURES: [&str; 4] = [
    "Real-time WebSocket updates",
    "GitHub API integration",
    "Reddit API integration",
    "Hacker News API integration",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: String,
    pub message: String,
    pub version: String,
    pub features: Vec<String>,
    pub platforms: BTreeMap<String, PlatformStatus>,
    pub checked_at: String,
}

#[derive(Clone)]
pub struct StatusReporter {
    sources: Vec<Arc<dyn TrendingSource>>,
}

impl StatusReporter {
    pub fn new(sources: Vec<Arc<dyn TrendingSource>>) -> Self {
        Self { sources }
    }

    /// Probe every source concurrently; a failing probe only affects its own entry.
    pub async fn report(&self) -> StatusReport {
        let probes = join_all(
            self.sources
                .iter()
                .map(|s| async move { (s.platform().key().to_string(), s.fetch_status().await) }),
        )
        .await;

        StatusReport {
            status: "running".to_string(),
            message: "CS Student Hub API is running!".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            features: FEATURES.iter().map(|f| f.to_string()).collect(),
            platforms: probes.into_iter().collect(),
            checked_at: now_rfc3339(),
        }
    }
}
