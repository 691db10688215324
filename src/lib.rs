// src/lib.rs
// Public library surface for integration tests (and the Shuttle binary).

pub mod aggregate;
pub mod api;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod status;
pub mod ws;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{Aggregator, TrendingFeed, TrendingTopic};
pub use crate::api::{router, AppState};
pub use crate::config::SourcesConfig;
pub use crate::ingest::types::{NormalizedItem, Platform, PlatformStatus, TrendingSource};

use axum::Router;

/// Build the full HTTP surface (without `/metrics`) from a loaded config.
pub fn app(cfg: &SourcesConfig) -> anyhow::Result<Router> {
    let state = AppState::from_config(cfg)?;
    Ok(router(state))
}
