//! CS Student Hub: binary entrypoint.
//! Boots the Axum HTTP server: config, upstream clients, routes and metrics.

use shuttle_axum::ShuttleAxum;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tech_trends_hub::metrics::Metrics;
use tech_trends_hub::SourcesConfig;

/// Compact logs by default, JSON lines when `LOG_FORMAT=json`.
/// Uses `try_init` so a subscriber installed by the runtime is kept.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tech_trends_hub=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        info!("tracing subscriber already installed; keeping it");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = SourcesConfig::load()?;
    info!(
        github = %cfg.github.api_base,
        github_token = cfg.github.token.is_some(),
        reddit = %cfg.reddit.api_base,
        hackernews = %cfg.hackernews.api_base,
        timeout_secs = cfg.http.timeout().as_secs(),
        "sources configured"
    );

    let metrics = Metrics::init()?;
    let router = tech_trends_hub::app(&cfg)?.merge(metrics.router());

    Ok(router.into())
}
