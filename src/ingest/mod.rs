// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::ingest::types::{FetchError, Platform};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

/// Upper bound for text excerpts (descriptions, selftext, story text).
pub const DESCRIPTION_MAX_CHARS: usize = 200;
pub const ELLIPSIS: &str = "...";

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("upstream_requests_total", "Outbound calls per platform.");
        describe_counter!(
            "upstream_errors_total",
            "Upstream calls absorbed as empty results, by failure kind."
        );
        describe_counter!(
            "upstream_items_total",
            "Normalized items returned by upstream clients."
        );
        describe_histogram!("upstream_fetch_ms", "Upstream round trip in milliseconds.");
    });
}

/// Decode HTML entities, drop tags and collapse whitespace.
pub fn clean_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

/// Keep at most `max` chars; append "..." when something was cut.
pub fn truncate_with_ellipsis(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Clean and cap an upstream text excerpt.
pub fn excerpt(s: &str) -> String {
    truncate_with_ellipsis(&clean_text(s), DESCRIPTION_MAX_CHARS)
}

/// Unix seconds to RFC 3339 (UTC); empty for out-of-range input.
pub fn unix_to_rfc3339(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .unwrap_or_default()
}

/// GitHub signals exhaustion with 403, Reddit with 429. A 403 elsewhere
/// (private or quarantined subreddit) is a plain status failure.
pub(crate) fn is_rate_limited(platform: Platform, status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && platform == Platform::GitHub)
}

/// Send one GET and classify the outcome. Only `200` is success.
pub(crate) async fn get_json<T: DeserializeOwned>(
    platform: Platform,
    req: reqwest::RequestBuilder,
) -> Result<T, FetchError> {
    ensure_metrics_described();
    counter!("upstream_requests_total", "platform" => platform.key()).increment(1);

    let t0 = std::time::Instant::now();
    let resp = req.send().await?;
    let status = resp.status();

    let out = match status {
        s if s == StatusCode::OK => {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(FetchError::from)
        }
        s if is_rate_limited(platform, s) => {
            let reset = resp
                .headers()
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            Err(FetchError::RateLimited { reset })
        }
        other => {
            let body = resp.text().await.unwrap_or_default();
            Err(FetchError::Status {
                status: other.as_u16(),
                body: truncate_with_ellipsis(&body, DESCRIPTION_MAX_CHARS),
            })
        }
    };

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("upstream_fetch_ms", "platform" => platform.key()).record(ms);
    out
}

/// Coerce a client result into "empty success": log, count, move on.
pub(crate) fn absorb<T>(platform: Platform, op: &'static str, res: Result<Vec<T>, FetchError>) -> Vec<T> {
    ensure_metrics_described();
    match res {
        Ok(items) => {
            tracing::debug!(platform = platform.key(), op, count = items.len(), "upstream fetch ok");
            counter!("upstream_items_total", "platform" => platform.key())
                .increment(items.len() as u64);
            items
        }
        Err(e) => {
            match &e {
                // Already reported once when the client was built.
                FetchError::MissingCredential => {
                    tracing::debug!(platform = platform.key(), op, "skipping call without credential")
                }
                FetchError::RateLimited { reset } => tracing::warn!(
                    platform = platform.key(),
                    op,
                    reset = reset.as_deref().unwrap_or("unknown"),
                    "upstream rate limit exceeded"
                ),
                _ => tracing::error!(platform = platform.key(), op, error = %e, "upstream fetch failed"),
            }
            counter!("upstream_errors_total", "platform" => platform.key(), "kind" => e.kind())
                .increment(1);
            Vec::new()
        }
    }
}
