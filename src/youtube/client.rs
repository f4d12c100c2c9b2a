// YouTube Data API client — key-authenticated stats lookups over HTTPS.
//
// One endpoint matters here: `videos?part=statistics&id=...`. The client's
// job is classification, not policy — it turns each HTTP exchange into an
// `ApiError` variant (carrying any server-supplied wait hints) and leaves
// all retry/backoff decisions to the fetch layer.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// Default base URL for the YouTube Data API v3.
pub const DEFAULT_API_URL: &str = "https://www.googleapis.com/youtube/v3";

/// One fetch attempt's failure, as seen on the wire.
///
/// `RateLimited` carries the server's wait hints when present: `retry_after`
/// from a `Retry-After` header (delta seconds), `reset_in` from an
/// `X-RateLimit-Reset` header (epoch seconds, already converted to a
/// remaining duration, floored at zero). Priority between them belongs to
/// the retry layer.
#[derive(Debug, Clone)]
pub enum ApiError {
    RateLimited {
        retry_after: Option<Duration>,
        reset_in: Option<Duration>,
    },
    /// 503 — transient, retried without touching the rate-limit counter.
    Unavailable { detail: String },
    /// Well-formed transport, unusable payload: bad JSON, no matching
    /// record, or an unexpected status code.
    Malformed { detail: String },
    /// Transport-level fault (DNS, connect, timeout, broken body).
    Network { detail: String },
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::RateLimited { .. } => write!(f, "rate limited (429)"),
            ApiError::Unavailable { detail } => write!(f, "service unavailable: {detail}"),
            ApiError::Malformed { detail } => write!(f, "malformed response: {detail}"),
            ApiError::Network { detail } => write!(f, "network fault: {detail}"),
        }
    }
}

/// The single operation the fetch layer needs from the API.
///
/// `YouTubeClient` is the real implementation; tests drive the fetcher and
/// scheduler with a scripted mock instead.
#[async_trait]
pub trait VideoStatsApi: Send + Sync {
    /// Fetch the view count for one video ID.
    async fn view_count(&self, video_id: &str) -> Result<u64, ApiError>;
}

/// Key-authenticated HTTP client for the Data API.
pub struct YouTubeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl YouTubeClient {
    /// Create a client pointing at the given base URL.
    ///
    /// Pass `DEFAULT_API_URL` for the real API, or a stub server URL
    /// for testing.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("viewtally/0.1")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl VideoStatsApi for YouTubeClient {
    async fn view_count(&self, video_id: &str) -> Result<u64, ApiError> {
        let url = format!("{}/videos", self.base_url);

        debug!(video_id = video_id, "Stats request");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("part", "statistics"),
                ("id", video_id),
                ("key", &self.api_key),
            ])
            .send()
            .await
            .map_err(|e| ApiError::Network {
                detail: e.to_string(),
            })?;

        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = parse_retry_after(response.headers());
            let reset_in = parse_reset_remaining(response.headers());
            return Err(ApiError::RateLimited {
                retry_after,
                reset_in,
            });
        }

        if status.as_u16() == 503 {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Unavailable {
                detail: format!("503: {}", crate::output::truncate_chars(&body, 120)),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Malformed {
                detail: format!(
                    "unexpected status {status}: {}",
                    crate::output::truncate_chars(&body, 120)
                ),
            });
        }

        let listing: VideoListResponse =
            response.json().await.map_err(|e| ApiError::Malformed {
                detail: format!("bad JSON: {e}"),
            })?;

        extract_view_count(&listing, video_id)
    }
}

/// Pull the view count for `video_id` out of a listing response.
///
/// An empty `items` array is a well-formed "no matching record" reply —
/// surfaced as `Malformed` so the retry layer treats it as recoverable
/// rather than a success with no data.
fn extract_view_count(listing: &VideoListResponse, video_id: &str) -> Result<u64, ApiError> {
    let item = listing
        .items
        .iter()
        .find(|i| i.id == video_id)
        .or_else(|| listing.items.first())
        .ok_or_else(|| ApiError::Malformed {
            detail: format!("no statistics returned for {video_id}"),
        })?;

    // The Data API serializes counts as strings.
    item.statistics
        .view_count
        .as_deref()
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or_else(|| ApiError::Malformed {
            detail: format!("viewCount missing or non-numeric for {video_id}"),
        })
}

/// Parse a `Retry-After` header (delta-seconds form only — the API never
/// sends the HTTP-date form).
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get("retry-after")?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Parse an `X-RateLimit-Reset` header (epoch seconds) into the remaining
/// duration from now, floored at zero for timestamps already in the past.
fn parse_reset_remaining(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let reset_epoch = headers
        .get("x-ratelimit-reset")?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    Some(Duration::from_secs(reset_epoch.saturating_sub(now)))
}

// -- Serde types for the videos listing --

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    #[serde(default)]
    id: String,
    #[serde(default)]
    statistics: VideoStatistics,
}

#[derive(Debug, Default, Deserialize)]
struct VideoStatistics {
    #[serde(rename = "viewCount")]
    view_count: Option<String>,
}
