//! StatHat export API client.
//!
//! Resolves a stat name to its opaque identifier, then fetches that
//! identifier's points for a timeframe. Implements [`StatFetcher`] so the
//! cache can consume it behind the capability trait.

use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use common::{Dataset, Error, Point, Timeframe};
use serde::Deserialize;
use statcache::StatFetcher;
use tracing::{debug, info, warn};

const DEFAULT_BASE_URL: &str = "https://www.stathat.com/x";

fn resolve_base_url(access_token: &str) -> String {
    if let Ok(override_url) = std::env::var("STATHAT_API_BASE_URL") {
        let normalized = override_url.trim().trim_end_matches('/').to_string();
        if !normalized.is_empty() {
            info!("Using STATHAT_API_BASE_URL override: {}", normalized);
            return format!("{}/{}", normalized, access_token);
        }
        warn!("Ignoring empty STATHAT_API_BASE_URL override");
    }

    format!("{}/{}", DEFAULT_BASE_URL, access_token)
}

fn format_reqwest_error(err: &reqwest::Error) -> String {
    // Chained causes keep DNS/TLS/socket failures visible.
    let mut message = err.to_string();
    let mut source = err.source();

    while let Some(cause) = source {
        let cause_msg = cause.to_string();
        if !cause_msg.is_empty() && !message.contains(&cause_msg) {
            message.push_str(": ");
            message.push_str(&cause_msg);
        }
        source = cause.source();
    }

    message
}

fn summarize_response_body(raw: &str) -> String {
    const MAX_CHARS: usize = 800;
    let compact = raw.replace('\n', " ").replace('\r', " ");
    if compact.len() > MAX_CHARS {
        format!("{}…", &compact[..MAX_CHARS])
    } else {
        compact
    }
}

/// Stat metadata as returned by `GET /stat?name=...`.
#[derive(Debug, Deserialize)]
pub struct StatInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub counter: bool,
}

/// One dataset in the `GET /data/{id}` response array.
#[derive(Debug, Deserialize)]
struct DatasetPayload {
    #[serde(default)]
    points: Vec<Point>,
}

/// Async client for the StatHat export API.
#[derive(Debug, Clone)]
pub struct StatHatClient {
    client: reqwest::Client,
    base_url: String,
}

impl StatHatClient {
    pub fn new(access_token: &str, request_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .timeout(request_timeout)
            .build()
            .expect("failed to build StatHat HTTP client");

        StatHatClient {
            client,
            base_url: resolve_base_url(access_token),
        }
    }

    /// Resolve a stat name to its metadata.
    async fn lookup_stat(&self, name: &str) -> Result<StatInfo, Error> {
        let url = format!("{}/stat", self.base_url);
        debug!("Looking up stat {:?}", name);

        let resp = self
            .client
            .get(&url)
            .query(&[("name", name)])
            .send()
            .await
            .map_err(|e| Error::Http(format_reqwest_error(&e)))?;

        if resp.status().as_u16() != 200 {
            return Err(Error::NotFound(name.to_string()));
        }

        resp.json()
            .await
            .map_err(|e| Error::Http(format_reqwest_error(&e)))
    }

    /// Fetch the point data for a resolved stat id.
    async fn fetch_data(
        &self,
        name: &str,
        stat_id: &str,
        tf: &Timeframe,
    ) -> Result<Vec<DatasetPayload>, Error> {
        let url = format!("{}/data/{}", self.base_url, stat_id);
        debug!("Fetching data for stat {:?} over {}", name, tf);

        let mut req = self.client.get(&url).query(&[("t", tf.compact())]);
        if let Some(start) = tf.start {
            req = req.query(&[("start", start.timestamp().to_string())]);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Error::Http(format_reqwest_error(&e)))?;

        if resp.status().as_u16() != 200 {
            return Err(Error::NotFound(name.to_string()));
        }

        let raw = resp
            .text()
            .await
            .map_err(|e| Error::Http(format_reqwest_error(&e)))?;

        serde_json::from_str(&raw).map_err(|e| {
            Error::Http(format!(
                "error decoding data response: {}; body={}",
                e,
                summarize_response_body(&raw)
            ))
        })
    }
}

#[async_trait]
impl StatFetcher for StatHatClient {
    async fn fetch(&self, name: &str, tf: &Timeframe) -> Result<Dataset, Error> {
        let stat = self.lookup_stat(name).await?;
        let mut payloads = self.fetch_data(name, &stat.id, tf).await?;

        if payloads.is_empty() {
            return Err(Error::Http(format!("empty data response for stat {name}")));
        }

        let payload = payloads.remove(0);
        debug!("Got {} points for {:?}", payload.points.len(), name);

        Ok(Dataset {
            name: stat.name,
            timeframe: tf.clone(),
            points: payload.points,
        })
    }
}
