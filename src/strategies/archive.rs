//! Archive snapshot retrieval through the Wayback availability API.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use super::{read_page, Strategy};
use crate::config::ArchiveConfig;
use crate::error::AcquisitionError;
use crate::http_client::HttpClient;
use crate::identity::{BROWSER, DEFAULT_SEARCH_HOST};
use crate::models::{AcquisitionOutcome, Method};

#[derive(Debug, Deserialize)]
struct Availability {
    #[serde(default)]
    archived_snapshots: ArchivedSnapshots,
}

#[derive(Debug, Default, Deserialize)]
struct ArchivedSnapshots {
    closest: Option<ClosestSnapshot>,
}

#[derive(Debug, Deserialize)]
struct ClosestSnapshot {
    #[serde(default)]
    available: bool,
    url: String,
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    status: Option<String>,
}

/// Fetches the closest archived capture of the page.
pub struct ArchiveSnapshot {
    lookup: HttpClient,
    snapshot: HttpClient,
    endpoint: String,
    raw_snapshot: bool,
}

impl ArchiveSnapshot {
    pub fn new(lookup: HttpClient, snapshot: HttpClient, config: &ArchiveConfig) -> Self {
        Self {
            lookup,
            snapshot,
            endpoint: config.endpoint.clone(),
            raw_snapshot: config.raw_snapshot,
        }
    }

    fn lookup_url(&self, url: &Url) -> String {
        format!(
            "{}?url={}",
            self.endpoint,
            urlencoding::encode(url.as_str())
        )
    }

    async fn closest(&self, url: &Url) -> Result<ClosestSnapshot, AcquisitionError> {
        let response = self
            .lookup
            .get(&self.lookup_url(url), &[])
            .await
            .map_err(|e| AcquisitionError::from_reqwest(e, self.lookup.timeout()))?;
        if !response.is_success() {
            return Err(AcquisitionError::from_status(response.status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AcquisitionError::from_reqwest(e, self.lookup.timeout()))?;
        let availability: Availability = serde_json::from_str(&body)
            .map_err(|e| AcquisitionError::Network(format!("bad availability response: {}", e)))?;

        match availability.archived_snapshots.closest {
            Some(closest) if closest.available && !closest.url.is_empty() => Ok(closest),
            _ => Err(AcquisitionError::NoSnapshot),
        }
    }
}

#[async_trait]
impl Strategy for ArchiveSnapshot {
    fn method(&self) -> Method {
        Method::Archive
    }

    async fn acquire(&self, url: &Url) -> Result<AcquisitionOutcome, AcquisitionError> {
        let closest = self.closest(url).await?;

        match parse_timestamp(&closest.timestamp) {
            Some(captured) => info!(
                "Using snapshot of {} from {} ({} days old)",
                url,
                captured.format("%Y-%m-%d"),
                (Utc::now() - captured).num_days()
            ),
            None => info!("Using snapshot {}", closest.url),
        }
        if let Some(status) = &closest.status {
            debug!("Snapshot recorded HTTP {}", status);
        }

        let fetch_url = if self.raw_snapshot {
            raw_snapshot_url(&closest.url, &closest.timestamp)
        } else {
            closest.url.clone()
        };
        let headers = BROWSER.headers_for(url, DEFAULT_SEARCH_HOST);
        let outcome = read_page(&self.snapshot, &fetch_url, &headers).await?;

        Ok(outcome.with_snapshot(closest.url))
    }
}

/// Parse a Wayback timestamp (`YYYYMMDDhhmmss`).
fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    if ts.len() < 14 {
        return None;
    }
    NaiveDateTime::parse_from_str(ts.get(..14)?, "%Y%m%d%H%M%S")
        .ok()
        .map(|dt| dt.and_utc())
}

/// Rewrite a snapshot URL to its raw `id_` variant, which serves the
/// captured bytes without the archive toolbar.
pub fn raw_snapshot_url(snapshot_url: &str, timestamp: &str) -> String {
    if timestamp.is_empty() {
        return snapshot_url.to_string();
    }
    let marker = format!("/web/{}/", timestamp);
    match snapshot_url.find(&marker) {
        Some(pos) => format!(
            "{}/web/{}id_/{}",
            &snapshot_url[..pos],
            timestamp,
            &snapshot_url[pos + marker.len()..]
        ),
        None => snapshot_url.to_string(),
    }
}
