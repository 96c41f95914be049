//! Core value types passed between the orchestrator, strategies and callers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::RetrieveError;

/// Acquisition method, named after the strategy that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Direct network fetch with identity spoofing.
    Live,
    /// External readability proxy.
    Mercenary,
    /// Headless browser rendering.
    Headless,
    /// Public archive snapshot.
    Archive,
}

impl Method {
    pub const ALL: [Method; 4] = [Self::Live, Self::Mercenary, Self::Headless, Self::Archive];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Mercenary => "mercenary",
            Self::Headless => "headless",
            Self::Archive => "archive",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "live" | "direct" => Ok(Self::Live),
            "mercenary" | "reader" => Ok(Self::Mercenary),
            "headless" | "browser" => Ok(Self::Headless),
            "archive" | "wayback" => Ok(Self::Archive),
            other => Err(format!(
                "Invalid method '{}'. Valid options: live, mercenary, headless, archive",
                other
            )),
        }
    }
}

/// A single validated retrieval target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalRequest {
    url: Url,
}

impl RetrievalRequest {
    /// Parse a caller supplied URL. Only absolute http(s) URLs with a host are accepted.
    pub fn parse(raw: &str) -> Result<Self, RetrieveError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(RetrieveError::InvalidInput("A valid URL is required.".to_string()));
        }
        let url = Url::parse(raw)
            .map_err(|e| RetrieveError::InvalidInput(format!("Invalid URL format: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RetrieveError::InvalidInput(format!(
                "Unsupported URL scheme: {}",
                url.scheme()
            )));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(RetrieveError::InvalidInput("URL has no host".to_string()));
        }
        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Raw result of one strategy attempt, consumed by the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionOutcome {
    pub raw_body: String,
    pub status_code: u16,
    pub succeeded: bool,
    /// Snapshot the body came from. Only honoured for [`Method::Archive`].
    pub snapshot_url: Option<String>,
}

impl AcquisitionOutcome {
    /// A successful acquisition.
    pub fn success(raw_body: String, status_code: u16) -> Self {
        Self {
            raw_body,
            status_code,
            succeeded: true,
            snapshot_url: None,
        }
    }

    /// Attach the snapshot URL the body was served from.
    pub fn with_snapshot(mut self, snapshot_url: impl Into<String>) -> Self {
        self.snapshot_url = Some(snapshot_url.into());
        self
    }

    /// Whether there is anything worth extracting.
    pub fn has_body(&self) -> bool {
        self.succeeded && !self.raw_body.trim().is_empty()
    }
}

/// Final, accepted article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalResult {
    title: String,
    source_url: String,
    content_html: String,
    method: Method,
}

impl RetrievalResult {
    pub(crate) fn new(title: String, source_url: String, content_html: String, method: Method) -> Self {
        Self {
            title,
            source_url,
            content_html,
            method,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn content_html(&self) -> &str {
        &self.content_html
    }

    pub fn method(&self) -> Method {
        self.method
    }
}
