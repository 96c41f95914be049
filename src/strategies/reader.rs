//! External readability proxy.

mod markdown;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::{read_page, Strategy};
use crate::config::ReaderConfig;
use crate::error::AcquisitionError;
use crate::http_client::HttpClient;
use crate::models::{AcquisitionOutcome, Method};

/// Text the proxy returns when it hit a wall itself.
const SOFT_FAILURE_MARKERS: &[&str] = &[
    "verify you are human",
    "verifying you are human",
    "checking your browser",
    "checking if the site connection is secure",
    "enable javascript and cookies",
    "please enable javascript",
    "you need to enable javascript",
    "attention required",
    "access denied",
];

/// Header lines that precede the article markup.
const METADATA_PREFIXES: &[&str] = &[
    "Title:",
    "URL Source:",
    "Published Time:",
    "Description:",
    "Warning:",
    "Number of Pages:",
];

const CONTENT_MARKER: &str = "Markdown Content:";

/// Wall pages say so up front; markers further in are article text.
const MARKER_WINDOW: usize = 400;

/// Asks a readability proxy for the article and rebuilds HTML from its
/// lightweight markup.
pub struct ExternalReader {
    client: HttpClient,
    endpoint: String,
    min_body_length: usize,
}

impl ExternalReader {
    pub fn new(client: HttpClient, config: &ReaderConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            min_body_length: config.min_body_length,
        }
    }

    fn request_url(&self, url: &Url) -> String {
        format!("{}{}", self.endpoint, url)
    }
}

#[async_trait]
impl Strategy for ExternalReader {
    fn method(&self) -> Method {
        Method::Mercenary
    }

    async fn acquire(&self, url: &Url) -> Result<AcquisitionOutcome, AcquisitionError> {
        let headers = vec![(
            "Accept".to_string(),
            "text/plain, text/markdown;q=0.9, */*;q=0.5".to_string(),
        )];
        let outcome = read_page(&self.client, &self.request_url(url), &headers).await?;

        let body = outcome.raw_body.trim();
        if body.chars().count() < self.min_body_length {
            return Err(AcquisitionError::SoftFailure(format!(
                "reader returned {} chars",
                body.chars().count()
            )));
        }

        let (title, markup) = split_payload(body);
        if let Some(marker) = soft_failure_marker(title, markup) {
            return Err(AcquisitionError::SoftFailure(format!("reader saw \"{}\"", marker)));
        }
        debug!("Reader payload for {}: title={:?}, {} chars", url, title, markup.len());

        Ok(AcquisitionOutcome::success(
            render_document(title, markup),
            outcome.status_code,
        ))
    }
}

/// Look for a wall marker in the title and the lead of the markup.
fn soft_failure_marker(title: Option<&str>, markup: &str) -> Option<&'static str> {
    let lead: String = markup.trim_start().chars().take(MARKER_WINDOW).collect();
    let lower = format!("{}\n{}", title.unwrap_or_default(), lead).to_lowercase();
    SOFT_FAILURE_MARKERS
        .iter()
        .copied()
        .find(|m| lower.contains(m))
}

/// Separate the `Title:` header and metadata lines from the article markup.
fn split_payload(body: &str) -> (Option<&str>, &str) {
    let title = body
        .lines()
        .find_map(|l| l.strip_prefix("Title:"))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if let Some(pos) = body.find(CONTENT_MARKER) {
        return (title, &body[pos + CONTENT_MARKER.len()..]);
    }

    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed.is_empty() || METADATA_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
            offset += line.len();
        } else {
            break;
        }
    }
    (title, &body[offset..])
}

fn render_document(title: Option<&str>, markup: &str) -> String {
    let head = title
        .map(|t| format!("<title>{}</title>", markdown::escape_html(t)))
        .unwrap_or_default();
    format!(
        "<!DOCTYPE html><html><head>{}</head><body><article>\n{}</article></body></html>",
        head,
        markdown::to_html(markup)
    )
}
