//! Acquisition strategies.
//!
//! Each strategy turns a target URL into raw markup by some means: a direct
//! request, a readability proxy, a headless browser or an archive snapshot.
//! They share the [`Strategy`] trait so the orchestrator can treat them
//! uniformly and tests can substitute fakes.

mod archive;
mod direct;
mod headless;
mod reader;

pub use archive::{raw_snapshot_url, ArchiveSnapshot};
pub use direct::DirectFetch;
pub use headless::HeadlessRender;
pub use reader::ExternalReader;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::config::Config;
use crate::error::{AcquisitionError, SetupError};
use crate::http_client::HttpClient;
use crate::models::{AcquisitionOutcome, Method};

/// A single means of acquiring a page.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Method this strategy reports results under.
    fn method(&self) -> Method;

    /// Fetch raw markup for `url`.
    async fn acquire(&self, url: &Url) -> Result<AcquisitionOutcome, AcquisitionError>;
}

/// Build the strategy implementing `method` from configuration.
pub fn build(method: Method, config: &Config) -> Result<Arc<dyn Strategy>, SetupError> {
    let proxy = config.socks_proxy.as_deref();
    let strategy: Arc<dyn Strategy> = match method {
        Method::Live => {
            let timeout = Duration::from_secs(config.direct.request_timeout_secs);
            Arc::new(DirectFetch::new(
                HttpClient::with_proxy(timeout, proxy)?,
                &config.direct,
            ))
        }
        Method::Mercenary => {
            let timeout = Duration::from_secs(config.reader.timeout_secs);
            Arc::new(ExternalReader::new(
                HttpClient::with_proxy(timeout, proxy)?,
                &config.reader,
            ))
        }
        Method::Headless => Arc::new(HeadlessRender::new(config.browser.clone(), proxy)),
        Method::Archive => {
            let lookup = HttpClient::with_proxy(
                Duration::from_secs(config.archive.lookup_timeout_secs),
                proxy,
            )?;
            let snapshot = HttpClient::with_proxy(
                Duration::from_secs(config.archive.snapshot_timeout_secs),
                proxy,
            )?;
            Arc::new(ArchiveSnapshot::new(lookup, snapshot, &config.archive))
        }
    };
    Ok(strategy)
}

/// Read a successful HTML/text response body, classifying everything else.
pub(crate) async fn read_page(
    client: &HttpClient,
    url: &str,
    headers: &[(String, String)],
) -> Result<AcquisitionOutcome, AcquisitionError> {
    let response = client
        .get(url, headers)
        .await
        .map_err(|e| AcquisitionError::from_reqwest(e, client.timeout()))?;

    let status = response.status.as_u16();
    if !response.is_success() {
        return Err(AcquisitionError::from_status(status));
    }
    if !response.is_html_or_text() {
        let content_type = response.content_type().unwrap_or_default().to_string();
        return Err(AcquisitionError::UnsupportedContent(content_type));
    }

    let body = response
        .text()
        .await
        .map_err(|e| AcquisitionError::from_reqwest(e, client.timeout()))?;
    Ok(AcquisitionOutcome::success(body, status))
}
