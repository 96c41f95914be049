//! HTTP client shared by the network strategies.
//!
//! A thin wrapper over reqwest that sends an ordered header set, follows
//! redirects, and bounds every request by the configured timeout. Routes
//! through `SOCKS_PROXY` when one is configured.

mod response;

pub use response::HttpResponse;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{redirect, Client, Proxy, Response};
use tracing::debug;

/// Maximum number of redirects followed per request.
const MAX_REDIRECTS: usize = 10;

/// HTTP client with per-request identity headers.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

fn extract_response_headers(response: &Response) -> HashMap<String, String> {
    response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

/// Build a header map, skipping entries that are not valid HTTP headers.
fn build_header_map(headers: &[(String, String)]) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => debug!("Skipping invalid header {}", name),
        }
    }
    map
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Self::with_proxy(timeout, None)
    }

    /// Create a new HTTP client routed through an optional proxy
    /// (e.g. "socks5://127.0.0.1:1080").
    pub fn with_proxy(timeout: Duration, proxy: Option<&str>) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .gzip(true)
            .brotli(true);

        if let Some(proxy) = proxy {
            builder = builder.proxy(Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
            timeout,
        })
    }

    /// Per-request timeout this client enforces.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Make a GET request with the given headers, in order.
    pub async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<HttpResponse, reqwest::Error> {
        let start = Instant::now();
        let response = self
            .client
            .get(url)
            .headers(build_header_map(headers))
            .send()
            .await?;

        let status = response.status();
        debug!(
            "GET {} -> {} in {}ms",
            url,
            status.as_u16(),
            start.elapsed().as_millis()
        );

        Ok(HttpResponse {
            status,
            headers: extract_response_headers(&response),
            final_url: response.url().to_string(),
            response,
        })
    }

    /// Get page content as text.
    pub async fn get_text(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<(u16, String), reqwest::Error> {
        let response = self.get(url, headers).await?;
        let status = response.status.as_u16();
        Ok((status, response.text().await?))
    }
}
