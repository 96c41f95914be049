//! Direct fetch with identity spoofing.

use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use super::{read_page, Strategy};
use crate::config::DirectConfig;
use crate::error::AcquisitionError;
use crate::http_client::HttpClient;
use crate::identity::{IdentityProfile, BROWSER, CRAWLER, SOCIAL_PREVIEW};
use crate::models::{AcquisitionOutcome, Method};

/// Fetches the page from its origin, presenting as a browser first and as a
/// declared crawler when a bot wall answers.
pub struct DirectFetch {
    client: HttpClient,
    search_host: String,
    social_fallback: bool,
    min_fallback_body: usize,
}

impl DirectFetch {
    pub fn new(client: HttpClient, config: &DirectConfig) -> Self {
        Self {
            client,
            search_host: config.search_host.clone(),
            social_fallback: config.social_fallback,
            min_fallback_body: config.min_fallback_body,
        }
    }

    async fn attempt(
        &self,
        url: &Url,
        profile: &IdentityProfile,
    ) -> Result<AcquisitionOutcome, AcquisitionError> {
        debug!("Fetching {} as {}", url, profile.name);
        let headers = profile.headers_for(url, &self.search_host);
        read_page(&self.client, url.as_str(), &headers).await
    }
}

#[async_trait]
impl Strategy for DirectFetch {
    fn method(&self) -> Method {
        Method::Live
    }

    async fn acquire(&self, url: &Url) -> Result<AcquisitionOutcome, AcquisitionError> {
        let blocked = match self.attempt(url, &BROWSER).await {
            Err(e @ AcquisitionError::Blocked { .. }) => e,
            other => return other,
        };
        info!("{} as {}, retrying as {}", blocked, BROWSER.name, CRAWLER.name);

        let blocked = match self.attempt(url, &CRAWLER).await {
            Err(e @ AcquisitionError::Blocked { .. }) => e,
            other => return other,
        };

        if self.social_fallback {
            for profile in SOCIAL_PREVIEW {
                match self.attempt(url, profile).await {
                    Ok(outcome) if outcome.raw_body.chars().count() >= self.min_fallback_body => {
                        info!("Fetched {} as {}", url, profile.name);
                        return Ok(outcome);
                    }
                    Ok(_) => debug!("{} returned a stub page for {}", profile.name, url),
                    Err(e) => debug!("{} failed for {}: {}", profile.name, url, e),
                }
            }
        }

        Err(blocked)
    }
}
