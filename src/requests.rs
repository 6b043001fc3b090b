use std::time::Duration;

use log::debug;
use reqwest::{Client, ClientBuilder, Response, redirect::Policy};

use crate::{error::ScrapeError, ratelimit::RateLimiter};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Markup of a page together with the URL it was finally served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub body: String,
}

pub struct RequestClient {
    client: Client,
    rate_limiter: RateLimiter,
}

impl RequestClient {
    pub fn new(timeout: Duration, max_redirects: usize) -> Result<Self, ScrapeError> {
        let client = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .redirect(Policy::limited(max_redirects))
            .build()?;
        let rate_limiter = RateLimiter::new();
        Ok(Self {
            client,
            rate_limiter,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_client(client: Client) -> Self {
        Self {
            client,
            rate_limiter: RateLimiter::new(),
        }
    }

    pub async fn fetch_url_response(&self, url: &str) -> Result<Response, ScrapeError> {
        // Wait (non-blocking) until we're allowed to make a request according
        // to our self-imposed rate-limiting policy.
        self.rate_limiter.wait_until_ready().await;

        debug!("GET {url}");
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ScrapeError::Io {
                message: format!("{url} returned status {}", response.status()),
            });
        }
        Ok(response)
    }

    pub async fn fetch_page(&self, url: &str) -> Result<FetchedPage, ScrapeError> {
        let response = self.fetch_url_response(url).await?;
        let url = response.url().to_string();
        let body = response.text().await?;
        Ok(FetchedPage { url, body })
    }
}
