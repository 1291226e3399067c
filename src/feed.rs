use futures::future::try_join_all;
use reqwest::header::ACCEPT;
use tracing::{debug, warn};

use crate::error::{AppError, Result};

pub const ATOM_ACCEPT: &str = "application/atom+xml";

pub const DEFAULT_FEED_URLS: [&str; 3] = [
    "https://api.weather.gov/alerts/active.atom?event=Tornado%20Warning",
    "https://api.weather.gov/alerts/active.atom?event=Severe%20Thunderstorm%20Warning",
    "https://api.weather.gov/alerts/active.atom?event=Flash%20Flood%20Warning",
];

/// Fetches Atom alert feeds. Redirects are followed by the underlying client.
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: reqwest::Client,
}

impl FeedClient {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &str) -> Result<String> {
        debug!(url, "fetching alert feed");
        let response = self
            .client
            .get(url)
            .header(ACCEPT, ATOM_ACCEPT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "alert feed returned an error status");
            return Err(AppError::FeedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }

    /// Fetches every feed concurrently. The first failure fails the batch;
    /// bodies come back in the same order as `urls`.
    pub async fn fetch_all(&self, urls: &[String]) -> Result<Vec<String>> {
        try_join_all(urls.iter().map(|url| self.fetch(url))).await
    }
}
