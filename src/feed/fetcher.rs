//! Feed fetcher.
//!
//! Retrieves the raw feed document over HTTP(S) with timeouts and a size cap.
//! Every failure here is reported as [`FeedpinError::FeedFetch`].

use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::config::FeedConfig;
use crate::error::{FeedpinError, Result};

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// User agent string for feed fetching.
const USER_AGENT: &str = "feedpin/0.1 (feed reader)";

/// HTTP client for the polled feed.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: Client,
    max_size: u64,
}

impl FeedFetcher {
    /// Create a fetcher using the timeouts and size limit from the config.
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FeedpinError::FeedFetch(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_size: config.max_feed_size_bytes,
        })
    }

    /// Fetch the feed document at `url` as text.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        validate_url(url)?;
        debug!("Fetching feed {}", url);

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/rss+xml, application/xml, text/xml")
            .send()
            .await
            .map_err(|e| FeedpinError::FeedFetch(format!("failed to fetch feed: {}", e)))?;

        if !response.status().is_success() {
            return Err(FeedpinError::FeedFetch(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_size {
                return Err(self.too_large(content_length));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FeedpinError::FeedFetch(format!("failed to read response: {}", e)))?;

        if bytes.len() as u64 > self.max_size {
            return Err(self.too_large(bytes.len() as u64));
        }

        String::from_utf8(bytes.to_vec())
            .map_err(|e| FeedpinError::FeedFetch(format!("feed is not valid UTF-8: {}", e)))
    }

    fn too_large(&self, size: u64) -> FeedpinError {
        FeedpinError::FeedFetch(format!(
            "feed too large: {} bytes (max {} bytes)",
            size, self.max_size
        ))
    }
}

/// Check that a feed URL is an absolute http(s) URL with a host.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| FeedpinError::FeedFetch(format!("invalid URL: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(FeedpinError::FeedFetch(format!(
                "unsupported URL scheme: {}",
                scheme
            )));
        }
    }

    if parsed.host().is_none() {
        return Err(FeedpinError::FeedFetch("URL has no host".to_string()));
    }

    Ok(())
}
