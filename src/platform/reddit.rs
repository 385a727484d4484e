//! Reddit API client.
//!
//! Talks to the OAuth API with a bearer token. Token acquisition is outside
//! this crate; the token comes from configuration.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::config::PlatformConfig;
use crate::error::{FeedpinError, Result};
use crate::platform::{NewPost, Platform, PlatformPost};

/// Request timeout for API calls.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Type prefix of post fullnames.
const POST_PREFIX: &str = "t3_";

#[derive(Debug, Deserialize)]
struct Listing<T> {
    data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
struct ListingData<T> {
    children: Vec<ListingChild<T>>,
}

#[derive(Debug, Deserialize)]
struct ListingChild<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct PostData {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    stickied: bool,
    #[serde(default)]
    removed_by_category: Option<String>,
}

impl From<PostData> for PlatformPost {
    fn from(data: PostData) -> Self {
        PlatformPost {
            id: data.id,
            url: data.url,
            title: data.title,
            author: data.author,
            is_pinned: data.stickied,
        }
    }
}

/// `{"json": {"errors": [...], "data": {...}}}` envelope of form endpoints.
#[derive(Debug, Deserialize)]
struct JsonEnvelope<T> {
    json: JsonBody<T>,
}

#[derive(Debug, Deserialize)]
struct JsonBody<T> {
    #[serde(default)]
    errors: Vec<serde_json::Value>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SubmitData {
    id: String,
}

/// Reddit implementation of [`Platform`].
#[derive(Debug, Clone)]
pub struct RedditClient {
    http_client: Client,
    api_base: String,
    subreddit: String,
    access_token: String,
}

impl RedditClient {
    /// Create a client from the platform configuration.
    pub fn new(config: &PlatformConfig) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| FeedpinError::Platform(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            subreddit: config.subreddit.clone(),
            access_token: config.access_token.clone(),
        })
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}{}", self.api_base, endpoint))
            .bearer_auth(&self.access_token)
    }

    async fn send(&self, builder: RequestBuilder, endpoint: &str) -> Result<Response> {
        let response = builder.send().await.map_err(|e| {
            error!("Network error for {}: {}", endpoint, e);
            FeedpinError::Platform(format!("request to {} failed: {}", endpoint, e))
        })?;

        let status = response.status();
        if status.is_success() {
            debug!("Request successful: {} {}", status, endpoint);
            return Ok(response);
        }

        error!("Request failed with status: {} for {}", status, endpoint);
        Err(match status {
            StatusCode::UNAUTHORIZED => {
                FeedpinError::Platform("access token rejected".to_string())
            }
            StatusCode::NOT_FOUND => FeedpinError::NotFound(endpoint.to_string()),
            StatusCode::CONFLICT => FeedpinError::PinConflict(format!("{} returned 409", endpoint)),
            _ => FeedpinError::Platform(format!("{} returned {}", endpoint, status)),
        })
    }

    async fn post_form<T>(&self, endpoint: &str, form: &[(&str, &str)]) -> Result<JsonBody<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .send(self.request(Method::POST, endpoint).form(form), endpoint)
            .await?;
        let envelope: JsonEnvelope<T> = response.json().await.map_err(|e| {
            FeedpinError::Platform(format!("invalid response from {}: {}", endpoint, e))
        })?;
        Ok(envelope.json)
    }

    async fn set_sticky(&self, id: &str, state: bool, position: Option<u32>) -> Result<()> {
        let endpoint = "/api/set_subreddit_sticky";
        let fullname = fullname(id);
        let num = position.map(|p| p.to_string());

        let mut form = vec![
            ("api_type", "json"),
            ("id", fullname.as_str()),
            ("state", if state { "true" } else { "false" }),
        ];
        if let Some(num) = num.as_deref() {
            form.push(("num", num));
        }

        let body = match self.post_form::<serde_json::Value>(endpoint, &form).await {
            Err(FeedpinError::PinConflict(msg)) if !state => {
                return Err(FeedpinError::Platform(msg));
            }
            other => other?,
        };

        if body.errors.is_empty() {
            return Ok(());
        }
        let detail = format_errors(&body.errors);
        if state {
            Err(FeedpinError::PinConflict(format!("{}: {}", fullname, detail)))
        } else {
            Err(FeedpinError::Platform(format!(
                "unpin {} failed: {}",
                fullname, detail
            )))
        }
    }
}

#[async_trait]
impl Platform for RedditClient {
    async fn get_post(&self, id: &str) -> Result<PlatformPost> {
        let endpoint = format!("/by_id/{}", fullname(id));
        let response = match self
            .send(
                self.request(Method::GET, &endpoint)
                    .query(&[("raw_json", "1")]),
                &endpoint,
            )
            .await
        {
            Ok(response) => response,
            Err(FeedpinError::NotFound(_)) => {
                return Err(FeedpinError::StaleReference(bare_id(id).to_string()))
            }
            Err(e) => return Err(e),
        };

        let listing: Listing<PostData> = response.json().await.map_err(|e| {
            FeedpinError::Platform(format!("invalid response from {}: {}", endpoint, e))
        })?;

        let data = listing
            .data
            .children
            .into_iter()
            .next()
            .map(|child| child.data)
            .ok_or_else(|| FeedpinError::StaleReference(bare_id(id).to_string()))?;

        if data.removed_by_category.is_some() || data.author == "[deleted]" {
            return Err(FeedpinError::StaleReference(data.id));
        }

        Ok(data.into())
    }

    async fn submit_post(&self, post: &NewPost) -> Result<PlatformPost> {
        let endpoint = "/api/submit";
        let mut form = vec![
            ("api_type", "json"),
            ("sr", self.subreddit.as_str()),
            ("kind", "link"),
            ("title", post.title.as_str()),
            ("url", post.url.as_str()),
            ("text", post.text.as_str()),
            ("resubmit", "true"),
            ("flair_text", post.flair.text.as_str()),
        ];
        if let Some(flair_id) = post.flair.id.as_deref() {
            form.push(("flair_id", flair_id));
        }

        let body = self.post_form::<SubmitData>(endpoint, &form).await?;
        if !body.errors.is_empty() {
            return Err(FeedpinError::Platform(format!(
                "submit rejected: {}",
                format_errors(&body.errors)
            )));
        }
        let data = body
            .data
            .ok_or_else(|| FeedpinError::Platform("submit returned no post".to_string()))?;

        info!("Created post {} for {}", data.id, post.url);
        Ok(PlatformPost {
            id: bare_id(&data.id).to_string(),
            url: Some(post.url.clone()),
            title: post.title.clone(),
            author: String::new(),
            is_pinned: false,
        })
    }

    async fn pin(&self, id: &str, position: Option<u32>) -> Result<()> {
        self.set_sticky(id, true, position).await
    }

    async fn unpin(&self, id: &str) -> Result<()> {
        self.set_sticky(id, false, None).await
    }

    async fn recent_posts(&self, limit: usize) -> Result<Vec<PlatformPost>> {
        let endpoint = format!("/r/{}/new", self.subreddit);
        let limit = limit.to_string();
        let response = self
            .send(
                self.request(Method::GET, &endpoint)
                    .query(&[("limit", limit.as_str()), ("raw_json", "1")]),
                &endpoint,
            )
            .await?;

        let listing: Listing<PostData> = response.json().await.map_err(|e| {
            FeedpinError::Platform(format!("invalid response from {}: {}", endpoint, e))
        })?;

        Ok(listing
            .data
            .children
            .into_iter()
            .map(|child| child.data.into())
            .collect())
    }
}

/// `abc` or `t3_abc` → `t3_abc`.
fn fullname(id: &str) -> String {
    format!("{}{}", POST_PREFIX, bare_id(id))
}

/// `t3_abc` or `abc` → `abc`.
fn bare_id(id: &str) -> &str {
    id.strip_prefix(POST_PREFIX).unwrap_or(id)
}

/// Reddit reports form errors as `[[code, message, field], ...]`.
fn format_errors(errors: &[serde_json::Value]) -> String {
    errors
        .iter()
        .map(|e| match e {
            serde_json::Value::Array(parts) => parts
                .iter()
                .filter_map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(": "),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}
