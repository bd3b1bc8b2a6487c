//! Reddit search client (client-credentials OAuth).

use std::time::Duration;

use async_trait::async_trait;
use pitsent_core::RedditConfig;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::Mutex;

use super::SearchSource;
use crate::error::SearchError;
use crate::types::{RawPost, SearchPage, SearchQuery};

const DEFAULT_AUTH_BASE: &str = "https://www.reddit.com";
const DEFAULT_API_BASE: &str = "https://oauth.reddit.com";

/// Reddit OAuth token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Reddit search listing wrapper.
#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<Child>,
    after: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: PostData,
}

#[derive(Debug, Deserialize)]
struct PostData {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    author: Option<String>,
    #[serde(default)]
    subreddit: String,
    created_utc: f64,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: i64,
    #[serde(default)]
    url: String,
}

impl PostData {
    #[allow(clippy::cast_possible_truncation)]
    fn into_raw(self) -> RawPost {
        let body = match self.selftext.as_str() {
            "[deleted]" | "[removed]" => String::new(),
            _ => self.selftext,
        };
        RawPost {
            id: self.id,
            title: self.title,
            body,
            author: self.author.filter(|a| a != "[deleted]"),
            forum: self.subreddit,
            created_utc: self.created_utc.floor() as i64,
            score: self.score,
            num_comments: self.num_comments,
            url: self.url,
        }
    }
}

/// Reddit API client. The access token is fetched on first use and
/// refreshed once when the API answers 401.
pub struct RedditSearchClient {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    user_agent: String,
    auth_base: String,
    api_base: String,
    token: Mutex<Option<String>>,
}

impl RedditSearchClient {
    /// Create a client pointed at the public Reddit endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Unexpected`] if the HTTP client cannot be built.
    pub fn new(config: &RedditConfig, timeout_secs: u64) -> Result<Self, SearchError> {
        Self::with_base_urls(config, timeout_secs, DEFAULT_AUTH_BASE, DEFAULT_API_BASE)
    }

    /// Create a client with overridden endpoints. Used by tests to target a
    /// mock server.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Unexpected`] if the HTTP client cannot be built.
    pub fn with_base_urls(
        config: &RedditConfig,
        timeout_secs: u64,
        auth_base: &str,
        api_base: &str,
    ) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SearchError::Unexpected(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            user_agent: config.user_agent.clone(),
            auth_base: auth_base.trim_end_matches('/').to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            token: Mutex::new(None),
        })
    }

    async fn fetch_token(&self) -> Result<String, SearchError> {
        let response = self
            .client
            .post(format!("{}/api/v1/access_token", self.auth_base))
            .header("User-Agent", &self.user_agent)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::RateLimited {
                retry_after_secs: retry_after_secs(response.headers()),
            });
        }
        if status.is_server_error() {
            return Err(SearchError::Transient(format!(
                "token exchange failed with status {status}"
            )));
        }
        if !status.is_success() {
            return Err(SearchError::Auth(format!(
                "token exchange failed with status {status}"
            )));
        }

        let token_resp: TokenResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Auth(format!("token parse error: {e}")))?;

        Ok(token_resp.access_token)
    }

    /// Return the cached token, exchanging credentials if there is none.
    async fn token(&self, force_refresh: bool) -> Result<String, SearchError> {
        let mut guard = self.token.lock().await;
        if !force_refresh {
            if let Some(token) = guard.as_ref() {
                return Ok(token.clone());
            }
        }
        let token = self.fetch_token().await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    async fn send_search(
        &self,
        token: &str,
        query: &SearchQuery,
        after: Option<&str>,
    ) -> Result<reqwest::Response, SearchError> {
        let mut params: Vec<(&str, String)> = vec![
            ("q", query.query.clone()),
            ("sort", query.sort.as_str().to_string()),
            ("t", query.time_filter.as_str().to_string()),
            ("limit", query.limit.to_string()),
            ("restrict_sr", "false".to_string()),
            ("type", "link".to_string()),
            ("raw_json", "1".to_string()),
        ];
        if let Some(cursor) = after {
            params.push(("after", cursor.to_string()));
        }

        let response = self
            .client
            .get(format!("{}/r/all/search", self.api_base))
            .header("Authorization", format!("Bearer {token}"))
            .header("User-Agent", &self.user_agent)
            .query(&params)
            .send()
            .await?;

        Ok(response)
    }
}

#[async_trait]
impl SearchSource for RedditSearchClient {
    async fn search(
        &self,
        query: &SearchQuery,
        after: Option<&str>,
    ) -> Result<SearchPage, SearchError> {
        let token = self.token(false).await?;
        let mut response = self.send_search(&token, query, after).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::debug!("reddit token rejected, refreshing");
            let token = self.token(true).await?;
            response = self.send_search(&token, query, after).await?;
            if response.status() == StatusCode::UNAUTHORIZED {
                return Err(SearchError::Auth(
                    "search rejected after token refresh".to_string(),
                ));
            }
        }

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::RateLimited {
                retry_after_secs: retry_after_secs(response.headers()),
            });
        }
        if status.is_server_error() {
            return Err(SearchError::Transient(format!(
                "reddit search failed with status {status}"
            )));
        }
        if !status.is_success() {
            return Err(SearchError::Unexpected(format!(
                "reddit search failed with status {status}"
            )));
        }

        let listing: Listing = response
            .json()
            .await
            .map_err(|e| SearchError::Unexpected(format!("reddit response parse error: {e}")))?;

        Ok(SearchPage {
            posts: listing
                .data
                .children
                .into_iter()
                .map(|child| child.data.into_raw())
                .collect(),
            after: listing.data.after.filter(|a| !a.is_empty()),
        })
    }
}

/// Seconds to wait from `Retry-After`, falling back to Reddit's
/// `x-ratelimit-reset`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    ["retry-after", "x-ratelimit-reset"].iter().find_map(|name| {
        let raw = headers.get(*name)?.to_str().ok()?.trim();
        let secs = raw.parse::<f64>().ok()?;
        (secs.is_finite() && secs >= 0.0).then(|| secs.ceil() as u64)
    })
}
