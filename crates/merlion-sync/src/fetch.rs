//! HTTP fetching with browser-like headers and bounded retry.

use merlion_core::config::RetryPolicy;
use merlion_store::StoreError;
use reqwest::header::{HeaderMap, HeaderValue};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bad URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("document rejected: {0}")]
    Document(String),
}

/// The statute site serves different markup to obvious bots, so requests
/// carry ordinary browser headers.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("accept", HeaderValue::from_static("*/*"));
    headers.insert(
        "user-agent",
        HeaderValue::from_static(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36",
        ),
    );
    headers.insert(
        "accept-language",
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(
        "x-requested-with",
        HeaderValue::from_static("XMLHttpRequest"),
    );
    headers
}

/// HTTP client shared by both pipelines.
pub struct Fetcher {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl Fetcher {
    pub fn new(retry: RetryPolicy) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .default_headers(browser_headers())
            .build()?;
        Ok(Self { client, retry })
    }

    /// GET a page as text, retrying transient failures with a fixed backoff.
    pub async fn get_text(&self, url: &str) -> Result<String, SyncError> {
        let mut last_err = None;
        for attempt in 1..=self.retry.max_attempts {
            match self.get_once(url).await {
                Ok(body) => return Ok(body),
                Err(err) => {
                    if attempt < self.retry.max_attempts {
                        warn!(url, attempt, error = %err, "fetch failed, retrying");
                        tokio::time::sleep(self.retry.backoff).await;
                    }
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or(SyncError::Server {
            status: 0,
            body: "no attempts made".to_string(),
        }))
    }

    /// GET a JSON endpoint, retrying like [`get_text`](Self::get_text).
    pub async fn get_json(&self, url: &str) -> Result<serde_json::Value, SyncError> {
        let body = self.get_text(url).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_once(&self, url: &str) -> Result<String, SyncError> {
        debug!(url, "GET");
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.text().await?)
    }
}
