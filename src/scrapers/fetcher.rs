use crate::config::{RetryPolicy, ScrapeConfig, SITE_ORIGIN};
use crate::scrapers::traits::PageFetcher;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONNECTION, REFERER, USER_AGENT};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.107 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.107 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:90.0) Gecko/20100101 Firefox/90.0",
];

const RETRYABLE_STATUS: [u16; 5] = [429, 500, 502, 503, 504];

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url} returned status {status}")]
    Status { url: String, status: StatusCode },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("fetch of {url} cancelled")]
    Cancelled { url: String },

    #[error("gave up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: String,
    },
}

impl FetchError {
    /// Transport failures and throttling/server statuses are worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => is_retryable_status(*status),
            FetchError::Transport { .. } => true,
            FetchError::Cancelled { .. } | FetchError::RetriesExhausted { .. } => false,
        }
    }
}

pub fn is_retryable_status(status: StatusCode) -> bool {
    RETRYABLE_STATUS.contains(&status.as_u16())
}

fn random_user_agent() -> &'static str {
    USER_AGENTS[rand::rng().random_range(0..USER_AGENTS.len())]
}

/// Blocking-style HTTP fetcher: one request at a time, exponential backoff
/// on transient failures
pub struct HttpFetcher {
    client: Client,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl HttpFetcher {
    pub fn new(config: &ScrapeConfig, cancel: CancellationToken) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            retry: config.retry.clone(),
            cancel,
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, random_user_agent())
            .header(ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9,id;q=0.8")
            .header(REFERER, format!("{SITE_ORIGIN}/"))
            .header(CACHE_CONTROL, "max-age=0")
            .header(CONNECTION, "keep-alive")
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.text().await.map_err(transport)?;
        info!("Received response from {} - Size: {} bytes", url, body.len());
        Ok(body)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut retries = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Err(FetchError::Cancelled { url: url.to_string() });
            }

            let err = match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            if !self.retry.allows(retries) {
                warn!("Max retries ({}) exceeded for {}: {}", retries, url, err);
                return Err(FetchError::RetriesExhausted {
                    url: url.to_string(),
                    attempts: retries + 1,
                    last: err.to_string(),
                });
            }

            let jitter = match self.retry.jitter_ms {
                0 => 0,
                max => rand::rng().random_range(0..max),
            };
            let wait = self.retry.backoff(retries, jitter);
            warn!(
                "Retryable error, attempt {}, retrying in {:?}: {}",
                retries + 1,
                wait,
                err
            );

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("Backoff for {} interrupted", url);
                    return Err(FetchError::Cancelled { url: url.to_string() });
                }
                _ = tokio::time::sleep(wait) => {}
            }
            retries += 1;
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
