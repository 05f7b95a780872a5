use crate::scrapers::fetcher::FetchError;
use async_trait::async_trait;

/// Source of raw page markup.
/// The HTTP client implements it; tests swap in canned pages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the markup at `url`, retrying transient failures
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;

    /// Get the name of the fetcher, for logs
    fn name(&self) -> &'static str;
}
