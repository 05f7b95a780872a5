use crate::config::ScrapeConfig;
use crate::export::save_records;
use crate::extract::extract_listing;
use crate::extract::links::{harvest_links, origin_of, page_url};
use crate::models::{ExtractionResult, LinkSet, SpecFieldSet};
use crate::scrapers::fetcher::FetchError;
use crate::scrapers::traits::PageFetcher;
use crate::scrapers::types::SearchParams;
use crate::session::SessionDir;
use anyhow::Result;
use rand::Rng;
use std::collections::HashSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Sequential rumah123 scraper: walks index pages for links, then visits
/// each listing with a random pause between requests
pub struct Rumah123Scraper<F: PageFetcher> {
    fetcher: F,
    config: ScrapeConfig,
    cancel: CancellationToken,
}

impl<F: PageFetcher> Rumah123Scraper<F> {
    pub fn new(fetcher: F, config: ScrapeConfig, cancel: CancellationToken) -> Self {
        Self {
            fetcher,
            config,
            cancel,
        }
    }

    /// Sleep a uniform random delay; false if cancelled meanwhile
    async fn pause(&self, before: &str) -> bool {
        let (lo, hi) = self.config.delay_bounds();
        let secs = if hi > lo {
            rand::rng().random_range(lo..=hi)
        } else {
            lo
        };
        info!("Waiting {:.2} seconds before next {}", secs, before);

        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(Duration::from_secs_f64(secs)) => true,
        }
    }

    /// Collect listing links from `params.pages` index pages, keeping
    /// first-seen order. A page that fails to load contributes nothing.
    pub async fn harvest_links(&self, params: &SearchParams) -> Result<LinkSet> {
        let origin = origin_of(&params.start_url)?;
        let pages = params.page_numbers();
        let end = pages.end;
        let mut links = LinkSet::new();

        for page in pages {
            if self.cancel.is_cancelled() {
                warn!("Link harvesting interrupted before page {}", page);
                break;
            }
            info!(
                "Scraping page {} (page {} of {} requested)...",
                page,
                page - params.start_page + 1,
                params.pages
            );

            let url = page_url(&params.start_url, page);
            info!("Retrieving listing page: {}", url);
            match self.fetcher.fetch(&url).await {
                Ok(html) => match harvest_links(&html, &origin) {
                    Ok(found) => {
                        info!("Found {} unique property links on {}", found.len(), url);
                        let added = links.extend(found);
                        info!("Added {} new unique links from page {}", added, page);
                    }
                    Err(e) => error!("Error extracting links from {}: {:#}", url, e),
                },
                Err(FetchError::Cancelled { .. }) => break,
                Err(e) => error!("Error retrieving {}: {}", url, e),
            }

            if page + 1 < end && !self.pause("page").await {
                break;
            }
        }

        info!("Total unique links found: {}", links.len());
        Ok(links)
    }

    /// Fetch and extract one listing; failures become error records
    pub async fn scrape_listing(&self, url: &str, fields: &mut SpecFieldSet) -> ExtractionResult {
        match self.fetcher.fetch(url).await {
            Ok(html) => extract_listing(&html, url, &self.config.extract, fields),
            Err(e) => {
                error!("Error extracting details from {} via {}: {}", url, self.fetcher.name(), e);
                ExtractionResult::failed(url, e)
            }
        }
    }

    /// Scrape every link once, flushing everything gathered so far to an
    /// interim CSV every `batch_size` listings and at the end
    pub async fn scrape_listings(
        &self,
        links: &[String],
        fields: &mut SpecFieldSet,
        interim: Option<&SessionDir>,
    ) -> Vec<ExtractionResult> {
        let batch_size = self.config.batch_size.max(1);
        let mut seen: HashSet<&str> = HashSet::new();
        let mut results = Vec::new();

        for (i, link) in links.iter().enumerate() {
            if self.cancel.is_cancelled() {
                break;
            }
            if !seen.insert(link.as_str()) {
                info!("Skipping already scraped URL: {}", link);
                continue;
            }
            if !results.is_empty() && !self.pause("property").await {
                break;
            }

            info!("Scraping property {}/{}: {}", i + 1, links.len(), link);
            let result = self.scrape_listing(link, fields).await;
            if result.is_error() && self.cancel.is_cancelled() {
                debug!("Dropping result for {} cut short by cancellation", link);
                break;
            }
            results.push(result);

            if results.len() % batch_size == 0 {
                self.flush(&results, interim);
            }
        }

        if self.cancel.is_cancelled() {
            warn!("Scraping interrupted after {} properties", results.len());
        }
        self.flush(&results, interim);

        let failed = results.iter().filter(|r| r.is_error()).count();
        info!(
            "Successfully scraped {} unique properties ({} with errors)",
            results.len(),
            failed
        );
        results
    }

    fn flush(&self, results: &[ExtractionResult], interim: Option<&SessionDir>) {
        let Some(session) = interim else {
            return;
        };
        match save_records(results, &session.interim_csv()) {
            Ok(Some(path)) => info!("Saved interim results to {}", path.display()),
            Ok(None) => {}
            Err(e) => error!("Failed to save interim results: {:#}", e),
        }
    }
}
