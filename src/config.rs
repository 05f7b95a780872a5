use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const SITE_ORIGIN: &str = "https://www.rumah123.com";
pub const DEFAULT_START_URL: &str = "https://www.rumah123.com/jual/dki-jakarta/rumah/";

/// Upper bound for a single politeness delay, in seconds
pub const MAX_DELAY_SECS: f64 = 3_600.0;

/// Tunables for fetching and extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    #[serde(default = "default_min_delay")]
    pub min_delay: f64,

    #[serde(default = "default_max_delay")]
    pub max_delay: f64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub retry: RetryPolicy,

    /// Flush interim results after this many listings
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default)]
    pub extract: ExtractOptions,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            min_delay: default_min_delay(),
            max_delay: default_max_delay(),
            timeout_secs: default_timeout_secs(),
            retry: RetryPolicy::default(),
            batch_size: default_batch_size(),
            extract: ExtractOptions::default(),
        }
    }
}

impl ScrapeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Both bounds clamped to `0..=MAX_DELAY_SECS` (NaN counts as 0) and
    /// swapped when given in the wrong order
    pub fn delay_bounds(&self) -> (f64, f64) {
        let lo = clamp_delay(self.min_delay);
        let hi = clamp_delay(self.max_delay);
        if lo <= hi {
            (lo, hi)
        } else {
            (hi, lo)
        }
    }
}

fn clamp_delay(secs: f64) -> f64 {
    if secs.is_nan() {
        0.0
    } else {
        secs.clamp(0.0, MAX_DELAY_SECS)
    }
}

fn default_min_delay() -> f64 {
    2.0
}

fn default_max_delay() -> f64 {
    5.0
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_batch_size() -> usize {
    5
}

/// Exponential backoff with jitter for transient fetch failures
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// `None` retries until cancelled
    pub max_retries: Option<u32>,
    pub base_delay_ms: u64,
    pub jitter_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: Some(5),
            base_delay_ms: 1_000,
            jitter_ms: 1_000,
            max_backoff_ms: 60_000,
        }
    }
}

impl RetryPolicy {
    /// Wait before retry number `attempt` (0-based), given a jitter sample
    pub fn backoff(&self, attempt: u32, jitter_ms: u64) -> Duration {
        let exp = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt.min(32)));
        let total = exp.saturating_add(jitter_ms).min(self.max_backoff_ms);
        Duration::from_millis(total)
    }

    pub fn allows(&self, retries_done: u32) -> bool {
        self.max_retries.map_or(true, |max| retries_done < max)
    }
}

/// Switches for which dynamic columns the extractor emits
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Emit one `spec_*` column per specification label
    pub split_details: bool,
    /// Emit one boolean `facility_*` / `poi_*` column per section item
    pub section_flags: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            split_details: true,
            section_flags: true,
        }
    }
}
