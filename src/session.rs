use crate::models::{ExtractionResult, LinkSet};
use anyhow::{Context, Result};
use chrono::Local;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const SESSION_LINKS_FILE: &str = "property_links.txt";
pub const LOG_FILE: &str = "scraping.log";
pub const FINAL_CSV: &str = "rumah123_properties_final.csv";
pub const SPECS_SUMMARY_CSV: &str = "property_specifications_summary.csv";
pub const RAW_DIR: &str = "raw_scrape";

/// `YYYYmmdd_HHMMSS`, used in session and interim file names
pub fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Output directory of one run
#[derive(Debug, Clone)]
pub struct SessionDir {
    root: PathBuf,
}

impl SessionDir {
    /// Create `<results>/scraping_session_<timestamp>`
    pub fn create(results: &Path) -> Result<Self> {
        let root = results.join(format!("scraping_session_{}", timestamp()));
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create session directory {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn links_file(&self) -> PathBuf {
        self.root.join(SESSION_LINKS_FILE)
    }

    pub fn log_file(&self) -> PathBuf {
        self.root.join(LOG_FILE)
    }

    pub fn final_csv(&self) -> PathBuf {
        self.root.join(FINAL_CSV)
    }

    pub fn specs_summary(&self) -> PathBuf {
        self.root.join(SPECS_SUMMARY_CSV)
    }

    pub fn interim_csv(&self) -> PathBuf {
        self.root.join(format!("interim_results_{}.csv", timestamp()))
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.root.join(RAW_DIR)
    }

    /// Pretty JSON dump of every extracted listing, one file per listing
    /// named after the last segment of its URL. Error records are skipped.
    pub fn save_raw(&self, results: &[ExtractionResult]) -> Result<usize> {
        let dir = self.raw_dir();
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;

        let mut used = HashSet::new();
        let mut saved = 0;
        for result in results {
            let ExtractionResult::Listing(record) = result else {
                continue;
            };
            let base = listing_slug(&record.url);
            let mut name = base.clone();
            let mut n = 1;
            while !used.insert(name.clone()) {
                n += 1;
                name = format!("{base}_{n}");
            }

            let path = dir.join(format!("{name}.json"));
            let json = serde_json::to_string_pretty(record)?;
            fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            saved += 1;
        }
        info!("Saved {} individual property files to {}", saved, dir.display());
        Ok(saved)
    }
}

/// `https://www.rumah123.com/properti/depok/hos123/` -> `hos123`
pub fn listing_slug(url: &str) -> String {
    let last = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    let slug: String = last
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if slug.trim_matches('_').is_empty() {
        "listing".to_string()
    } else {
        slug
    }
}

/// One URL per line, in first-seen order
pub fn write_links(links: &LinkSet, path: &Path) -> Result<()> {
    let mut body = String::new();
    for link in links.iter() {
        body.push_str(link);
        body.push('\n');
    }
    fs::write(path, body).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Saved {} links to {}", links.len(), path.display());
    Ok(())
}

/// Trimmed, non-empty lines of a link file
pub fn read_links(path: &Path) -> Result<Vec<String>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
