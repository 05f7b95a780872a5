//! Merges the link files of every scraping session into increment files.
//!
//! `<root>/combined_links/combined_property_links_NN.txt` each hold only the
//! links first seen by one accumulation run. Taken together they are the
//! duplicate-free set of every link ever harvested; nothing is rewritten.

use crate::session::{read_links, SESSION_LINKS_FILE};
use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const COMBINED_DIR: &str = "combined_links";
const INCREMENT_PREFIX: &str = "combined_property_links_";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccumulationReport {
    pub sessions_processed: usize,
    pub previous_total: usize,
    pub new_links: usize,
    pub overall_total: usize,
    /// Increment file written by this run, if any
    pub created: Option<PathBuf>,
}

impl AccumulationReport {
    pub fn log(&self) {
        info!("Session folders processed : {}", self.sessions_processed);
        info!("Previously combined links : {}", self.previous_total);
        info!("New links this run        : {}", self.new_links);
        info!("Overall total links       : {}", self.overall_total);
        match &self.created {
            Some(path) => info!("New increment file        : {}", path.display()),
            None => info!("No new links found, no increment file created"),
        }
    }
}

lazy_static! {
    static ref INCREMENT_FILE: Regex =
        Regex::new(&format!(r"^{INCREMENT_PREFIX}(\d+)\.txt$")).unwrap();
}

/// Increment files already in `dir` with their numeric suffix. A suffix too
/// large for `u64` is `None`: the file's links still count as combined, but
/// it takes no part in numbering.
fn increment_files(dir: &Path) -> Result<Vec<(Option<u64>, PathBuf)>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(caps) = name.to_str().and_then(|n| INCREMENT_FILE.captures(n)) else {
            continue;
        };
        found.push((caps[1].parse::<u64>().ok(), entry.path()));
    }
    found.sort();
    Ok(found)
}

pub fn increment_file_name(index: u64) -> String {
    format!("{INCREMENT_PREFIX}{index:02}.txt")
}

/// Collect links from every session directory under `root` that no earlier
/// increment file holds, and write them (sorted) to the next increment file.
/// Writes nothing when there is nothing new.
pub fn combine_session_links(root: &Path) -> Result<AccumulationReport> {
    let combined_dir = root.join(COMBINED_DIR);
    fs::create_dir_all(&combined_dir)
        .with_context(|| format!("Failed to create {}", combined_dir.display()))?;

    let increments = increment_files(&combined_dir)?;
    let mut previous: HashSet<String> = HashSet::new();
    for (_, path) in &increments {
        previous.extend(read_links(path)?);
    }

    let mut sessions: Vec<PathBuf> = fs::read_dir(root)
        .with_context(|| format!("Failed to list {}", root.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name() != COMBINED_DIR)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    sessions.sort();

    let mut fresh: BTreeSet<String> = BTreeSet::new();
    let mut sessions_processed = 0;
    for session in sessions {
        let links_file = session.join(SESSION_LINKS_FILE);
        if !links_file.is_file() {
            continue;
        }
        sessions_processed += 1;
        fresh.extend(
            read_links(&links_file)?
                .into_iter()
                .filter(|link| !previous.contains(link)),
        );
    }

    let created = if fresh.is_empty() {
        None
    } else {
        let last = increments.iter().filter_map(|(index, _)| *index).max().unwrap_or(0);
        let next = last
            .checked_add(1)
            .with_context(|| format!("No increment number left after {last}"))?;
        let path = combined_dir.join(increment_file_name(next));
        let mut body = String::new();
        for link in &fresh {
            body.push_str(link);
            body.push('\n');
        }
        fs::write(&path, body).with_context(|| format!("Failed to write {}", path.display()))?;
        Some(path)
    };

    Ok(AccumulationReport {
        sessions_processed,
        previous_total: previous.len(),
        new_links: fresh.len(),
        overall_total: previous.len() + fresh.len(),
        created,
    })
}
