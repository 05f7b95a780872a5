use crate::models::{ExtractionResult, SpecFieldSet};
use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Core columns, in export order
pub const CORE_COLUMNS: [&str; 17] = [
    "url",
    "title",
    "location",
    "price",
    "price_numeric",
    "original_price",
    "original_price_numeric",
    "savings",
    "property_type",
    "building_size",
    "land_size",
    "electricity",
    "floors",
    "updated_date",
    "posted_by",
    "description",
    "installment_info",
];

pub const SPECS_TEXT_COLUMN: &str = "specifications_text";
pub const ERROR_COLUMN: &str = "error";
const SPEC_PREFIX: &str = "spec_";
const BACKUP_PREFIX: &str = "backup_";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub type Row = BTreeMap<String, String>;

/// Header order: core columns, the consolidated specification text, sorted
/// `spec_*` columns, every other column sorted, and `error` last
pub fn column_order(rows: &[Row]) -> Vec<String> {
    let mut remaining: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();

    let mut ordered: Vec<String> = Vec::with_capacity(remaining.len());
    for column in CORE_COLUMNS {
        if remaining.remove(column) {
            ordered.push(column.to_string());
        }
    }
    if remaining.remove(SPECS_TEXT_COLUMN) {
        ordered.push(SPECS_TEXT_COLUMN.to_string());
    }

    let has_error = remaining.remove(ERROR_COLUMN);
    let (specs, others): (Vec<&str>, Vec<&str>) =
        remaining.into_iter().partition(|c| c.starts_with(SPEC_PREFIX));
    ordered.extend(specs.into_iter().map(str::to_string));
    ordered.extend(others.into_iter().map(str::to_string));

    if has_error {
        ordered.push(ERROR_COLUMN.to_string());
    }
    ordered
}

/// Keep the first result per URL
pub fn deduplicate(results: Vec<ExtractionResult>) -> Vec<ExtractionResult> {
    let total = results.len();
    let mut seen = HashSet::new();
    let unique: Vec<ExtractionResult> = results
        .into_iter()
        .filter(|r| seen.insert(r.url().to_string()))
        .collect();

    if unique.len() < total {
        info!("Removed {} duplicate properties", total - unique.len());
    }
    unique
}

/// Write results as CSV. If the target cannot be written, one more attempt
/// goes to `backup_<name>` next to it. Returns the path actually written, or
/// `None` when there was nothing to save.
pub fn save_records(results: &[ExtractionResult], path: &Path) -> Result<Option<PathBuf>> {
    if results.is_empty() {
        warn!("No data to save");
        return Ok(None);
    }

    let rows: Vec<Row> = results.iter().map(ExtractionResult::to_row).collect();
    let columns = column_order(&rows);

    match write_rows(&rows, &columns, path) {
        Ok(()) => {
            info!("Saved {} unique property records to {}", rows.len(), path.display());
            info!("CSV includes {} columns", columns.len());
            Ok(Some(path.to_path_buf()))
        }
        Err(e) => {
            error!("Error saving data to CSV {}: {:#}", path.display(), e);
            let Some(backup) = backup_path(path) else {
                return Err(e);
            };
            info!("Trying to save to backup file: {}", backup.display());
            write_rows(&rows, &columns, &backup)
                .with_context(|| format!("Backup save to {} failed", backup.display()))?;
            info!("Saved {} property records to {}", rows.len(), backup.display());
            Ok(Some(backup))
        }
    }
}

/// `dir/name.csv` -> `dir/backup_name.csv`; `None` if already a backup
pub fn backup_path(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    if name.starts_with(BACKUP_PREFIX) {
        return None;
    }
    Some(path.with_file_name(format!("{BACKUP_PREFIX}{name}")))
}

fn write_rows(rows: &[Row], columns: &[String], path: &Path) -> Result<()> {
    let mut writer = bom_writer(path)?;
    writer.write_record(columns)?;
    for row in rows {
        writer.write_record(columns.iter().map(|c| row.get(c).map_or("", String::as_str)))?;
    }
    writer.flush()?;
    Ok(())
}

fn bom_writer(path: &Path) -> Result<csv::Writer<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(UTF8_BOM)?;
    Ok(csv::Writer::from_writer(file))
}

/// One-column listing of every specification label seen
pub fn save_spec_summary(fields: &SpecFieldSet, path: &Path) -> Result<PathBuf> {
    let mut writer = bom_writer(path)?;
    writer.write_record(["Specification Field"])?;
    for field in fields.iter() {
        writer.write_record([field])?;
    }
    writer.flush()?;
    info!("Saved {} specification fields to {}", fields.len(), path.display());
    Ok(path.to_path_buf())
}

/// Labels from an earlier summary file, so a run can report every field seen
/// across sessions
pub fn read_spec_summary(path: &Path) -> Result<SpecFieldSet> {
    Ok(read_records(path)?
        .into_iter()
        .filter_map(|mut row| row.remove("Specification Field"))
        .collect())
}

/// Read an exported CSV back; empty cells are left out of the row
pub fn read_records(path: &Path) -> Result<Vec<Row>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}
