use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::Value;

use crate::models::RawConversation;
use crate::utils::validate_file_size;

/// File name of the conversation list inside an export archive
pub const EXPORT_FILE_NAME: &str = "conversations.json";

/// Exports larger than this are refused before parsing
pub const MAX_EXPORT_SIZE_BYTES: u64 = 512 * 1024 * 1024;

/// Parse a `conversations.json` export file into raw conversation records
/// Gracefully handles malformed records by logging and skipping them
/// Returns an error if the file is not a JSON array or more than 50% of records fail
pub fn parse_export_file(path: &Path) -> Result<Vec<RawConversation>> {
    // Open first and check the size on the same handle
    let file = File::open(path)
        .with_context(|| format!("Failed to open export file: {}", path.display()))?;
    validate_file_size(&file, path, MAX_EXPORT_SIZE_BYTES)?;

    let reader = BufReader::new(file);
    let records: Vec<Value> = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse export file {} as a JSON array", path.display()))?;

    parse_records(records, &path.display().to_string())
}

/// Parse an export held in memory
pub fn parse_export_str(json: &str) -> Result<Vec<RawConversation>> {
    let records: Vec<Value> =
        serde_json::from_str(json).context("Failed to parse export as a JSON array")?;
    parse_records(records, "<memory>")
}

pub(crate) fn parse_records(records: Vec<Value>, source: &str) -> Result<Vec<RawConversation>> {
    let total = records.len();
    let mut conversations = Vec::with_capacity(total);
    let mut skipped_count = 0;

    for (position, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<RawConversation>(record) {
            Ok(conversation) => conversations.push(conversation),
            Err(e) => {
                tracing::warn!(
                    source,
                    record = position,
                    error = %e,
                    "Skipping malformed conversation record"
                );
                skipped_count += 1;
            }
        }
    }

    // Check if failure rate is too high
    if total > 0 {
        let failure_rate = (skipped_count as f64) / (total as f64);
        if failure_rate > 0.5 {
            bail!(
                "Too many malformed records in {}: {} of {} failed ({:.1}%)",
                source,
                skipped_count,
                total,
                failure_rate * 100.0
            );
        }
    }

    if skipped_count > 0 {
        tracing::warn!(
            source,
            parsed = conversations.len(),
            skipped = skipped_count,
            "Parsed export with skipped records"
        );
    } else {
        tracing::debug!(source, parsed = conversations.len(), "Parsed export");
    }

    Ok(conversations)
}
