use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Result, bail};
use walkdir::WalkDir;

pub use crate::parsers::EXPORT_FILE_NAME;
use crate::parsers::{archive_contains_export, is_export_archive};

/// How far below the search root an export may sit
/// (`Downloads/<unpacked archive>/conversations.json` is depth 2)
const MAX_SEARCH_DEPTH: usize = 3;

/// Find the most recently modified export below `dir`
///
/// An export is either a downloaded `.zip` archive holding a
/// `conversations.json`, or an unpacked `conversations.json`. Zips without one
/// are passed over, so an unrelated newer download does not hide the export.
/// Symlinks are not followed. Entries that cannot be read are skipped.
///
/// # Errors
///
/// Returns an error if `dir` is not a directory or contains no export.
pub fn find_latest_export(dir: &Path) -> Result<PathBuf> {
    if !dir.is_dir() {
        bail!("Export search directory not found: {}", dir.display());
    }

    let mut candidates: Vec<(SystemTime, PathBuf)> = WalkDir::new(dir)
        .max_depth(MAX_SEARCH_DEPTH)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_type().is_file()
                && (e.file_name() == EXPORT_FILE_NAME || is_export_archive(e.path()))
        })
        .filter_map(|e| {
            let modified = e.metadata().ok()?.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            Some((modified, e.into_path()))
        })
        .collect();
    // Newest first
    candidates.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));

    let latest = candidates
        .into_iter()
        .map(|(_, path)| path)
        .find(|path| !is_export_archive(path) || archive_contains_export(path));

    match latest {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Found export");
            Ok(path)
        }
        None => bail!(
            "No export archive or {} found under {}",
            EXPORT_FILE_NAME,
            dir.display()
        ),
    }
}
