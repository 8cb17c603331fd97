use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use zip::ZipArchive;

use super::export::{EXPORT_FILE_NAME, MAX_EXPORT_SIZE_BYTES, parse_records};
use crate::models::RawConversation;
use crate::utils::validate_file_size;

/// Extension of the archive the chat service hands out for a data export
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Whether `path` names an export archive rather than a bare `conversations.json`
pub fn is_export_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}

/// Whether the zip at `path` holds a `conversations.json` entry
///
/// Only the central directory is read. Unreadable or non-zip files yield `false`.
pub fn archive_contains_export(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    match ZipArchive::new(BufReader::new(file)) {
        Ok(archive) => export_entry_name(&archive).is_some(),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Not a readable zip archive");
            false
        }
    }
}

/// Parse `conversations.json` straight out of an export archive
///
/// The entry may sit at the archive root or inside a folder; the shallowest one
/// wins. Record handling is the same as for
/// [`parse_export_file`](super::parse_export_file).
///
/// # Errors
///
/// Returns an error if the archive cannot be read, has no `conversations.json`,
/// the entry is larger than [`MAX_EXPORT_SIZE_BYTES`] once inflated, or its
/// records fail to parse.
pub fn parse_export_archive(path: &Path) -> Result<Vec<RawConversation>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open export archive: {}", path.display()))?;
    validate_file_size(&file, path, MAX_EXPORT_SIZE_BYTES)?;

    let mut archive = ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("Failed to read zip archive: {}", path.display()))?;
    let Some(name) = export_entry_name(&archive) else {
        bail!("No {} inside archive {}", EXPORT_FILE_NAME, path.display());
    };

    let entry = archive
        .by_name(&name)
        .with_context(|| format!("Failed to open {} in {}", name, path.display()))?;
    if entry.size() > MAX_EXPORT_SIZE_BYTES {
        bail!(
            "Archive entry too large: {} in {} ({} bytes, max {} bytes)",
            name,
            path.display(),
            entry.size(),
            MAX_EXPORT_SIZE_BYTES
        );
    }

    // The declared size can lie, so cap what is actually inflated as well
    let mut contents = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
    entry
        .take(MAX_EXPORT_SIZE_BYTES + 1)
        .read_to_end(&mut contents)
        .with_context(|| format!("Failed to inflate {} in {}", name, path.display()))?;
    if contents.len() as u64 > MAX_EXPORT_SIZE_BYTES {
        bail!("Archive entry too large: {} in {}", name, path.display());
    }

    let source = format!("{}:{}", path.display(), name);
    tracing::debug!(archive = %path.display(), entry = %name, "Reading export from archive");
    let records: Vec<Value> = serde_json::from_slice(&contents)
        .with_context(|| format!("Failed to parse {} as a JSON array", source))?;

    parse_records(records, &source)
}

fn export_entry_name<R: Read + Seek>(archive: &ZipArchive<R>) -> Option<String> {
    archive
        .file_names()
        .filter(|name| !name.ends_with('/') && name.rsplit('/').next() == Some(EXPORT_FILE_NAME))
        .min_by_key(|name| (name.matches('/').count(), name.len()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    use super::*;

    const VALID: &str = r#"[{"id": "c1", "title": "One", "mapping": {"r": {"id": "r", "message": null, "parent": null}}}]"#;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());
        for (name, content) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_is_export_archive() {
        assert!(is_export_archive(Path::new("export.zip")));
        assert!(is_export_archive(Path::new("EXPORT.ZIP")));
        assert!(!is_export_archive(Path::new("conversations.json")));
        assert!(!is_export_archive(Path::new("zip")));
    }

    #[test]
    fn test_parse_archive_root_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("export.zip");
        write_zip(&path, &[("chat.html", "<html></html>"), ("conversations.json", VALID)]);

        let records = parse_export_archive(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].conversation_id(), Some("c1"));
        assert!(archive_contains_export(&path));
    }

    #[test]
    fn test_parse_archive_prefers_shallowest_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("export.zip");
        let nested = VALID.replace("c1", "nested");
        write_zip(
            &path,
            &[("backup/old/conversations.json", nested.as_str()), ("data/conversations.json", VALID)],
        );

        let records = parse_export_archive(&path).unwrap();
        assert_eq!(records[0].conversation_id(), Some("c1"));
    }

    #[test]
    fn test_parse_archive_without_export() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photos.zip");
        write_zip(&path, &[("cat.jpg", "not really")]);

        assert!(!archive_contains_export(&path));
        let err = parse_export_archive(&path).unwrap_err();
        assert!(err.to_string().contains("No conversations.json inside archive"));
    }

    #[test]
    fn test_not_a_zip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.zip");
        std::fs::write(&path, "plain text").unwrap();

        assert!(!archive_contains_export(&path));
        assert!(parse_export_archive(&path).is_err());
    }
}
