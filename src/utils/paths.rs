use std::borrow::Cow;
use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use percent_encoding::{AsciiSet, CONTROLS, NON_ALPHANUMERIC, percent_encode, utf8_percent_encode};

/// Upper bound on the byte length of a sanitized file stem
pub const MAX_FILE_STEM_BYTES: usize = 120;

// Characters that are illegal in file names on at least one common platform,
// plus '%' itself so the escaping stays reversible
const FILE_NAME_SET: &AsciiSet = &CONTROLS
    .add(b'<')
    .add(b'>')
    .add(b':')
    .add(b'"')
    .add(b'/')
    .add(b'\\')
    .add(b'|')
    .add(b'?')
    .add(b'*')
    .add(b'%');

const RESERVED_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Derives a file-system safe stem from arbitrary text
///
/// Illegal characters are percent-escaped rather than replaced, so two different
/// inputs only collide when truncation cuts away their difference. Leading and
/// trailing whitespace, a leading dot, a trailing dot, and Windows device names
/// are escaped as well. Non-ASCII text is kept as is.
///
/// Returns `"untitled"` for empty input; never returns an empty string.
///
/// # Examples
///
/// ```
/// use chat_export_analyzer::utils::sanitize_file_stem;
///
/// assert_eq!(sanitize_file_stem("a/b: c?"), "a%2Fb%3A c%3F");
/// assert_eq!(sanitize_file_stem("100%"), "100%25");
/// ```
pub fn sanitize_file_stem(raw: &str) -> String {
    if raw.is_empty() {
        return "untitled".to_string();
    }
    // Byte range of the text between outer whitespace
    let inner_start = raw.len() - raw.trim_start().len();
    let inner_end = raw.trim_end().len();

    // Room for the trailing-character and device-name escapes below
    let budget = MAX_FILE_STEM_BYTES - 4;
    let mut stem = String::with_capacity(raw.len().min(MAX_FILE_STEM_BYTES));
    let mut last_piece_len = 0;

    for (offset, ch) in raw.char_indices() {
        let mut buf = [0u8; 4];
        let encoded = ch.encode_utf8(&mut buf);
        let outer = offset < inner_start || offset >= inner_end;
        let piece: Cow<str> = if offset == 0 && ch == '.' {
            Cow::Borrowed("%2E")
        } else if ch.is_control() || (outer && ch.is_whitespace()) {
            Cow::Owned(percent_encode(encoded.as_bytes(), NON_ALPHANUMERIC).to_string())
        } else if ch.is_ascii() {
            Cow::from(utf8_percent_encode(encoded, FILE_NAME_SET))
        } else {
            Cow::Borrowed(&*encoded)
        };

        if stem.len() + piece.len() > budget {
            break;
        }
        stem.push_str(&piece);
        last_piece_len = piece.len();
    }

    // Windows strips trailing dots and spaces, which would merge distinct names
    if last_piece_len == 1 && (stem.ends_with('.') || stem.ends_with(' ')) {
        let last = stem.pop().map(|c| c as u8).unwrap_or(b'.');
        stem.push_str(&format!("%{:02X}", last));
    }

    // Device names are reserved with any extension, so escape the first letter
    if is_reserved_device_name(&stem) {
        let first = stem.remove(0);
        stem.insert_str(0, &format!("%{:02X}", first as u32));
    }

    stem
}

fn is_reserved_device_name(stem: &str) -> bool {
    let base = stem.split('.').next().unwrap_or(stem);
    RESERVED_DEVICE_NAMES.iter().any(|name| name.eq_ignore_ascii_case(base))
}

/// Validates that a file's size is within `max_bytes`
///
/// Takes an open file handle to avoid TOCTOU (time-of-check-time-of-use)
/// race conditions where the file could be modified between the size check
/// and subsequent file operations.
///
/// # Errors
///
/// Returns an error if:
/// - The file metadata cannot be read
/// - The file is larger than `max_bytes`
pub fn validate_file_size(file: &File, path: &Path, max_bytes: u64) -> Result<()> {
    let metadata = file
        .metadata()
        .with_context(|| format!("Failed to read file metadata: {}", path.display()))?;

    let file_size = metadata.len();
    if file_size > max_bytes {
        bail!("File too large: {} ({} bytes, max {} bytes)", path.display(), file_size, max_bytes);
    }

    Ok(())
}

/// Writes `contents` to `path` through a temp file in the same directory and a
/// rename, so readers never observe a partially written file. The temp file is
/// removed if any step fails.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .with_context(|| format!("Output path has no file name: {}", path.display()))?;
    let temp_path = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    let result = (|| -> Result<()> {
        let mut file = File::create(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
        file.write_all(contents)
            .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;
        file.sync_all()
            .with_context(|| format!("Failed to flush temp file: {}", temp_path.display()))?;
        fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to move temp file into place: {}", path.display()))?;
        Ok(())
    })();

    if result.is_err() && temp_path.exists() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// Formats a path with ~ substitution for the home directory
///
/// # Examples
///
/// ```no_run
/// use std::path::PathBuf;
/// use chat_export_analyzer::utils::format_path_with_tilde;
///
/// let path = PathBuf::from("/Users/alice/Downloads/conversations.json");
/// // Returns "~/Downloads/conversations.json" if HOME=/Users/alice
/// let formatted = format_path_with_tilde(&path);
/// ```
pub fn format_path_with_tilde(path: &Path) -> String {
    format_path_with_tilde_internal(path, None)
}

/// Internal helper for path formatting with optional home override (for testing)
pub(crate) fn format_path_with_tilde_internal(path: &Path, home_override: Option<&str>) -> String {
    let home_from_env = env::var("HOME").ok();
    let home = home_override.or(home_from_env.as_deref());

    let path_str = path.to_string_lossy();
    if let Some(home) = home
        && path_str.starts_with(home)
    {
        return path_str.replacen(home, "~", 1);
    }

    path_str.into_owned()
}
