//! User configuration (`config.json`)
//!
//! Every field is optional; missing fields take their defaults. Command-line
//! flags override whatever the file says.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::AuthorHeaders;
use crate::render::MarkdownOptions;
use crate::utils::{default_config_path, validate_file_size};

const MAX_CONFIG_SIZE_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: String::from("warn") }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    pub yaml_header: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self { yaml_header: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Export to load when `--export` is not given
    pub export_path: Option<PathBuf>,
    /// Directory searched for the newest export archive or `conversations.json` when neither
    /// `--export` nor `export_path` is set (defaults to the downloads directory)
    pub export_search_dir: Option<PathBuf>,
    /// Where generated files go when `--out` is not given
    pub output_dir: Option<PathBuf>,
    pub author_headers: AuthorHeaders,
    pub markdown: MarkdownConfig,
    /// Added to the built-in stop word list
    pub stopwords: Vec<String>,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load the configuration
    ///
    /// An explicit `path` must exist. Without one, the default location is tried
    /// and a missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = default_config_path()?;
                if default_path.is_file() {
                    Self::from_file(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        validate_file_size(&file, path, MAX_CONFIG_SIZE_BYTES)?;

        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn markdown_options(&self) -> MarkdownOptions {
        MarkdownOptions {
            headers: self.author_headers.clone(),
            yaml_header: self.markdown.yaml_header,
        }
    }
}
