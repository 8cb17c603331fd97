use std::path::PathBuf;

use anyhow::{Context, Result};

const APP_DIR_NAME: &str = "chat-export-analyzer";
const CONFIG_FILE_NAME: &str = "config.json";

/// Default location of the user configuration file
/// (`<config dir>/chat-export-analyzer/config.json`)
pub fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().context("Failed to determine the user config directory")?;
    Ok(config_dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Directory searched for an export when none is given (the user's downloads)
pub fn default_export_search_dir() -> Result<PathBuf> {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .context("Failed to determine the downloads directory")
}

/// Default directory for generated files (`~/Documents/chat-export-analyzer`)
pub fn default_output_dir() -> Result<PathBuf> {
    let base = dirs::document_dir()
        .or_else(dirs::home_dir)
        .context("Failed to determine a default output directory")?;
    Ok(base.join(APP_DIR_NAME))
}
