//! Console settings file
//!
//! JSON, read from `--config` or `<config dir>/asyncterm/config.json`.
//! Missing fields fall back to the built-in defaults:
//!
//! ```json
//! {
//!   "startup_message": "Ready",
//!   "raw_mode": true,
//!   "drain_on_shutdown": 2000,
//!   "keys": { "line_terminators": [10, 13], "erase": 127, "interrupt": 3 }
//! }
//! ```

use anyhow::{Context, Result};
use asyncterm_core::ConsoleConfig;
use std::path::{Path, PathBuf};

/// Default settings file location
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("asyncterm").join("config.json"))
}

/// Load settings from `explicit`, else from the default location if present
///
/// An explicit path must exist; the default one is optional.
pub fn load(explicit: Option<&Path>) -> Result<Option<ConsoleConfig>> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(None),
        },
    };
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read settings {}", path.display()))?;
    let config = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid settings in {}", path.display()))?;
    tracing::info!("Loaded settings from {}", path.display());
    Ok(Some(config))
}
