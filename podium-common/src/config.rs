//! Configuration loading and path resolution
//!
//! Resolution follows priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// TOML configuration file contents (`~/.config/podium/config.toml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// SQLite database file path
    pub database_path: Option<String>,
    /// Directory holding per-session temporary upload files
    pub temp_dir: Option<String>,
    /// Structural analyzer tuning overrides
    #[serde(default)]
    pub analyzer: AnalyzerOverrides,
}

/// Overridable structural-analyzer tuning values.
///
/// Any field left unset falls back to the compiled default. The values are
/// empirical; they are surfaced here so deployments can adjust them without
/// a rebuild.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzerOverrides {
    /// Confidence when part boundaries come from an extractor hint
    pub confidence_hint: Option<u8>,
    /// Confidence for very short single-part documents
    pub confidence_short_doc: Option<u8>,
    /// Confidence for page-count-only multi-part estimates
    pub confidence_heuristic: Option<u8>,
    /// Confidence when the heuristic cannot decide
    pub confidence_inconclusive: Option<u8>,
    /// Confidence reported for unreadable documents
    pub confidence_unreadable: Option<u8>,
    /// Heuristic divisor: assumed pages per instrument part
    pub pages_per_part: Option<usize>,
    /// Documents at or below this page count are treated as single-part
    pub short_doc_max_pages: Option<usize>,
}

/// Load and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read config failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse config failed ({}): {}", path.display(), e)))
}

/// Load the config file from the default location, if one exists
pub fn load_default_config() -> Result<Option<TomlConfig>> {
    match default_config_path() {
        Some(path) if path.exists() => load_toml_config(&path).map(Some),
        _ => Ok(None),
    }
}

/// Default configuration file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("podium").join("config.toml"))
}

/// Resolve the database path
pub fn resolve_database_path(
    cli_arg: Option<&str>,
    config: Option<&TomlConfig>,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var("PODIUM_DATABASE_PATH") {
        return PathBuf::from(path);
    }

    // Priority 3: TOML config file
    if let Some(path) = config.and_then(|c| c.database_path.as_deref()) {
        return PathBuf::from(path);
    }

    // Priority 4: OS-dependent compiled default
    default_data_dir().join("podium.db")
}

/// Resolve the temp-file directory used for in-flight uploads
pub fn resolve_temp_dir(cli_arg: Option<&str>, config: Option<&TomlConfig>) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var("PODIUM_TEMP_DIR") {
        return PathBuf::from(path);
    }

    if let Some(path) = config.and_then(|c| c.temp_dir.as_deref()) {
        return PathBuf::from(path);
    }

    std::env::temp_dir().join("podium")
}

/// OS-dependent default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("podium"))
        .unwrap_or_else(|| PathBuf::from("./podium_data"))
}
