//! Configuration resolution for podium-si
//!
//! Assembles the runtime configuration from CLI flags, environment
//! variables, and the shared TOML config file, in that priority order.

use std::path::PathBuf;

use crate::services::pdf_analyzer::AnalyzerTuning;
use podium_common::config as common_config;
use podium_common::Result;

/// Fully resolved runtime configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub database_path: PathBuf,
    pub temp_dir: PathBuf,
    pub tuning: AnalyzerTuning,
}

impl ResolvedConfig {
    /// Resolve from CLI overrides plus the default config file (if any).
    pub fn resolve(cli_db: Option<&str>, cli_temp_dir: Option<&str>) -> Result<Self> {
        let file = common_config::load_default_config()?;

        let tuning = file
            .as_ref()
            .map(|c| AnalyzerTuning::with_overrides(&c.analyzer))
            .unwrap_or_default();

        Ok(Self {
            database_path: common_config::resolve_database_path(cli_db, file.as_ref()),
            temp_dir: common_config::resolve_temp_dir(cli_temp_dir, file.as_ref()),
            tuning,
        })
    }
}
