use anyhow::{Context, Result};
use hearth_client::ApiConfig;
use hearth_import::{ColumnMapping, CsvUploadOptions};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Contents of `hearth.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiConfig,
    pub csv: CsvUploadOptions,
    pub mapping: ColumnMapping,
    /// Type-matching rules file, relative to the config file.
    pub rules: Option<PathBuf>,
    pub preview_rows: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            csv: CsvUploadOptions::default(),
            mapping: ColumnMapping::default(),
            rules: None,
            preview_rows: 10,
        }
    }
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content).context("Failed to parse settings")?;
        settings.api.validate()?;
        Ok(settings)
    }

    /// Missing files fall back to defaults; unreadable or invalid ones are
    /// errors. A relative `rules` path is resolved against the file's
    /// directory.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut settings = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
        if let (Some(rules), Some(dir)) = (&settings.rules, path.parent()) {
            if rules.is_relative() {
                settings.rules = Some(dir.join(rules));
            }
        }
        Ok(settings)
    }
}
