use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MarchError, MarchResult};

/// Top-level configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarchConfig {
    pub archive: ArchiveConfig,
    pub log: LogConfig,
}

impl MarchConfig {
    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> MarchResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| MarchError::Config(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would produce unreadable or surprising archives.
    pub fn validate(&self) -> MarchResult<()> {
        let ext = self.archive.extension.as_str();
        if ext.is_empty() || ext.contains(['/', '\\', '.']) {
            return Err(MarchError::Config(format!(
                "archive.extension must be a bare extension without dots or separators, got {ext:?}"
            )));
        }
        if let Some(level) = self.archive.compression_level {
            if !(0..=9).contains(&level) {
                return Err(MarchError::Config(format!(
                    "archive.compression_level must be within 0..=9, got {level}"
                )));
            }
        }
        Ok(())
    }
}

/// Archive creation and extraction behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// File extension of sealed archives, without the dot (default: march)
    pub extension: String,
    /// Delete the source directory after a successful seal (default: true)
    pub remove_source: bool,
    /// Delete the archive after a successful open (default: true)
    pub remove_archive: bool,
    /// Zip entry compression: "deflated" or "stored"
    pub compression: Compression,
    /// Deflate level 0-9 (default: library default)
    pub compression_level: Option<i64>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            extension: "march".into(),
            remove_source: true,
            remove_archive: true,
            compression: Compression::Deflated,
            compression_level: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Deflated,
    Stored,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level filter (default: warn)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}
