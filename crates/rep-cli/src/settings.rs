//! User settings - persisted preferences for the `rep` binary.
//!
//! Settings live in `settings.toml` under the platform config directory. A
//! missing or unreadable file is treated as defaults.

use std::path::{Path, PathBuf};

use anyhow::Context;
use directories::ProjectDirs;
use rep_sync::{BackendConfig, SyncConfig};
use serde::{Deserialize, Serialize};

const SETTINGS_FILE: &str = "settings.toml";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "Rep", "rep")
}

/// Application settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Storage backend and sync behaviour.
    pub sync: SyncConfig,

    pub display: DisplaySettings,
}

impl Settings {
    /// Load settings from the default path.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load settings from a specific path, falling back to defaults.
    pub fn load_from(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "No settings file; using defaults");
                return Self::default();
            }
        };
        toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring malformed settings");
            Self::default()
        })
    }

    /// Save settings to a specific path, creating its directory.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create config directory {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("failed to serialize settings")?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write settings to {}", path.display()))
    }

    /// Default settings file location.
    pub fn config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
    }

    /// Replaces the configured backend with a command-line choice.
    pub fn override_backend(&mut self, data_dir: Option<PathBuf>, remote: Option<String>) {
        if let Some(base_url) = remote {
            let timeout_secs = match &self.sync.backend {
                BackendConfig::Remote { timeout_secs, .. } => *timeout_secs,
                BackendConfig::Local { .. } => 30,
            };
            self.sync.backend = BackendConfig::Remote {
                base_url,
                timeout_secs,
            };
        } else if let Some(dir) = data_dir {
            self.sync.backend = BackendConfig::Local {
                data_dir: Some(dir),
            };
        }
    }

    /// The sync configuration to open. A local backend without a directory
    /// is pointed at the platform data directory, so the log persists between
    /// runs.
    pub fn resolved_sync(&self) -> SyncConfig {
        let mut sync = self.sync.clone();
        if let BackendConfig::Local { data_dir: None } = sync.backend
            && let Some(dirs) = project_dirs()
        {
            sync.backend = BackendConfig::Local {
                data_dir: Some(dirs.data_dir().to_path_buf()),
            };
        }
        sync
    }
}

/// Unit shown next to weights. Stored numbers are never converted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Lbs,
    Kg,
}

impl WeightUnit {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Lbs => "lbs",
            Self::Kg => "kg",
        }
    }
}

/// How tables are rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub weight_unit: WeightUnit,
    /// `chrono` format string for workout dates.
    pub date_format: String,
    /// Maximum table width in columns.
    pub table_width: u16,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            weight_unit: WeightUnit::default(),
            date_format: "%Y-%m-%d".to_string(),
            table_width: 100,
        }
    }
}
