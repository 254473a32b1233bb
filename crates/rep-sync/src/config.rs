//! Sync layer configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where the canonical snapshot lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Local medium. `data_dir: None` keeps everything in memory.
    Local {
        #[serde(default)]
        data_dir: Option<PathBuf>,
    },
    /// Remote HTTP API rooted at `base_url` (for example `http://host/api`).
    Remote {
        base_url: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::Local { data_dir: None }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Extra read-modify-write attempts after a revision conflict.
    pub conflict_retries: u32,
    /// How often to look for writes by other processes. `0` disables it.
    pub external_poll_ms: u64,
    /// Create the starter workout when the store is empty on open.
    pub seed_on_empty: bool,
    /// Last, so TOML writes it as a trailing table.
    pub backend: BackendConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            conflict_retries: 3,
            external_poll_ms: 1000,
            seed_on_empty: false,
            backend: BackendConfig::default(),
        }
    }
}

impl SyncConfig {
    pub fn external_poll_interval(&self) -> Option<Duration> {
        (self.external_poll_ms > 0).then(|| Duration::from_millis(self.external_poll_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_backend_deserializes_with_default_timeout() {
        let config: SyncConfig =
            serde_json::from_str(r#"{"backend":{"kind":"remote","base_url":"http://h/api"}}"#)
                .unwrap();
        assert_eq!(
            config.backend,
            BackendConfig::Remote {
                base_url: "http://h/api".into(),
                timeout_secs: 30
            }
        );
        assert_eq!(config.conflict_retries, 3);
    }

    #[test]
    fn zero_poll_interval_disables_polling() {
        let config = SyncConfig {
            external_poll_ms: 0,
            ..SyncConfig::default()
        };
        assert_eq!(config.external_poll_interval(), None);
        assert_eq!(
            SyncConfig::default().external_poll_interval(),
            Some(Duration::from_secs(1))
        );
    }
}
