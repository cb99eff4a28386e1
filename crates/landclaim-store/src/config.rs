use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Configuration for a flat-file data store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding `ClaimData/` and `PlayerData/`.
    pub root: PathBuf,
    /// Extra attempts when a player file reads back incomplete.
    pub player_read_retries: u32,
    /// Pause between player read attempts, in milliseconds.
    pub player_retry_pause_ms: u64,
    /// File extension of structured claim documents.
    pub claim_extension: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            player_read_retries: 5,
            player_retry_pause_ms: 5,
            claim_extension: "json".to_string(),
        }
    }
}

impl StoreConfig {
    /// Default configuration rooted at `root`.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    pub fn player_retry_pause(&self) -> Duration {
        Duration::from_millis(self.player_retry_pause_ms)
    }

    /// Parse from TOML. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        toml::from_str(s).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
