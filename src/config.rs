use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::store::{Store, StoreError};

const CONFIG_KEY: &str = "viewer";

/// Tunables shared by the pipeline and the viewer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Windows at or above this radius skip metadata retrieval entirely.
    pub radius_threshold: usize,
    pub default_radius: usize,
    pub max_radius: usize,
    /// Minimum spacing between consecutive background task starts.
    pub throttle_interval_ms: u64,
    pub index_progress_steps: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            radius_threshold: 150,
            default_radius: 10,
            max_radius: 500,
            throttle_interval_ms: 50,
            index_progress_steps: 100,
        }
    }
}

impl ViewerConfig {
    pub fn throttle_interval(&self) -> Duration {
        Duration::from_millis(self.throttle_interval_ms)
    }

    pub fn load(store: &Store) -> Result<Self, StoreError> {
        Ok(store.load(CONFIG_KEY)?.unwrap_or_default())
    }

    /// Like [`ViewerConfig::load`], but an unreadable file falls back to the
    /// defaults.
    pub fn load_or_default(store: &Store) -> Self {
        Self::load(store).unwrap_or_else(|error| {
            warn!(%error, "ignoring unreadable viewer config");
            Self::default()
        })
    }

    pub fn save(&self, store: &Store) -> Result<(), StoreError> {
        store.save(CONFIG_KEY, self)
    }
}
