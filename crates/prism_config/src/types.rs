//! Configuration types deserialized from `prism.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level cache configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Settings for the in-process tier.
    pub general_purpose: GeneralPurposeConfig,
    /// Settings for the cross-process tier.
    pub persistent: PersistentConfig,
}

impl CacheConfig {
    /// Returns the persistent segment directory, joined onto `base` when the
    /// configured path is relative.
    pub fn resolve_persistent_dir(&self, base: &Path) -> PathBuf {
        if self.persistent.directory.is_absolute() {
            self.persistent.directory.clone()
        } else {
            base.join(&self.persistent.directory)
        }
    }
}

/// `[general_purpose]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralPurposeConfig {
    /// Number of entries the in-process map is pre-sized for.
    pub initial_capacity: usize,
}

impl Default for GeneralPurposeConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 1024,
        }
    }
}

/// `[persistent]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistentConfig {
    /// Whether the persistent tier is used at all.
    pub enabled: bool,
    /// Directory holding persisted segments.
    pub directory: PathBuf,
    /// Format version stamped into every segment header. Segments written
    /// with another version are treated as misses.
    pub segment_version: u32,
}

impl Default for PersistentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: PathBuf::from(".prism-cache"),
            segment_version: 1,
        }
    }
}
