//! The in-process cache tier.

use std::collections::HashMap;

use parking_lot::RwLock;
use prism_config::GeneralPurposeConfig;

use crate::entry::ActionResult;
use crate::error::CacheError;
use crate::key::ActionKey;
use crate::tier::{CacheTier, TierKind};

/// In-process tier holding published results by `Arc`.
///
/// Accepts every result kind, including ones whose payload is only valid
/// inside this process. Readers share the published results without
/// copying.
pub struct GeneralPurposeCache {
    entries: RwLock<HashMap<u64, ActionResult>>,
}

impl GeneralPurposeCache {
    /// Creates an empty tier.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Creates an empty tier sized from configuration.
    pub fn with_config(config: &GeneralPurposeConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::with_capacity(config.initial_capacity)),
        }
    }
}

impl Default for GeneralPurposeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheTier for GeneralPurposeCache {
    fn tier_kind(&self) -> TierKind {
        TierKind::GeneralPurpose
    }

    fn fetch_entry(&self, key: &ActionKey) -> Result<Option<ActionResult>, CacheError> {
        let hash = key.hash();
        let entries = self.entries.read();
        match entries.get(&hash) {
            Some(entry) if entry.key() == key => {
                tracing::trace!(kind = %key.kind(), hash, "general-purpose cache hit");
                Ok(Some(entry.clone()))
            }
            Some(entry) => {
                tracing::debug!(
                    kind = %key.kind(),
                    hash,
                    stored_plugin = entry.key().holder_plugin_id(),
                    "hash collision in general-purpose cache; treating as miss"
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn store_entry(&self, result: ActionResult) -> Result<(), CacheError> {
        let kind = result.kind();
        if !result.is_populated() {
            return Err(CacheError::Unpopulated { kind });
        }
        if result.tier() != TierKind::GeneralPurpose {
            return Err(CacheError::TierMismatch {
                kind,
                tier: TierKind::GeneralPurpose,
            });
        }
        let hash = result.key().hash();
        self.entries.write().insert(hash, result);
        tracing::trace!(%kind, hash, "stored in general-purpose cache");
        Ok(())
    }

    fn remove(&self, key: &ActionKey) -> bool {
        let hash = key.hash();
        let mut entries = self.entries.write();
        let present = entries.get(&hash).is_some_and(|entry| entry.key() == key);
        present && entries.remove(&hash).is_some()
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    fn clear(&self) {
        self.entries.write().clear();
    }
}
