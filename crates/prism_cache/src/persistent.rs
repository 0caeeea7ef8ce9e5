//! The cross-process cache tier.
//!
//! Results are stored as encoded segments rather than live objects, so every
//! fetch rebuilds a fresh result from its property bag. Only
//! [`Persistable`] kinds are accepted; other kinds fail with
//! [`CacheError::SerializationUnsupported`] before any shared state is
//! touched. Stale or damaged segments are logged, dropped, and reported as
//! misses.
//!
//! On disk the tier only ever adds or replaces segment files. A file is
//! deleted only when this instance removed or cleared its entry; segments
//! written by other processes are left alone.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use prism_config::{CacheConfig, PersistentConfig};
use tempfile::NamedTempFile;

use crate::entry::{unsupported, ActionResult, Persistable};
use crate::error::{CacheError, Direction};
use crate::key::{ActionKey, ActionKind};
use crate::lock::SegmentLock;
use crate::property::PropertyBag;
use crate::segment::{decode_segment, encode_segment};
use crate::tier::{CacheTier, TierKind};

/// Subdirectory holding segment files.
const SEGMENT_SUBDIR: &str = "segments";

/// File extension of segment files.
const SEGMENT_EXT: &str = "seg";

/// Cross-process tier storing results as validated property-bag segments.
pub struct PersistentCache {
    segments: RwLock<HashMap<u64, Arc<[u8]>>>,
    /// Hashes removed since the last save, whose files `save` deletes.
    removed: Mutex<HashSet<u64>>,
    /// Segment directory this tier was opened from, if any.
    seg_dir: Option<PathBuf>,
    segment_version: u32,
}

impl PersistentCache {
    /// Creates an empty tier writing segments with the given format version.
    pub fn new(segment_version: u32) -> Self {
        Self {
            segments: RwLock::new(HashMap::new()),
            removed: Mutex::new(HashSet::new()),
            seg_dir: None,
            segment_version,
        }
    }

    /// Creates an empty tier from configuration.
    pub fn with_config(config: &PersistentConfig) -> Self {
        Self::new(config.segment_version)
    }

    /// Opens the tier described by `config`, resolving its directory
    /// against `base`. Returns `None` when the persistent tier is disabled.
    pub fn open_configured(base: &Path, config: &CacheConfig) -> Result<Option<Self>, CacheError> {
        if !config.persistent.enabled {
            return Ok(None);
        }
        let dir = config.resolve_persistent_dir(base);
        Self::open(&dir, &config.persistent).map(Some)
    }

    /// Loads every segment file under `dir`.
    ///
    /// Segments are validated lazily on fetch; files whose name is not a
    /// hash are skipped.
    pub fn open(dir: &Path, config: &PersistentConfig) -> Result<Self, CacheError> {
        let seg_dir = dir.join(SEGMENT_SUBDIR);
        let mut cache = Self::with_config(config);
        cache.seg_dir = Some(seg_dir.clone());
        if !seg_dir.exists() {
            return Ok(cache);
        }

        let _lock = SegmentLock::acquire(&seg_dir)?;
        let entries = std::fs::read_dir(&seg_dir).map_err(|e| CacheError::Io {
            path: seg_dir.clone(),
            source: e,
        })?;
        let segments = cache.segments.get_mut();
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::Io {
                path: seg_dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            let Some(hash) = segment_hash(&path) else {
                continue;
            };
            match std::fs::read(&path) {
                Ok(raw) => {
                    segments.insert(hash, Arc::from(raw));
                }
                Err(e) => {
                    tracing::debug!(
                        path = %path.display(),
                        error = %e,
                        "skipping unreadable segment"
                    );
                }
            }
        }
        tracing::debug!(
            count = segments.len(),
            dir = %seg_dir.display(),
            "opened persistent cache"
        );
        Ok(cache)
    }

    /// Writes every held segment to `<dir>/segments/` and deletes the files
    /// of entries removed since the last save. Returns the number of
    /// segments written.
    ///
    /// Other files in the directory are never touched, so several processes
    /// may save into the same directory.
    pub fn save(&self, dir: &Path) -> Result<usize, CacheError> {
        let seg_dir = dir.join(SEGMENT_SUBDIR);
        let _lock = SegmentLock::acquire(&seg_dir)?;

        let segments = self.segments.read();
        for (hash, raw) in segments.iter() {
            write_segment_file(&seg_dir, *hash, raw)?;
        }

        let removed = std::mem::take(&mut *self.removed.lock());
        for hash in removed.iter().filter(|hash| !segments.contains_key(*hash)) {
            let path = segment_path(&seg_dir, *hash);
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::trace!(hash, "deleted removed segment"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(CacheError::Io {
                        path,
                        source: e,
                    })
                }
            }
        }
        tracing::debug!(
            written = segments.len(),
            deleted = removed.len(),
            dir = %seg_dir.display(),
            "saved persistent cache"
        );
        Ok(segments.len())
    }

    /// The segment format version this tier reads and writes.
    pub fn segment_version(&self) -> u32 {
        self.segment_version
    }

    /// Stores a persistable result.
    pub fn store_persistable<R: Persistable>(&self, result: &R) -> Result<(), CacheError> {
        self.write_segment(result.key(), result.tier(), result.is_populated(), |bag| {
            result.to_property_bag(bag)
        })
    }

    /// Fetches a persistable result.
    pub fn fetch_persistable<R: Persistable>(
        &self,
        key: &ActionKey,
    ) -> Result<Option<Arc<R>>, CacheError> {
        Ok(self
            .fetch_entry(key)?
            .and_then(|entry| R::from_action_result(&entry)))
    }

    /// Fetches while holding exclusive access to the segment table, letting
    /// results rebuild derived state eagerly.
    ///
    /// A tier opened from a directory also holds that directory's lock, so
    /// no other process saves into it meanwhile.
    pub fn fetch_exclusive(&self, key: &ActionKey) -> Result<Option<ActionResult>, CacheError> {
        ensure_persistable(key)?;
        let _lock = self.seg_dir.as_deref().map(SegmentLock::acquire).transpose()?;
        let hash = key.hash();
        let mut segments = self.segments.write();
        let Some(raw) = segments.get(&hash).cloned() else {
            return Ok(None);
        };
        match self.decode(key, &raw, true) {
            Ok(result) => Ok(result),
            Err(e) if e.is_recoverable() => {
                tracing::debug!(kind = %key.kind(), hash, error = %e, "dropping stale segment");
                segments.remove(&hash);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn write_segment(
        &self,
        key: &ActionKey,
        tier: TierKind,
        populated: bool,
        write: impl FnOnce(&mut PropertyBag) -> Result<(), CacheError>,
    ) -> Result<(), CacheError> {
        let kind = key.kind();
        if !kind.persistence().is_persistable() {
            return Err(unsupported(kind, Direction::Serialize));
        }
        if !populated {
            return Err(CacheError::Unpopulated { kind });
        }
        let mut bag = PropertyBag::new();
        write(&mut bag)?;
        if tier != TierKind::Persistent {
            return Err(CacheError::TierMismatch {
                kind,
                tier: TierKind::Persistent,
            });
        }

        let hash = key.hash();
        let raw = encode_segment(kind, hash, self.segment_version, &bag)?;
        self.segments.write().insert(hash, Arc::from(raw));
        self.removed.lock().remove(&hash);
        tracing::trace!(%kind, hash, "stored in persistent cache");
        Ok(())
    }

    /// Rebuilds the result stored in `raw`. Returns `Ok(None)` when the
    /// segment is intact but belongs to another key with the same hash.
    fn decode(
        &self,
        key: &ActionKey,
        raw: &[u8],
        locked_for_writing: bool,
    ) -> Result<Option<ActionResult>, CacheError> {
        let (header, bag) = decode_segment(raw, self.segment_version)?;
        if header.key_hash != key.hash() {
            return Err(CacheError::InvalidSegment {
                reason: "segment header hash differs from its slot".to_string(),
            });
        }
        let Some(stored_kind) = header.kind() else {
            return Err(CacheError::InvalidSegment {
                reason: format!("unknown action kind id {}", header.kind_id),
            });
        };
        if stored_kind != key.kind() {
            log_collision(key, stored_kind);
            return Ok(None);
        }
        let result = ActionResult::from_property_bag(key.clone(), self, locked_for_writing, &bag)?;
        if result.key() != key {
            log_collision(key, stored_kind);
            return Ok(None);
        }
        Ok(Some(result))
    }

    /// Returns `true` if `raw` is an intact segment of a key other than
    /// `key`.
    fn holds_other_key(&self, key: &ActionKey, raw: &[u8]) -> bool {
        let Ok((header, bag)) = decode_segment(raw, self.segment_version) else {
            return false;
        };
        match header.kind() {
            Some(kind) if kind == key.kind() => {
                ActionKey::from_property_bag(kind, &bag).is_ok_and(|stored| stored != *key)
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Removes `raw` from the table unless it has since been replaced.
    fn drop_stale(&self, hash: u64, raw: &Arc<[u8]>) {
        let mut segments = self.segments.write();
        if segments
            .get(&hash)
            .is_some_and(|current| Arc::ptr_eq(current, raw))
        {
            segments.remove(&hash);
        }
    }
}

fn log_collision(key: &ActionKey, stored_kind: ActionKind) {
    tracing::debug!(
        kind = %key.kind(),
        hash = key.hash(),
        %stored_kind,
        "hash collision in persistent cache; treating as miss"
    );
}

fn ensure_persistable(key: &ActionKey) -> Result<(), CacheError> {
    if key.kind().persistence().is_persistable() {
        Ok(())
    } else {
        Err(unsupported(key.kind(), Direction::Deserialize))
    }
}

fn segment_path(seg_dir: &Path, hash: u64) -> PathBuf {
    seg_dir.join(format!("{hash:016x}.{SEGMENT_EXT}"))
}

fn segment_hash(path: &Path) -> Option<u64> {
    if path.extension().and_then(|e| e.to_str()) != Some(SEGMENT_EXT) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    u64::from_str_radix(stem, 16).ok()
}

/// Writes one segment through a uniquely named temporary file in `seg_dir`,
/// then renames it into place.
fn write_segment_file(seg_dir: &Path, hash: u64, raw: &[u8]) -> Result<(), CacheError> {
    let path = segment_path(seg_dir, hash);
    let io_err = |source: std::io::Error| CacheError::Io {
        path: path.clone(),
        source,
    };
    let mut tmp = NamedTempFile::new_in(seg_dir).map_err(io_err)?;
    tmp.write_all(raw).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(&path).map_err(|e| io_err(e.error))?;
    Ok(())
}

impl CacheTier for PersistentCache {
    fn tier_kind(&self) -> TierKind {
        TierKind::Persistent
    }

    fn fetch_entry(&self, key: &ActionKey) -> Result<Option<ActionResult>, CacheError> {
        ensure_persistable(key)?;
        let hash = key.hash();
        let Some(raw) = self.segments.read().get(&hash).cloned() else {
            return Ok(None);
        };
        match self.decode(key, &raw, false) {
            Ok(result) => {
                if result.is_some() {
                    tracing::trace!(kind = %key.kind(), hash, "persistent cache hit");
                }
                Ok(result)
            }
            Err(e) if e.is_recoverable() => {
                tracing::debug!(kind = %key.kind(), hash, error = %e, "dropping stale segment");
                self.drop_stale(hash, &raw);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn store_entry(&self, result: ActionResult) -> Result<(), CacheError> {
        self.write_segment(
            result.key(),
            result.tier(),
            result.is_populated(),
            |bag| result.to_property_bag(bag),
        )
    }

    fn remove(&self, key: &ActionKey) -> bool {
        let hash = key.hash();
        let mut segments = self.segments.write();
        let Some(raw) = segments.get(&hash) else {
            return false;
        };
        if self.holds_other_key(key, raw) {
            return false;
        }
        segments.remove(&hash);
        self.removed.lock().insert(hash);
        true
    }

    fn len(&self) -> usize {
        self.segments.read().len()
    }

    fn clear(&self) {
        let mut segments = self.segments.write();
        self.removed.lock().extend(segments.drain().map(|(hash, _)| hash));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::CacheEntry;
    use crate::general::GeneralPurposeCache;
    use crate::identity::IdentityResults;
    use crate::metadata::{NodeMetadata, TimeInvariantMetadataResults};
    use crate::rod::RegionOfDefinitionResults;
    use crate::tier::CacheTierExt;
    use prism_common::{RectD, RenderScale, TimeValue, ViewIdx};

    fn rod_key(hash: u64) -> ActionKey {
        ActionKey::new(
            ActionKind::RegionOfDefinition,
            hash,
            RenderScale::IDENTITY,
            "net.prism.Crop",
        )
    }

    fn rod(cache: &PersistentCache, hash: u64, rect: RectD) -> RegionOfDefinitionResults {
        let mut r = RegionOfDefinitionResults::create(rod_key(hash), cache).unwrap();
        r.set_rod(rect);
        r
    }

    fn segment_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<_> = std::fs::read_dir(dir.join(SEGMENT_SUBDIR))
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| segment_hash(path).is_some())
            .collect();
        files.sort();
        files
    }

    /// Files other than segments and the lock file.
    fn stray_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir.join(SEGMENT_SUBDIR))
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| {
                segment_hash(path).is_none()
                    && path.file_name().and_then(|n| n.to_str()) != Some(crate::lock::LOCK_FILE)
            })
            .collect()
    }

    /// Files the segment for `key` under a slot of its own hash, with the
    /// payload of `stored`.
    fn plant_foreign_segment(cache: &PersistentCache, key: &ActionKey, stored: &ActionKey) {
        let mut bag = PropertyBag::new();
        stored.to_property_bag(&mut bag);
        bag.set_property_array(crate::rod::ROD_PROPERTY, &[0.0, 0.0, 1.0, 1.0]);
        let raw = encode_segment(stored.kind(), key.hash(), 1, &bag).unwrap();
        cache.segments.write().insert(key.hash(), Arc::from(raw));
    }

    #[test]
    fn store_and_fetch_rebuilds_result() {
        let cache = PersistentCache::new(1);
        let rect = RectD::new(-10.0, -10.0, 1920.0, 1080.0);
        cache.store_persistable(&rod(&cache, 1, rect)).unwrap();

        let fetched = cache
            .fetch_persistable::<RegionOfDefinitionResults>(&rod_key(1))
            .unwrap()
            .unwrap();
        assert_eq!(fetched.rod(), rect);
        assert_eq!(fetched.tier(), TierKind::Persistent);
        assert!(fetched.is_populated());
    }

    #[test]
    fn miss_on_unknown_key() {
        let cache = PersistentCache::new(1);
        assert!(cache.fetch_entry(&rod_key(5)).unwrap().is_none());
    }

    #[test]
    fn in_process_kind_fetch_is_hard_error() {
        let cache = PersistentCache::new(1);
        let key = ActionKey::new(ActionKind::Identity, 1, RenderScale::IDENTITY, "p");
        let err = cache.fetch_entry(&key).unwrap_err();
        assert!(matches!(
            err,
            CacheError::SerializationUnsupported {
                kind: ActionKind::Identity,
                direction: Direction::Deserialize
            }
        ));
    }

    #[test]
    fn in_process_kind_store_is_hard_error_without_writes() {
        let cache = PersistentCache::new(1);
        let general = GeneralPurposeCache::new();
        let key = ActionKey::new(ActionKind::Identity, 1, RenderScale::IDENTITY, "p");
        let mut r = IdentityResults::create(key, &general).unwrap();
        r.set_identity_data(0, TimeValue::ZERO, ViewIdx::MAIN);
        let err = cache.store(Arc::new(r)).unwrap_err();
        assert!(matches!(
            err,
            CacheError::SerializationUnsupported {
                direction: Direction::Serialize,
                ..
            }
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn unpopulated_in_process_kind_reports_unsupported() {
        let cache = PersistentCache::new(1);
        let general = GeneralPurposeCache::new();
        let key = ActionKey::new(ActionKind::FrameRange, 1, RenderScale::IDENTITY, "p");
        let r = crate::frame_range::FrameRangeResults::create(key, &general).unwrap();
        assert!(!r.is_populated());

        let err = cache.store(Arc::new(r)).unwrap_err();
        assert!(matches!(
            err,
            CacheError::SerializationUnsupported {
                kind: ActionKind::FrameRange,
                direction: Direction::Serialize
            }
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn result_bound_in_process_rejected() {
        let cache = PersistentCache::new(1);
        let general = GeneralPurposeCache::new();
        let mut r = RegionOfDefinitionResults::create(rod_key(1), &general).unwrap();
        r.set_rod(RectD::default());
        let err = cache.store_persistable(&r).unwrap_err();
        assert!(matches!(err, CacheError::TierMismatch { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn version_change_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let v1 = PersistentCache::new(1);
        v1.store_persistable(&rod(&v1, 1, RectD::new(0.0, 0.0, 4.0, 4.0)))
            .unwrap();
        v1.save(dir.path()).unwrap();

        let config = PersistentConfig {
            segment_version: 2,
            ..PersistentConfig::default()
        };
        let v2 = PersistentCache::open(dir.path(), &config).unwrap();
        assert_eq!(v2.len(), 1);
        assert!(v2.fetch_entry(&rod_key(1)).unwrap().is_none());
        assert!(v2.is_empty(), "stale segment should be dropped");
    }

    #[test]
    fn save_and_open_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let writer = PersistentCache::new(1);
        writer
            .store_persistable(&rod(&writer, 1, RectD::new(1.0, 2.0, 3.0, 4.0)))
            .unwrap();
        writer
            .store_persistable(&rod(&writer, 2, RectD::new(5.0, 6.0, 7.0, 8.0)))
            .unwrap();
        assert_eq!(writer.save(dir.path()).unwrap(), 2);

        let reader = PersistentCache::open(dir.path(), &PersistentConfig::default()).unwrap();
        let fetched = reader
            .fetch_persistable::<RegionOfDefinitionResults>(&rod_key(2))
            .unwrap()
            .unwrap();
        assert_eq!(fetched.rod(), RectD::new(5.0, 6.0, 7.0, 8.0));
    }

    #[test]
    fn save_leaves_no_temporary_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PersistentCache::new(1);
        cache.store_persistable(&rod(&cache, 1, RectD::default())).unwrap();
        cache.save(dir.path()).unwrap();
        cache.save(dir.path()).unwrap();

        assert_eq!(segment_files(dir.path()).len(), 1);
        assert!(stray_files(dir.path()).is_empty());
    }

    #[test]
    fn save_deletes_removed_segments() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PersistentCache::new(1);
        cache.store_persistable(&rod(&cache, 1, RectD::default())).unwrap();
        cache.store_persistable(&rod(&cache, 2, RectD::default())).unwrap();
        cache.save(dir.path()).unwrap();

        assert!(cache.remove(&rod_key(1)));
        cache.save(dir.path()).unwrap();
        assert_eq!(
            segment_files(dir.path()),
            vec![segment_path(&dir.path().join(SEGMENT_SUBDIR), rod_key(2).hash())]
        );
    }

    #[test]
    fn save_deletes_cleared_segments() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PersistentCache::new(1);
        cache.store_persistable(&rod(&cache, 1, RectD::default())).unwrap();
        cache.save(dir.path()).unwrap();

        cache.clear();
        assert_eq!(cache.save(dir.path()).unwrap(), 0);
        assert!(segment_files(dir.path()).is_empty());
    }

    #[test]
    fn restore_after_remove_keeps_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PersistentCache::new(1);
        cache.store_persistable(&rod(&cache, 1, RectD::default())).unwrap();
        assert!(cache.remove(&rod_key(1)));
        cache.store_persistable(&rod(&cache, 1, RectD::default())).unwrap();
        cache.save(dir.path()).unwrap();
        assert_eq!(segment_files(dir.path()).len(), 1);
    }

    #[test]
    fn writers_sharing_a_directory_keep_each_others_segments() {
        let dir = tempfile::tempdir().unwrap();
        let second = PersistentCache::open(dir.path(), &PersistentConfig::default()).unwrap();

        let first = PersistentCache::new(1);
        first
            .store_persistable(&rod(&first, 1, RectD::new(0.0, 0.0, 1.0, 1.0)))
            .unwrap();
        first.save(dir.path()).unwrap();

        second
            .store_persistable(&rod(&second, 2, RectD::new(0.0, 0.0, 2.0, 2.0)))
            .unwrap();
        second.save(dir.path()).unwrap();

        assert_eq!(segment_files(dir.path()).len(), 2);
        let reader = PersistentCache::open(dir.path(), &PersistentConfig::default()).unwrap();
        for (hash, width) in [(1, 1.0), (2, 2.0)] {
            let r = reader
                .fetch_persistable::<RegionOfDefinitionResults>(&rod_key(hash))
                .unwrap()
                .unwrap();
            assert_eq!(r.rod().width(), width);
        }
    }

    #[test]
    fn older_reader_leaves_newer_segments_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let newer = PersistentCache::new(2);
        newer.store_persistable(&rod(&newer, 1, RectD::default())).unwrap();
        newer.save(dir.path()).unwrap();

        let older = PersistentCache::open(dir.path(), &PersistentConfig::default()).unwrap();
        assert!(older.fetch_entry(&rod_key(1)).unwrap().is_none());
        assert!(older.is_empty());
        older.save(dir.path()).unwrap();

        assert_eq!(segment_files(dir.path()).len(), 1);
        let config = PersistentConfig {
            segment_version: 2,
            ..PersistentConfig::default()
        };
        let reopened = PersistentCache::open(dir.path(), &config).unwrap();
        assert!(reopened.fetch_entry(&rod_key(1)).unwrap().is_some());
    }

    #[test]
    fn colliding_key_is_a_miss_and_keeps_the_segment() {
        let cache = PersistentCache::new(1);
        let requested = rod_key(1);
        let stored = rod_key(2);
        plant_foreign_segment(&cache, &requested, &stored);

        assert!(cache.fetch_entry(&requested).unwrap().is_none());
        assert!(cache.fetch_exclusive(&requested).unwrap().is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn remove_ignores_colliding_key() {
        let cache = PersistentCache::new(1);
        let requested = rod_key(1);
        plant_foreign_segment(&cache, &requested, &rod_key(2));

        assert!(!cache.remove(&requested));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn corrupt_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PersistentCache::new(1);
        cache.store_persistable(&rod(&cache, 1, RectD::default())).unwrap();
        cache.save(dir.path()).unwrap();

        let path = segment_path(&dir.path().join(SEGMENT_SUBDIR), rod_key(1).hash());
        let mut raw = std::fs::read(&path).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x55;
        std::fs::write(&path, raw).unwrap();

        let reopened = PersistentCache::open(dir.path(), &PersistentConfig::default()).unwrap();
        assert!(reopened.fetch_entry(&rod_key(1)).unwrap().is_none());
    }

    #[test]
    fn open_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let cache = PersistentCache::open(&missing, &PersistentConfig::default()).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn open_configured_respects_enabled_flag() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CacheConfig::default();
        config.persistent.enabled = false;
        assert!(PersistentCache::open_configured(dir.path(), &config)
            .unwrap()
            .is_none());
        config.persistent.enabled = true;
        let cache = PersistentCache::open_configured(dir.path(), &config)
            .unwrap()
            .unwrap();
        assert_eq!(cache.segment_version(), 1);
    }

    #[test]
    fn exclusive_fetch_rebuilds_derived_state() {
        let cache = PersistentCache::new(1);
        let key = ActionKey::new(
            ActionKind::TimeInvariantMetadata,
            3,
            RenderScale::IDENTITY,
            "p",
        );
        let mut r = TimeInvariantMetadataResults::create(key.clone(), &cache).unwrap();
        r.set_metadata(NodeMetadata::default());
        cache.store_persistable(&r).unwrap();

        let shared = cache
            .fetch::<TimeInvariantMetadataResults>(&key)
            .unwrap()
            .unwrap();
        assert!(!shared.has_cached_digest());

        let exclusive = cache.fetch_exclusive(&key).unwrap().unwrap();
        let exclusive = TimeInvariantMetadataResults::from_action_result(&exclusive).unwrap();
        assert!(exclusive.has_cached_digest());
        assert_eq!(exclusive.metadata_digest(), NodeMetadata::default().digest());
    }

    #[test]
    fn exclusive_fetch_on_opened_tier_releases_directory_lock() {
        let dir = tempfile::tempdir().unwrap();
        let writer = PersistentCache::new(1);
        writer.store_persistable(&rod(&writer, 1, RectD::default())).unwrap();
        writer.save(dir.path()).unwrap();

        let reader = PersistentCache::open(dir.path(), &PersistentConfig::default()).unwrap();
        assert!(reader.fetch_exclusive(&rod_key(1)).unwrap().is_some());
        // The lock is released again, so saving does not block.
        writer.save(dir.path()).unwrap();
    }

    #[test]
    fn unpopulated_store_rejected() {
        let cache = PersistentCache::new(1);
        let r = RegionOfDefinitionResults::create(rod_key(1), &cache).unwrap();
        assert!(matches!(
            cache.store_persistable(&r),
            Err(CacheError::Unpopulated { .. })
        ));
    }
}
