//! Fetch-or-compute over a cache tier.

use std::sync::Arc;

use crate::entry::CacheEntry;
use crate::error::CacheError;
use crate::key::ActionKey;
use crate::tier::{CacheTier, CacheTierExt};

/// Returns the result cached for `key`, computing and storing it on a miss.
///
/// On a miss a fresh result is created bound to `tier`, `compute` fills in
/// its payload, and only then is it published and stored, so other readers
/// never observe an unpopulated result. If `compute` does not populate the
/// result, the store fails with [`CacheError::Unpopulated`].
pub fn fetch_or_compute<R, T, F>(tier: &T, key: ActionKey, compute: F) -> Result<Arc<R>, CacheError>
where
    R: CacheEntry,
    T: CacheTier + ?Sized,
    F: FnOnce(&mut R),
{
    if let Some(hit) = tier.fetch::<R>(&key)? {
        return Ok(hit);
    }
    tracing::trace!(kind = %key.kind(), hash = key.hash(), "cache miss; computing");
    let mut result = R::create(key, tier)?;
    compute(&mut result);
    let published = Arc::new(result);
    tier.store(Arc::clone(&published))?;
    Ok(published)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_range::FrameRangeResults;
    use crate::general::GeneralPurposeCache;
    use crate::key::ActionKind;
    use crate::persistent::PersistentCache;
    use crate::rod::RegionOfDefinitionResults;
    use prism_common::{RangeD, RectD, RenderScale};
    use std::cell::Cell;

    fn key(kind: ActionKind) -> ActionKey {
        ActionKey::new(kind, 77, RenderScale::IDENTITY, "net.prism.Read")
    }

    #[test]
    fn computes_once_then_hits() {
        let tier = GeneralPurposeCache::new();
        let calls = Cell::new(0);
        let compute = |r: &mut FrameRangeResults| {
            calls.set(calls.get() + 1);
            r.set_frame_range(RangeD::new(1.0, 50.0));
        };

        let first = fetch_or_compute(&tier, key(ActionKind::FrameRange), compute).unwrap();
        let second = fetch_or_compute(&tier, key(ActionKind::FrameRange), compute).unwrap();
        assert_eq!(calls.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.frame_range(), RangeD::new(1.0, 50.0));
    }

    #[test]
    fn works_through_trait_object() {
        let tier: Box<dyn CacheTier> = Box::new(PersistentCache::new(1));
        let rect = RectD::new(0.0, 0.0, 64.0, 64.0);
        let r = fetch_or_compute::<RegionOfDefinitionResults, _, _>(
            &*tier,
            key(ActionKind::RegionOfDefinition),
            |r| r.set_rod(rect),
        )
        .unwrap();
        assert_eq!(r.rod(), rect);
        assert_eq!(tier.len(), 1);

        let again = fetch_or_compute::<RegionOfDefinitionResults, _, _>(
            &*tier,
            key(ActionKind::RegionOfDefinition),
            |_| panic!("should hit"),
        )
        .unwrap();
        assert_eq!(again.rod(), rect);
    }

    #[test]
    fn abandoned_computation_is_not_stored() {
        let tier = GeneralPurposeCache::new();
        let err =
            fetch_or_compute::<FrameRangeResults, _, _>(&tier, key(ActionKind::FrameRange), |_| {})
                .unwrap_err();
        assert!(matches!(err, CacheError::Unpopulated { .. }));
        assert!(tier.is_empty());
    }

    #[test]
    fn in_process_kind_on_persistent_tier_fails() {
        let tier = PersistentCache::new(1);
        let err = fetch_or_compute::<FrameRangeResults, _, _>(
            &tier,
            key(ActionKind::FrameRange),
            |r| r.set_frame_range(RangeD::new(0.0, 1.0)),
        )
        .unwrap_err();
        assert!(matches!(err, CacheError::SerializationUnsupported { .. }));
    }
}
