//! Region-of-definition results.

use prism_common::RectD;

use crate::entry::{action_result_conversions, CacheEntry, EntryBase, Persistable};
use crate::error::CacheError;
use crate::key::{ActionKey, ActionKind};
use crate::property::PropertyBag;
use crate::tier::{CacheTier, TierKind};

/// Property name of the rectangle (4 x f64: x1, y1, x2, y2).
pub const ROD_PROPERTY: &str = "RoD";

/// The bounding rectangle within which a node's output has defined content.
#[derive(Clone, Debug)]
pub struct RegionOfDefinitionResults {
    base: EntryBase,
    rod: RectD,
}

impl RegionOfDefinitionResults {
    /// The region of definition. All zeros until populated.
    pub fn rod(&self) -> RectD {
        self.rod
    }

    /// Sets the region of definition.
    pub fn set_rod(&mut self, rod: RectD) {
        self.rod = rod;
        self.base.mark_populated();
    }
}

impl CacheEntry for RegionOfDefinitionResults {
    const KIND: ActionKind = ActionKind::RegionOfDefinition;

    fn create<T: CacheTier + ?Sized>(key: ActionKey, tier: &T) -> Result<Self, CacheError> {
        Ok(Self {
            base: EntryBase::bind(Self::KIND, key, tier)?,
            rod: RectD::default(),
        })
    }

    fn key(&self) -> &ActionKey {
        self.base.key()
    }

    fn tier(&self) -> TierKind {
        self.base.tier()
    }

    fn is_populated(&self) -> bool {
        self.base.is_populated()
    }

    fn to_property_bag(&self, bag: &mut PropertyBag) -> Result<(), CacheError> {
        self.base.to_property_bag(bag);
        bag.set_property_array(ROD_PROPERTY, &self.rod.to_array());
        Ok(())
    }

    fn from_property_bag(
        &mut self,
        _locked_for_writing: bool,
        bag: &PropertyBag,
    ) -> Result<(), CacheError> {
        let key = self.base.read_key(bag)?;
        let rod = bag.require_property_n::<f64, 4>(ROD_PROPERTY)?;
        self.rod = RectD::from(rod);
        self.base.commit(key);
        Ok(())
    }

    action_result_conversions!(RegionOfDefinition);
}

impl Persistable for RegionOfDefinitionResults {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::general::GeneralPurposeCache;
    use crate::key::NODE_HASH_PROPERTY;
    use prism_common::RenderScale;

    fn key(hash: u64) -> ActionKey {
        ActionKey::new(
            ActionKind::RegionOfDefinition,
            hash,
            RenderScale::new(0.5, 0.5),
            "net.prism.Transform",
        )
    }

    fn populated(rod: RectD) -> RegionOfDefinitionResults {
        let tier = GeneralPurposeCache::new();
        let mut r = RegionOfDefinitionResults::create(key(7), &tier).unwrap();
        r.set_rod(rod);
        r
    }

    #[test]
    fn defaults_before_population() {
        let tier = GeneralPurposeCache::new();
        let r = RegionOfDefinitionResults::create(key(1), &tier).unwrap();
        assert_eq!(r.rod(), RectD::default());
        assert!(!r.is_populated());
    }

    #[test]
    fn bag_roundtrip_boundary_values() {
        let cases = [
            RectD::new(-10.0, -10.0, 1920.0, 1080.0),
            RectD::default(),
            RectD::new(5.0, 5.0, 5.0, 5.0),
            RectD::new(-300.5, -200.25, -1.0, -0.5),
            RectD::new(f64::MIN, f64::MIN, f64::MAX, f64::MAX),
        ];
        let tier = GeneralPurposeCache::new();
        for rod in cases {
            let source = populated(rod);
            let mut bag = PropertyBag::new();
            source.to_property_bag(&mut bag).unwrap();

            let mut target = RegionOfDefinitionResults::create(key(0), &tier).unwrap();
            target.from_property_bag(false, &bag).unwrap();
            assert_eq!(target.rod(), rod);
            assert_eq!(target.key(), source.key());
            assert!(target.is_populated());
        }
    }

    #[test]
    fn writes_base_fields() {
        let mut bag = PropertyBag::new();
        populated(RectD::new(0.0, 0.0, 1.0, 1.0))
            .to_property_bag(&mut bag)
            .unwrap();
        assert_eq!(bag.get_property::<u64>(NODE_HASH_PROPERTY, 0), Some(7));
        assert_eq!(
            bag.get_property_n::<f64, 4>(ROD_PROPERTY),
            Some([0.0, 0.0, 1.0, 1.0])
        );
    }

    #[test]
    fn missing_rod_leaves_target_untouched() {
        let mut bag = PropertyBag::new();
        key(99).to_property_bag(&mut bag);

        let mut target = populated(RectD::new(1.0, 2.0, 3.0, 4.0));
        let err = target.from_property_bag(false, &bag).unwrap_err();
        assert!(matches!(err, CacheError::DeserializationFailed { .. }));
        assert_eq!(target.rod(), RectD::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(target.key().node_time_view_variant_hash(), 7);
    }

    #[test]
    fn short_rod_is_rejected() {
        let mut bag = PropertyBag::new();
        key(3).to_property_bag(&mut bag);
        bag.set_property_array(ROD_PROPERTY, &[0.0f64, 0.0, 1.0]);
        let tier = GeneralPurposeCache::new();
        let mut target = RegionOfDefinitionResults::create(key(3), &tier).unwrap();
        assert!(target.from_property_bag(false, &bag).is_err());
        assert!(!target.is_populated());
    }
}
