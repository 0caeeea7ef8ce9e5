//! Frame-range results.

use prism_common::RangeD;

use crate::entry::{action_result_conversions, CacheEntry, EntryBase};
use crate::error::CacheError;
use crate::key::{ActionKey, ActionKind};
use crate::tier::{CacheTier, TierKind};

/// The range of frames a node can produce. In-process only.
#[derive(Clone, Debug)]
pub struct FrameRangeResults {
    base: EntryBase,
    range: RangeD,
}

impl FrameRangeResults {
    /// The frame range. `[0, 0]` until populated.
    pub fn frame_range(&self) -> RangeD {
        self.range
    }

    /// Sets the frame range.
    pub fn set_frame_range(&mut self, range: RangeD) {
        self.range = range;
        self.base.mark_populated();
    }
}

impl CacheEntry for FrameRangeResults {
    const KIND: ActionKind = ActionKind::FrameRange;

    fn create<T: CacheTier + ?Sized>(key: ActionKey, tier: &T) -> Result<Self, CacheError> {
        Ok(Self {
            base: EntryBase::bind(Self::KIND, key, tier)?,
            range: RangeD::new(0.0, 0.0),
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

    action_result_conversions!(FrameRange);
}
