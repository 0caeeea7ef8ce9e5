//! Frames-needed results.

use std::collections::BTreeMap;

use prism_common::{RangeD, ViewIdx};

use crate::entry::{action_result_conversions, CacheEntry, EntryBase};
use crate::error::CacheError;
use crate::key::{ActionKey, ActionKind};
use crate::tier::{CacheTier, TierKind};

/// Frame ranges needed from one input, per view.
pub type FrameRangesMap = BTreeMap<ViewIdx, Vec<RangeD>>;

/// Frame ranges needed, per input index.
pub type FramesNeededMap = BTreeMap<i32, FrameRangesMap>;

/// The input frames a node reads to render one output frame. In-process
/// only.
#[derive(Clone, Debug)]
pub struct FramesNeededResults {
    base: EntryBase,
    frames_needed: FramesNeededMap,
}

impl FramesNeededResults {
    /// The frames needed. Empty until populated.
    pub fn frames_needed(&self) -> &FramesNeededMap {
        &self.frames_needed
    }

    /// Ranges needed from `input_nb` in `view`, if any.
    pub fn ranges_for(&self, input_nb: i32, view: ViewIdx) -> Option<&[RangeD]> {
        self.frames_needed
            .get(&input_nb)?
            .get(&view)
            .map(Vec::as_slice)
    }

    /// Sets the frames needed.
    pub fn set_frames_needed(&mut self, frames_needed: FramesNeededMap) {
        self.frames_needed = frames_needed;
        self.base.mark_populated();
    }
}

impl CacheEntry for FramesNeededResults {
    const KIND: ActionKind = ActionKind::FramesNeeded;

    fn create<T: CacheTier + ?Sized>(key: ActionKey, tier: &T) -> Result<Self, CacheError> {
        Ok(Self {
            base: EntryBase::bind(Self::KIND, key, tier)?,
            frames_needed: FramesNeededMap::new(),
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

    action_result_conversions!(FramesNeeded);
}
