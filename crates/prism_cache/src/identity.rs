//! Identity-detection results.

use prism_common::{TimeValue, ViewIdx};

use crate::entry::{action_result_conversions, CacheEntry, EntryBase};
use crate::error::CacheError;
use crate::key::{ActionKey, ActionKind};
use crate::tier::{CacheTier, TierKind};

/// Which input, time, and view a node passes through unchanged.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IdentityData {
    /// Index of the input passed through, or `-1` if the node is not an
    /// identity.
    pub input_nb: i32,
    /// Time at which the input is sampled.
    pub time: TimeValue,
    /// View in which the input is sampled.
    pub view: ViewIdx,
}

impl IdentityData {
    /// The "not an identity" sentinel.
    pub const NONE: IdentityData = IdentityData {
        input_nb: -1,
        time: TimeValue::ZERO,
        view: ViewIdx::MAIN,
    };

    /// Returns `true` if an input is passed through.
    pub fn is_identity(&self) -> bool {
        self.input_nb >= 0
    }
}

impl Default for IdentityData {
    fn default() -> Self {
        Self::NONE
    }
}

/// Whether a node is an identity of one of its inputs. In-process only.
#[derive(Clone, Debug)]
pub struct IdentityResults {
    base: EntryBase,
    data: IdentityData,
}

impl IdentityResults {
    /// The identity data. [`IdentityData::NONE`] until populated.
    pub fn identity_data(&self) -> IdentityData {
        self.data
    }

    /// Sets the identity data.
    pub fn set_identity_data(&mut self, input_nb: i32, time: TimeValue, view: ViewIdx) {
        self.data = IdentityData {
            input_nb,
            time,
            view,
        };
        self.base.mark_populated();
    }
}

impl CacheEntry for IdentityResults {
    const KIND: ActionKind = ActionKind::Identity;

    fn create<T: CacheTier + ?Sized>(key: ActionKey, tier: &T) -> Result<Self, CacheError> {
        Ok(Self {
            base: EntryBase::bind(Self::KIND, key, tier)?,
            data: IdentityData::NONE,
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

    action_result_conversions!(Identity);
}
