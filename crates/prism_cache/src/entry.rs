//! The result contract shared by every action variant.

use std::sync::Arc;

use crate::components::ComponentsResults;
use crate::distortion::DistortionResults;
use crate::error::{CacheError, Direction};
use crate::frame_range::FrameRangeResults;
use crate::frames_needed::FramesNeededResults;
use crate::identity::IdentityResults;
use crate::key::{ActionKey, ActionKind, Persistence};
use crate::metadata::TimeInvariantMetadataResults;
use crate::property::PropertyBag;
use crate::rod::RegionOfDefinitionResults;
use crate::tier::{CacheTier, TierKind};

/// A computed result attached to the key it was computed for.
///
/// Results go through two states. [`create`](Self::create) returns an
/// unpopulated result holding sentinel defaults; the variant's setter fills
/// the payload. Once wrapped in an `Arc` and stored, a result is never
/// mutated again.
///
/// The property-bag methods default to failing with
/// [`CacheError::SerializationUnsupported`]; only variants implementing
/// [`Persistable`] override them.
pub trait CacheEntry: Send + Sync + Sized + 'static {
    /// The action this result type answers.
    const KIND: ActionKind;

    /// Creates an unpopulated result for `key`, bound to `tier`.
    ///
    /// Fails if `key` is of another kind, or if this kind may not live in a
    /// persistent tier and `tier` is one.
    fn create<T: CacheTier + ?Sized>(key: ActionKey, tier: &T) -> Result<Self, CacheError>;

    /// The key this result was computed for.
    fn key(&self) -> &ActionKey;

    /// The tier this result was bound to at creation.
    fn tier(&self) -> TierKind;

    /// Returns `true` once the payload has been set.
    fn is_populated(&self) -> bool;

    /// Writes the key fields, then the payload, to `bag`.
    fn to_property_bag(&self, _bag: &mut PropertyBag) -> Result<(), CacheError> {
        Err(unsupported(Self::KIND, Direction::Serialize))
    }

    /// Reads key and payload back from `bag`.
    ///
    /// On failure `self` is left unchanged. `locked_for_writing` tells
    /// whether the caller holds exclusive access to the backing segment;
    /// derived state may only be rebuilt eagerly when it is set.
    fn from_property_bag(
        &mut self,
        _locked_for_writing: bool,
        _bag: &PropertyBag,
    ) -> Result<(), CacheError> {
        Err(unsupported(Self::KIND, Direction::Deserialize))
    }

    /// Wraps a published result in the closed [`ActionResult`] set.
    fn into_action_result(self: Arc<Self>) -> ActionResult;

    /// Extracts a result of this type from an [`ActionResult`].
    fn from_action_result(result: &ActionResult) -> Option<Arc<Self>>;
}

/// Marker for results whose payload is plain data and may be written to a
/// persistent tier. The persistent tier's typed API only accepts these.
pub trait Persistable: CacheEntry {}

pub(crate) fn unsupported(kind: ActionKind, direction: Direction) -> CacheError {
    tracing::error!(%kind, %direction, "in-process-only result reached a persistent cache path");
    CacheError::SerializationUnsupported { kind, direction }
}

/// Key and tier binding shared by every result variant.
#[derive(Clone, Debug)]
pub(crate) struct EntryBase {
    key: ActionKey,
    tier: TierKind,
    populated: bool,
}

impl EntryBase {
    pub(crate) fn bind<T: CacheTier + ?Sized>(
        kind: ActionKind,
        key: ActionKey,
        tier: &T,
    ) -> Result<Self, CacheError> {
        if key.kind() != kind {
            return Err(CacheError::KeyKindMismatch {
                expected: kind,
                actual: key.kind(),
            });
        }
        let tier_kind = tier.tier_kind();
        if tier.is_persistent() && !kind.persistence().is_persistable() {
            tracing::error!(
                %kind,
                tier = %tier_kind,
                "in-process-only result bound to a persistent tier"
            );
            return Err(CacheError::TierMismatch {
                kind,
                tier: tier_kind,
            });
        }
        Ok(Self {
            key,
            tier: tier_kind,
            populated: false,
        })
    }

    pub(crate) fn key(&self) -> &ActionKey {
        &self.key
    }

    pub(crate) fn tier(&self) -> TierKind {
        self.tier
    }

    pub(crate) fn is_populated(&self) -> bool {
        self.populated
    }

    pub(crate) fn mark_populated(&mut self) {
        self.populated = true;
    }

    pub(crate) fn to_property_bag(&self, bag: &mut PropertyBag) {
        self.key.to_property_bag(bag);
    }

    /// Reads the key without committing it.
    pub(crate) fn read_key(&self, bag: &PropertyBag) -> Result<ActionKey, CacheError> {
        ActionKey::from_property_bag(self.key.kind(), bag)
    }

    pub(crate) fn commit(&mut self, key: ActionKey) {
        self.key = key;
        self.populated = true;
    }
}

/// The closed set of published results, as held by cache tiers.
#[derive(Clone, Debug)]
pub enum ActionResult {
    /// See [`RegionOfDefinitionResults`].
    RegionOfDefinition(Arc<RegionOfDefinitionResults>),
    /// See [`DistortionResults`].
    Distortion(Arc<DistortionResults>),
    /// See [`IdentityResults`].
    Identity(Arc<IdentityResults>),
    /// See [`FramesNeededResults`].
    FramesNeeded(Arc<FramesNeededResults>),
    /// See [`FrameRangeResults`].
    FrameRange(Arc<FrameRangeResults>),
    /// See [`TimeInvariantMetadataResults`].
    TimeInvariantMetadata(Arc<TimeInvariantMetadataResults>),
    /// See [`ComponentsResults`].
    Components(Arc<ComponentsResults>),
}

macro_rules! each_variant {
    ($value:expr, $r:ident => $body:expr) => {
        match $value {
            ActionResult::RegionOfDefinition($r) => $body,
            ActionResult::Distortion($r) => $body,
            ActionResult::Identity($r) => $body,
            ActionResult::FramesNeeded($r) => $body,
            ActionResult::FrameRange($r) => $body,
            ActionResult::TimeInvariantMetadata($r) => $body,
            ActionResult::Components($r) => $body,
        }
    };
}

impl ActionResult {
    /// The action kind of the wrapped result.
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionResult::RegionOfDefinition(_) => ActionKind::RegionOfDefinition,
            ActionResult::Distortion(_) => ActionKind::Distortion,
            ActionResult::Identity(_) => ActionKind::Identity,
            ActionResult::FramesNeeded(_) => ActionKind::FramesNeeded,
            ActionResult::FrameRange(_) => ActionKind::FrameRange,
            ActionResult::TimeInvariantMetadata(_) => ActionKind::TimeInvariantMetadata,
            ActionResult::Components(_) => ActionKind::Components,
        }
    }

    /// Persistence policy of the wrapped result.
    pub fn persistence(&self) -> Persistence {
        self.kind().persistence()
    }

    /// The key of the wrapped result.
    pub fn key(&self) -> &ActionKey {
        each_variant!(self, r => r.key())
    }

    /// The tier the wrapped result is bound to.
    pub fn tier(&self) -> TierKind {
        each_variant!(self, r => r.tier())
    }

    /// Whether the wrapped result has been populated.
    pub fn is_populated(&self) -> bool {
        each_variant!(self, r => r.is_populated())
    }

    /// Serializes the wrapped result.
    pub fn to_property_bag(&self, bag: &mut PropertyBag) -> Result<(), CacheError> {
        each_variant!(self, r => r.to_property_bag(bag))
    }

    /// Rebuilds a result of `key`'s kind from `bag`, bound to `tier`.
    pub fn from_property_bag<T: CacheTier + ?Sized>(
        key: ActionKey,
        tier: &T,
        locked_for_writing: bool,
        bag: &PropertyBag,
    ) -> Result<ActionResult, CacheError> {
        match key.kind() {
            ActionKind::RegionOfDefinition => {
                decode::<RegionOfDefinitionResults, T>(key, tier, locked_for_writing, bag)
            }
            ActionKind::TimeInvariantMetadata => {
                decode::<TimeInvariantMetadataResults, T>(key, tier, locked_for_writing, bag)
            }
            kind @ (ActionKind::Distortion
            | ActionKind::Identity
            | ActionKind::FramesNeeded
            | ActionKind::FrameRange
            | ActionKind::Components) => Err(unsupported(kind, Direction::Deserialize)),
        }
    }
}

fn decode<R: Persistable, T: CacheTier + ?Sized>(
    key: ActionKey,
    tier: &T,
    locked_for_writing: bool,
    bag: &PropertyBag,
) -> Result<ActionResult, CacheError> {
    let mut result = R::create(key, tier)?;
    result.from_property_bag(locked_for_writing, bag)?;
    Ok(Arc::new(result).into_action_result())
}

/// Implements the [`ActionResult`] conversions for a variant.
macro_rules! action_result_conversions {
    ($variant:ident) => {
        fn into_action_result(self: std::sync::Arc<Self>) -> $crate::entry::ActionResult {
            $crate::entry::ActionResult::$variant(self)
        }

        fn from_action_result(
            result: &$crate::entry::ActionResult,
        ) -> Option<std::sync::Arc<Self>> {
            match result {
                $crate::entry::ActionResult::$variant(r) => Some(std::sync::Arc::clone(r)),
                _ => None,
            }
        }
    };
}

pub(crate) use action_result_conversions;
