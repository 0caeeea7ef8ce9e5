//! Typed, content-addressed result cache for per-node render actions.
//!
//! Each cacheable action (region of definition, identity detection, frame
//! range, ...) is modelled as an [`ActionKey`] and a result type implementing
//! [`CacheEntry`]. Results live in one of two tiers: the in-process
//! [`GeneralPurposeCache`], which can hold anything, and the cross-process
//! [`PersistentCache`], which only accepts results whose payload survives a
//! round trip through a [`PropertyBag`].

#![warn(missing_docs)]

pub mod components;
pub mod distortion;
pub mod entry;
pub mod error;
pub mod frame_range;
pub mod frames_needed;
pub mod general;
pub mod identity;
pub mod key;
mod lock;
pub mod lookup;
pub mod metadata;
pub mod persistent;
pub mod property;
pub mod rod;
pub mod segment;
pub mod tier;

pub use components::{ComponentsData, ComponentsResults, ImagePlaneDesc, ProcessChannels};
pub use distortion::{
    DistortionCallback, DistortionFunction2D, DistortionResults, Matrix3x3, ProcessLocal,
};
pub use entry::{ActionResult, CacheEntry, Persistable};
pub use error::{CacheError, Direction};
pub use frame_range::FrameRangeResults;
pub use frames_needed::{FrameRangesMap, FramesNeededMap, FramesNeededResults};
pub use general::GeneralPurposeCache;
pub use identity::{IdentityData, IdentityResults};
pub use key::{node_time_view_variant_hash, ActionKey, ActionKind, Persistence};
pub use lookup::fetch_or_compute;
pub use metadata::{
    ImageBitDepth, ImageFieldingOrder, ImagePremultiplication, NodeMetadata,
    TimeInvariantMetadataResults,
};
pub use persistent::PersistentCache;
pub use property::{PropertyBag, PropertyType, PropertyValues};
pub use rod::RegionOfDefinitionResults;
pub use tier::{CacheTier, CacheTierExt, TierKind};
