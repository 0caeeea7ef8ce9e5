//! Cache keys identifying one action evaluation.

use std::fmt;

use prism_common::{Hash64, RenderScale, TimeValue, ViewIdx};

use crate::error::CacheError;
use crate::property::PropertyBag;

/// Property name of the node/time/view/variant hash.
pub const NODE_HASH_PROPERTY: &str = "NodeHash";
/// Property name of the render scale (2 x f64).
pub const SCALE_PROPERTY: &str = "Scale";
/// Property name of the holder plugin identifier.
pub const PLUGIN_ID_PROPERTY: &str = "PluginID";

/// The closed set of cacheable actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Bounding rectangle of the node's output.
    RegionOfDefinition,
    /// Geometric distortion applied by the node.
    Distortion,
    /// Whether the node passes one of its inputs through unchanged.
    Identity,
    /// Input frames required to render one output frame.
    FramesNeeded,
    /// Frame range the node can produce.
    FrameRange,
    /// Metadata that does not vary over time.
    TimeInvariantMetadata,
    /// Planes and channels consumed and produced.
    Components,
}

/// Whether results of an action may leave the producing process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Persistence {
    /// The payload is self-describing data and round-trips through a
    /// property bag.
    Persistable,
    /// The payload refers to memory owned by the producing process.
    ProcessLocal,
    /// The payload is plain data but is kept in-process only.
    InProcessOnly,
}

impl Persistence {
    /// Returns `true` for [`Persistence::Persistable`].
    pub fn is_persistable(self) -> bool {
        matches!(self, Persistence::Persistable)
    }
}

impl ActionKind {
    /// Every action kind, in unique-id order.
    pub const ALL: [ActionKind; 7] = [
        ActionKind::RegionOfDefinition,
        ActionKind::Distortion,
        ActionKind::Identity,
        ActionKind::FramesNeeded,
        ActionKind::FrameRange,
        ActionKind::TimeInvariantMetadata,
        ActionKind::Components,
    ];

    /// Stable identifier hashed in front of every key of this kind and
    /// stamped into persisted segment headers. Never renumber.
    pub fn unique_id(self) -> u32 {
        match self {
            ActionKind::RegionOfDefinition => 1,
            ActionKind::Distortion => 2,
            ActionKind::Identity => 3,
            ActionKind::FramesNeeded => 4,
            ActionKind::FrameRange => 5,
            ActionKind::TimeInvariantMetadata => 6,
            ActionKind::Components => 7,
        }
    }

    /// Inverse of [`unique_id`](Self::unique_id).
    pub fn from_unique_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.unique_id() == id)
    }

    /// Persistence policy of this action's results.
    pub fn persistence(self) -> Persistence {
        match self {
            ActionKind::RegionOfDefinition | ActionKind::TimeInvariantMetadata => {
                Persistence::Persistable
            }
            // The plug-in hands back a pointer to memory it owns.
            ActionKind::Distortion => Persistence::ProcessLocal,
            ActionKind::Identity
            | ActionKind::FramesNeeded
            | ActionKind::FrameRange
            | ActionKind::Components => Persistence::InProcessOnly,
        }
    }

    /// Human-readable name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ActionKind::RegionOfDefinition => "region of definition",
            ActionKind::Distortion => "distortion",
            ActionKind::Identity => "identity",
            ActionKind::FramesNeeded => "frames needed",
            ActionKind::FrameRange => "frame range",
            ActionKind::TimeInvariantMetadata => "time-invariant metadata",
            ActionKind::Components => "components",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Combines the identity of the producing node with the evaluation time,
/// view, and an optional render-variant tag into the single hash an
/// [`ActionKey`] carries.
pub fn node_time_view_variant_hash(
    node_hash: u64,
    time: TimeValue,
    view: ViewIdx,
    variant: Option<&str>,
) -> u64 {
    let mut hash = Hash64::new();
    hash.append(&node_hash);
    hash.append(&time);
    hash.append(&view);
    hash.append(&variant.is_some());
    if let Some(tag) = variant {
        hash.append(tag);
    }
    hash.value()
}

/// Identifies one evaluation of one action on one node.
///
/// Two keys are equal exactly when their kind, node hash, and the bit
/// patterns of both scale components are equal. The holder plugin ID is
/// carried for diagnostics and does not take part in hashing or equality.
#[derive(Clone, Debug)]
pub struct ActionKey {
    kind: ActionKind,
    node_time_view_variant_hash: u64,
    scale: RenderScale,
    holder_plugin_id: String,
}

impl ActionKey {
    /// Creates a key.
    pub fn new(
        kind: ActionKind,
        node_time_view_variant_hash: u64,
        scale: RenderScale,
        holder_plugin_id: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            node_time_view_variant_hash,
            scale,
            holder_plugin_id: holder_plugin_id.into(),
        }
    }

    /// The action this key identifies.
    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    /// The pre-combined node/time/view/variant hash.
    pub fn node_time_view_variant_hash(&self) -> u64 {
        self.node_time_view_variant_hash
    }

    /// The render scale.
    pub fn scale(&self) -> RenderScale {
        self.scale
    }

    /// Identifier of the plugin owning the node.
    pub fn holder_plugin_id(&self) -> &str {
        &self.holder_plugin_id
    }

    /// Appends the identifying fields, in fixed order: node hash, scale x,
    /// scale y.
    pub fn append_to_hash(&self, hash: &mut Hash64) {
        hash.append(&self.node_time_view_variant_hash);
        hash.append(&self.scale.x);
        hash.append(&self.scale.y);
    }

    /// Returns the 64-bit cache hash: the kind's unique ID followed by
    /// [`append_to_hash`](Self::append_to_hash).
    pub fn hash(&self) -> u64 {
        let mut hash = Hash64::new();
        hash.append(&self.kind.unique_id());
        self.append_to_hash(&mut hash);
        hash.value()
    }

    /// Writes the key fields to `bag`.
    pub fn to_property_bag(&self, bag: &mut PropertyBag) {
        bag.set_property(NODE_HASH_PROPERTY, self.node_time_view_variant_hash);
        bag.set_property_array(SCALE_PROPERTY, &self.scale.to_array());
        bag.set_property(PLUGIN_ID_PROPERTY, self.holder_plugin_id.clone());
    }

    /// Reads a key of the given kind back from `bag`.
    ///
    /// The kind is not part of the bag; the persistent tier records it in
    /// the segment header.
    pub fn from_property_bag(kind: ActionKind, bag: &PropertyBag) -> Result<Self, CacheError> {
        let node_time_view_variant_hash = bag.require_property::<u64>(NODE_HASH_PROPERTY)?;
        let scale = bag.require_property_n::<f64, 2>(SCALE_PROPERTY)?;
        let holder_plugin_id = bag
            .get_property::<String>(PLUGIN_ID_PROPERTY, 0)
            .unwrap_or_default();
        Ok(Self {
            kind,
            node_time_view_variant_hash,
            scale: RenderScale::from(scale),
            holder_plugin_id,
        })
    }
}

impl PartialEq for ActionKey {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.node_time_view_variant_hash == other.node_time_view_variant_hash
            && self.scale.x.to_bits() == other.scale.x.to_bits()
            && self.scale.y.to_bits() == other.scale.y.to_bits()
    }
}

impl Eq for ActionKey {}
