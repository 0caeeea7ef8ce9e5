//! Plane and channel requirements of a node.

use std::collections::BTreeMap;
use std::fmt;

use prism_common::{TimeValue, ViewIdx};

use crate::entry::{action_result_conversions, CacheEntry, EntryBase};
use crate::error::CacheError;
use crate::identity::IdentityData;
use crate::key::{ActionKey, ActionKind};
use crate::tier::{CacheTier, TierKind};

/// Describes an image plane (layer) and its channels.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImagePlaneDesc {
    /// Unique identifier of the plane, e.g. `"Color"` or `"Backward.Motion"`.
    pub plane_id: String,
    /// User-facing plane label.
    pub plane_label: String,
    /// Label of the channel layout, e.g. `"RGBA"`.
    pub channels_label: String,
    /// Channel names in storage order.
    pub channels: Vec<String>,
}

impl ImagePlaneDesc {
    /// Creates a plane description.
    pub fn new(
        plane_id: impl Into<String>,
        plane_label: impl Into<String>,
        channels_label: impl Into<String>,
        channels: &[&str],
    ) -> Self {
        Self {
            plane_id: plane_id.into(),
            plane_label: plane_label.into(),
            channels_label: channels_label.into(),
            channels: channels.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// The color plane with four channels.
    pub fn rgba() -> Self {
        Self::new("Color", "Color", "RGBA", &["R", "G", "B", "A"])
    }

    /// The color plane with three channels.
    pub fn rgb() -> Self {
        Self::new("Color", "Color", "RGB", &["R", "G", "B"])
    }

    /// The color plane with only an alpha channel.
    pub fn alpha() -> Self {
        Self::new("Color", "Color", "Alpha", &["A"])
    }

    /// Number of channels.
    pub fn num_components(&self) -> usize {
        self.channels.len()
    }
}

/// Which of the R, G, B, A channels a node processes. Bit 0 is red.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessChannels(u8);

impl ProcessChannels {
    const MASK: u8 = 0b1111;

    /// All four channels.
    pub const ALL: ProcessChannels = ProcessChannels(Self::MASK);

    /// No channels.
    pub const NONE: ProcessChannels = ProcessChannels(0);

    /// Builds a mask from per-channel flags.
    pub fn new(r: bool, g: bool, b: bool, a: bool) -> Self {
        Self(u8::from(r) | (u8::from(g) << 1) | (u8::from(b) << 2) | (u8::from(a) << 3))
    }

    /// Builds a mask from its bits; bits above the fourth are ignored.
    pub fn from_bits(bits: u8) -> Self {
        Self(bits & Self::MASK)
    }

    /// The 4-bit mask.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Whether channel `index` (0 = R .. 3 = A) is processed.
    pub fn get(self, index: usize) -> bool {
        index < 4 && self.0 & (1 << index) != 0
    }

    /// Whether red is processed.
    pub fn r(self) -> bool {
        self.get(0)
    }

    /// Whether green is processed.
    pub fn g(self) -> bool {
        self.get(1)
    }

    /// Whether blue is processed.
    pub fn b(self) -> bool {
        self.get(2)
    }

    /// Whether alpha is processed.
    pub fn a(self) -> bool {
        self.get(3)
    }
}

impl Default for ProcessChannels {
    fn default() -> Self {
        Self::ALL
    }
}

/// Prints the mask bit 0 first, e.g. `1010` for red and blue.
impl fmt::Display for ProcessChannels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for index in 0..4 {
            f.write_str(if self.get(index) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl fmt::Debug for ProcessChannels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcessChannels({self})")
    }
}

/// Everything a components action reports.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentsData {
    /// Planes read from each input, keyed by input index.
    pub needed_input_planes: BTreeMap<i32, Vec<ImagePlaneDesc>>,
    /// Planes the node produces.
    pub produced_planes: Vec<ImagePlaneDesc>,
    /// Planes fetched from the pass-through input instead of produced.
    pub pass_through_planes: Vec<ImagePlaneDesc>,
    /// Input, time, and view that pass-through planes come from.
    pub pass_through: IdentityData,
    /// Channels the node processes.
    pub process_channels: ProcessChannels,
    /// Whether the node processes every plane it receives.
    pub process_all_layers: bool,
}

impl Default for ComponentsData {
    fn default() -> Self {
        Self {
            needed_input_planes: BTreeMap::new(),
            produced_planes: Vec::new(),
            pass_through_planes: Vec::new(),
            pass_through: IdentityData::NONE,
            process_channels: ProcessChannels::ALL,
            process_all_layers: false,
        }
    }
}

impl ComponentsData {
    /// Sets the pass-through source.
    pub fn with_pass_through(mut self, input_nb: i32, time: TimeValue, view: ViewIdx) -> Self {
        self.pass_through = IdentityData {
            input_nb,
            time,
            view,
        };
        self
    }
}

/// Planes and channels a node consumes and produces. In-process only.
#[derive(Clone, Debug)]
pub struct ComponentsResults {
    base: EntryBase,
    data: ComponentsData,
}

impl ComponentsResults {
    /// All reported data. Sentinel defaults until populated.
    pub fn results(&self) -> &ComponentsData {
        &self.data
    }

    /// Planes read from each input.
    pub fn needed_input_planes(&self) -> &BTreeMap<i32, Vec<ImagePlaneDesc>> {
        &self.data.needed_input_planes
    }

    /// Planes the node produces.
    pub fn produced_planes(&self) -> &[ImagePlaneDesc] {
        &self.data.produced_planes
    }

    /// Channels the node processes.
    pub fn process_channels(&self) -> ProcessChannels {
        self.data.process_channels
    }

    /// Sets all reported data.
    pub fn set_results(&mut self, data: ComponentsData) {
        self.data = data;
        self.base.mark_populated();
    }
}

impl CacheEntry for ComponentsResults {
    const KIND: ActionKind = ActionKind::Components;

    fn create<T: CacheTier + ?Sized>(key: ActionKey, tier: &T) -> Result<Self, CacheError> {
        Ok(Self {
            base: EntryBase::bind(Self::KIND, key, tier)?,
            data: ComponentsData::default(),
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

    action_result_conversions!(Components);
}
