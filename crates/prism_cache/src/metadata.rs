//! Time-invariant metadata results.
//!
//! [`NodeMetadata`] is a nested object with its own property-bag contract.
//! Its properties are prefixed with `Meta` so they never collide with the
//! key properties written by the enclosing result.

use std::sync::{Arc, OnceLock};

use prism_common::{Hash64, RectI};

use crate::entry::{action_result_conversions, CacheEntry, EntryBase, Persistable};
use crate::error::CacheError;
use crate::key::{ActionKey, ActionKind};
use crate::property::PropertyBag;
use crate::tier::{CacheTier, TierKind};

const PREMULT_PROPERTY: &str = "MetaPremult";
const FIELDING_PROPERTY: &str = "MetaFielding";
const FRAME_RATE_PROPERTY: &str = "MetaFrameRate";
const PAR_PROPERTY: &str = "MetaPAR";
const FORMAT_PROPERTY: &str = "MetaFormat";
const FRAME_VARYING_PROPERTY: &str = "MetaFrameVarying";
const CONTINUOUS_PROPERTY: &str = "MetaContinuous";
const INPUT_BIT_DEPTH_PROPERTY: &str = "MetaInputBitDepth";
const INPUT_PAR_PROPERTY: &str = "MetaInputPAR";

macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident = $code:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Stable wire code.
            pub fn code(self) -> i32 {
                match self {
                    $($name::$variant => $code),+
                }
            }

            /// Inverse of [`code`](Self::code).
            pub fn from_code(code: i32) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

coded_enum!(
    /// Alpha premultiplication state of an image.
    ImagePremultiplication {
        /// No alpha, or alpha is 1 everywhere.
        Opaque = 0,
        /// Color is multiplied by alpha.
        Premultiplied = 1,
        /// Color is not multiplied by alpha.
        UnPremultiplied = 2,
    }
);

coded_enum!(
    /// Field order of interlaced footage.
    ImageFieldingOrder {
        /// Progressive.
        None = 0,
        /// Lower field first.
        Lower = 1,
        /// Upper field first.
        Upper = 2,
    }
);

coded_enum!(
    /// Per-channel storage depth.
    ImageBitDepth {
        /// Unknown or unconnected.
        None = 0,
        /// 8-bit integer.
        Byte = 1,
        /// 16-bit integer.
        Short = 2,
        /// 16-bit float.
        Half = 3,
        /// 32-bit float.
        Float = 4,
    }
);

/// Metadata a node reports that does not change over time.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeMetadata {
    /// Premultiplication state of the output.
    pub output_premult: ImagePremultiplication,
    /// Field order of the output.
    pub output_fielding: ImageFieldingOrder,
    /// Output frame rate in frames per second.
    pub frame_rate: f64,
    /// Output pixel aspect ratio.
    pub pixel_aspect_ratio: f64,
    /// Output format in pixels.
    pub output_format: RectI,
    /// Whether the output changes from frame to frame.
    pub is_frame_varying: bool,
    /// Whether the output can be sampled at fractional times.
    pub is_continuous: bool,
    /// Bit depth expected on each input.
    pub input_bit_depths: Vec<ImageBitDepth>,
    /// Pixel aspect ratio of each input. Same length as `input_bit_depths`.
    pub input_pixel_aspect_ratios: Vec<f64>,
}

impl Default for NodeMetadata {
    fn default() -> Self {
        Self {
            output_premult: ImagePremultiplication::Premultiplied,
            output_fielding: ImageFieldingOrder::None,
            frame_rate: 24.0,
            pixel_aspect_ratio: 1.0,
            output_format: RectI::default(),
            is_frame_varying: false,
            is_continuous: false,
            input_bit_depths: Vec::new(),
            input_pixel_aspect_ratios: Vec::new(),
        }
    }
}

impl NodeMetadata {
    /// Number of inputs described.
    pub fn input_count(&self) -> usize {
        self.input_bit_depths.len()
    }

    /// Order-sensitive digest of every field.
    pub fn digest(&self) -> u64 {
        let mut hash = Hash64::new();
        hash.append(&self.output_premult.code());
        hash.append(&self.output_fielding.code());
        hash.append(&self.frame_rate);
        hash.append(&self.pixel_aspect_ratio);
        for edge in self.output_format.to_array() {
            hash.append(&edge);
        }
        hash.append(&self.is_frame_varying);
        hash.append(&self.is_continuous);
        hash.append(&(self.input_bit_depths.len() as u64));
        for (depth, par) in self
            .input_bit_depths
            .iter()
            .zip(&self.input_pixel_aspect_ratios)
        {
            hash.append(&depth.code());
            hash.append(par);
        }
        hash.value()
    }

    /// Writes every field to `bag`.
    pub fn to_property_bag(&self, bag: &mut PropertyBag) {
        bag.set_property(PREMULT_PROPERTY, self.output_premult.code());
        bag.set_property(FIELDING_PROPERTY, self.output_fielding.code());
        bag.set_property(FRAME_RATE_PROPERTY, self.frame_rate);
        bag.set_property(PAR_PROPERTY, self.pixel_aspect_ratio);
        bag.set_property_array(FORMAT_PROPERTY, &self.output_format.to_array());
        bag.set_property(FRAME_VARYING_PROPERTY, self.is_frame_varying);
        bag.set_property(CONTINUOUS_PROPERTY, self.is_continuous);
        let depths: Vec<i32> = self.input_bit_depths.iter().map(|d| d.code()).collect();
        bag.set_property_array(INPUT_BIT_DEPTH_PROPERTY, &depths);
        bag.set_property_array(INPUT_PAR_PROPERTY, &self.input_pixel_aspect_ratios);
    }

    /// Reads metadata back from `bag`.
    pub fn from_property_bag(bag: &PropertyBag) -> Result<Self, CacheError> {
        let output_premult = decode_code(bag, PREMULT_PROPERTY, ImagePremultiplication::from_code)?;
        let output_fielding = decode_code(bag, FIELDING_PROPERTY, ImageFieldingOrder::from_code)?;
        let frame_rate = bag.require_property::<f64>(FRAME_RATE_PROPERTY)?;
        let pixel_aspect_ratio = bag.require_property::<f64>(PAR_PROPERTY)?;
        let output_format = RectI::from(bag.require_property_n::<i32, 4>(FORMAT_PROPERTY)?);
        let is_frame_varying = bag.require_property::<bool>(FRAME_VARYING_PROPERTY)?;
        let is_continuous = bag.require_property::<bool>(CONTINUOUS_PROPERTY)?;

        let input_bit_depths = bag
            .require_property_array::<i32>(INPUT_BIT_DEPTH_PROPERTY)?
            .iter()
            .map(|&code| {
                ImageBitDepth::from_code(code)
                    .ok_or_else(|| invalid_code(INPUT_BIT_DEPTH_PROPERTY, code))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let input_pixel_aspect_ratios = bag
            .require_property_array::<f64>(INPUT_PAR_PROPERTY)?
            .to_vec();
        if input_pixel_aspect_ratios.len() != input_bit_depths.len() {
            return Err(CacheError::DeserializationFailed {
                property: INPUT_PAR_PROPERTY.to_string(),
                reason: format!(
                    "expected {} values, found {}",
                    input_bit_depths.len(),
                    input_pixel_aspect_ratios.len()
                ),
            });
        }

        Ok(Self {
            output_premult,
            output_fielding,
            frame_rate,
            pixel_aspect_ratio,
            output_format,
            is_frame_varying,
            is_continuous,
            input_bit_depths,
            input_pixel_aspect_ratios,
        })
    }
}

fn decode_code<T>(
    bag: &PropertyBag,
    property: &str,
    from_code: fn(i32) -> Option<T>,
) -> Result<T, CacheError> {
    let code = bag.require_property::<i32>(property)?;
    from_code(code).ok_or_else(|| invalid_code(property, code))
}

fn invalid_code(property: &str, code: i32) -> CacheError {
    CacheError::DeserializationFailed {
        property: property.to_string(),
        reason: format!("unknown code {code}"),
    }
}

/// Time-invariant metadata of a node. Persistable.
#[derive(Clone, Debug)]
pub struct TimeInvariantMetadataResults {
    base: EntryBase,
    metadata: Arc<NodeMetadata>,
    digest: OnceLock<u64>,
}

impl TimeInvariantMetadataResults {
    /// The metadata. [`NodeMetadata::default`] until populated.
    pub fn metadata(&self) -> &Arc<NodeMetadata> {
        &self.metadata
    }

    /// Sets the metadata.
    pub fn set_metadata(&mut self, metadata: impl Into<Arc<NodeMetadata>>) {
        self.metadata = metadata.into();
        self.digest = OnceLock::new();
        self.base.mark_populated();
    }

    /// Digest of the metadata, computed on first use.
    pub fn metadata_digest(&self) -> u64 {
        *self.digest.get_or_init(|| self.metadata.digest())
    }

    /// Returns `true` if the digest has already been computed.
    pub fn has_cached_digest(&self) -> bool {
        self.digest.get().is_some()
    }
}

impl CacheEntry for TimeInvariantMetadataResults {
    const KIND: ActionKind = ActionKind::TimeInvariantMetadata;

    fn create<T: CacheTier + ?Sized>(key: ActionKey, tier: &T) -> Result<Self, CacheError> {
        Ok(Self {
            base: EntryBase::bind(Self::KIND, key, tier)?,
            metadata: Arc::new(NodeMetadata::default()),
            digest: OnceLock::new(),
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
        self.metadata.to_property_bag(bag);
        Ok(())
    }

    fn from_property_bag(
        &mut self,
        locked_for_writing: bool,
        bag: &PropertyBag,
    ) -> Result<(), CacheError> {
        let key = self.base.read_key(bag)?;
        let metadata = NodeMetadata::from_property_bag(bag)?;
        let digest = OnceLock::new();
        if locked_for_writing {
            let value = digest.get_or_init(|| metadata.digest());
            tracing::trace!(digest = *value, "rebuilt metadata digest under write lock");
        }
        self.metadata = Arc::new(metadata);
        self.digest = digest;
        self.base.commit(key);
        Ok(())
    }

    action_result_conversions!(TimeInvariantMetadata);
}

impl Persistable for TimeInvariantMetadataResults {}
