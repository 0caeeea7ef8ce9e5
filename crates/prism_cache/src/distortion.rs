//! Distortion results.
//!
//! A distortion is returned by the plug-in as a handle to memory it owns, so
//! these results never leave the producing process. The payload is wrapped
//! in [`ProcessLocal`], which deliberately implements no serialization, and
//! [`DistortionResults`] does not implement [`Persistable`](crate::Persistable).

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::entry::{action_result_conversions, CacheEntry, EntryBase};
use crate::error::CacheError;
use crate::key::{ActionKey, ActionKind};
use crate::tier::{CacheTier, TierKind};

/// A shared handle to a value that is only meaningful inside this process.
pub struct ProcessLocal<T: ?Sized>(Arc<T>);

impl<T> ProcessLocal<T> {
    /// Wraps a value.
    pub fn new(value: T) -> Self {
        Self(Arc::new(value))
    }
}

impl<T: ?Sized> ProcessLocal<T> {
    /// Wraps an existing shared value.
    pub fn from_arc(value: Arc<T>) -> Self {
        Self(value)
    }

    /// Returns `true` if both handles point at the same value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: ?Sized> Clone for ProcessLocal<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: ?Sized> Deref for ProcessLocal<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: fmt::Debug + ?Sized> fmt::Debug for ProcessLocal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProcessLocal").field(&&*self.0).finish()
    }
}

/// A row-major 3x3 homogeneous transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix3x3(pub [f64; 9]);

impl Matrix3x3 {
    /// The identity transform.
    pub const IDENTITY: Matrix3x3 = Matrix3x3([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);

    /// A pure translation.
    pub fn translation(tx: f64, ty: f64) -> Self {
        Matrix3x3([1.0, 0.0, tx, 0.0, 1.0, ty, 0.0, 0.0, 1.0])
    }

    /// A pure scale about the origin.
    pub fn scale(sx: f64, sy: f64) -> Self {
        Matrix3x3([sx, 0.0, 0.0, 0.0, sy, 0.0, 0.0, 0.0, 1.0])
    }

    /// Transforms a point, dividing by the homogeneous coordinate.
    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        let m = &self.0;
        let tx = m[0] * x + m[1] * y + m[2];
        let ty = m[3] * x + m[4] * y + m[5];
        let w = m[6] * x + m[7] * y + m[8];
        if w == 0.0 {
            (tx, ty)
        } else {
            (tx / w, ty / w)
        }
    }
}

/// A per-pixel distortion callback supplied by a plug-in.
pub type DistortionCallback = Arc<dyn Fn(f64, f64) -> (f64, f64) + Send + Sync>;

/// Geometric displacement applied by a node to one of its inputs.
///
/// Either a transform matrix, a plug-in callback, or both. The callback
/// takes precedence when evaluating.
#[derive(Clone)]
pub struct DistortionFunction2D {
    input_nb_to_distort: i32,
    transform: Option<Matrix3x3>,
    callback: Option<DistortionCallback>,
}

impl DistortionFunction2D {
    /// A distortion described by a transform matrix.
    pub fn from_transform(input_nb_to_distort: i32, transform: Matrix3x3) -> Self {
        Self {
            input_nb_to_distort,
            transform: Some(transform),
            callback: None,
        }
    }

    /// A distortion evaluated by a plug-in callback.
    pub fn from_callback(input_nb_to_distort: i32, callback: DistortionCallback) -> Self {
        Self {
            input_nb_to_distort,
            transform: None,
            callback: Some(callback),
        }
    }

    /// The input the distortion applies to.
    pub fn input_nb_to_distort(&self) -> i32 {
        self.input_nb_to_distort
    }

    /// The transform matrix, if any.
    pub fn transform(&self) -> Option<&Matrix3x3> {
        self.transform.as_ref()
    }

    /// Returns `true` if a plug-in callback is attached.
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Maps an output position to the input position it samples.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        match (&self.callback, &self.transform) {
            (Some(callback), _) => (**callback)(x, y),
            (None, Some(transform)) => transform.transform_point(x, y),
            (None, None) => (x, y),
        }
    }
}

impl fmt::Debug for DistortionFunction2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistortionFunction2D")
            .field("input_nb_to_distort", &self.input_nb_to_distort)
            .field("transform", &self.transform)
            .field("callback", &self.callback.as_ref().map(|_| "<plug-in>"))
            .finish()
    }
}

/// The distortion a node applies. In-process only.
#[derive(Clone, Debug)]
pub struct DistortionResults {
    base: EntryBase,
    distortion: Option<ProcessLocal<DistortionFunction2D>>,
}

impl DistortionResults {
    /// The distortion, or `None` until populated.
    pub fn results(&self) -> Option<&ProcessLocal<DistortionFunction2D>> {
        self.distortion.as_ref()
    }

    /// Sets the distortion.
    pub fn set_results(&mut self, distortion: ProcessLocal<DistortionFunction2D>) {
        self.distortion = Some(distortion);
        self.base.mark_populated();
    }
}

impl CacheEntry for DistortionResults {
    const KIND: ActionKind = ActionKind::Distortion;

    fn create<T: CacheTier + ?Sized>(key: ActionKey, tier: &T) -> Result<Self, CacheError> {
        Ok(Self {
            base: EntryBase::bind(Self::KIND, key, tier)?,
            distortion: None,
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

    action_result_conversions!(Distortion);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Direction;
    use crate::general::GeneralPurposeCache;
    use crate::persistent::PersistentCache;
    use crate::property::PropertyBag;
    use prism_common::RenderScale;

    fn key() -> ActionKey {
        ActionKey::new(ActionKind::Distortion, 5, RenderScale::IDENTITY, "net.prism.LensDistortion")
    }

    #[test]
    fn matrix_transforms_points() {
        assert_eq!(Matrix3x3::IDENTITY.transform_point(3.0, 4.0), (3.0, 4.0));
        assert_eq!(Matrix3x3::translation(1.0, -1.0).transform_point(3.0, 4.0), (4.0, 3.0));
        assert_eq!(Matrix3x3::scale(2.0, 0.5).transform_point(3.0, 4.0), (6.0, 2.0));
    }

    #[test]
    fn callback_takes_precedence() {
        let mut d = DistortionFunction2D::from_transform(0, Matrix3x3::translation(10.0, 0.0));
        assert_eq!(d.apply(1.0, 1.0), (11.0, 1.0));
        d.callback = Some(Arc::new(|x: f64, y: f64| (x * 2.0, y * 2.0)));
        assert_eq!(d.apply(1.0, 1.0), (2.0, 2.0));
        assert!(format!("{d:?}").contains("<plug-in>"));
    }

    #[test]
    fn set_and_get_shares_handle() {
        let tier = GeneralPurposeCache::new();
        let mut r = DistortionResults::create(key(), &tier).unwrap();
        assert!(r.results().is_none());
        let handle = ProcessLocal::new(DistortionFunction2D::from_callback(
            1,
            Arc::new(|x: f64, y: f64| (y, x)),
        ));
        r.set_results(handle.clone());
        assert!(r.is_populated());
        let stored = r.results().unwrap();
        assert!(stored.ptr_eq(&handle));
        assert_eq!(stored.apply(1.0, 2.0), (2.0, 1.0));
        assert_eq!(stored.input_nb_to_distort(), 1);
    }

    #[test]
    fn cannot_bind_to_persistent_tier() {
        let tier = PersistentCache::new(1);
        let err = DistortionResults::create(key(), &tier).unwrap_err();
        assert!(matches!(err, CacheError::TierMismatch { .. }));
    }

    #[test]
    fn serialization_fails_without_touching_bag() {
        let tier = GeneralPurposeCache::new();
        let mut r = DistortionResults::create(key(), &tier).unwrap();
        r.set_results(ProcessLocal::new(DistortionFunction2D::from_transform(
            0,
            Matrix3x3::IDENTITY,
        )));
        let mut bag = PropertyBag::new();
        let err = r.to_property_bag(&mut bag).unwrap_err();
        assert!(matches!(
            err,
            CacheError::SerializationUnsupported {
                direction: Direction::Serialize,
                ..
            }
        ));
        assert!(bag.is_empty());
        assert!(r.from_property_bag(true, &bag).is_err());
    }
}
