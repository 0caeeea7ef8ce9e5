//! Rectangles, ranges, and render scales.

use serde::{Deserialize, Serialize};

use crate::hash::{Hash64, HashAppend};

/// Per-axis scale factors a node is rendered at.
///
/// `1.0` on both axes is full resolution; proxy renders use smaller values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderScale {
    /// Horizontal scale factor.
    pub x: f64,
    /// Vertical scale factor.
    pub y: f64,
}

impl RenderScale {
    /// Full-resolution scale `(1.0, 1.0)`.
    pub const IDENTITY: RenderScale = RenderScale { x: 1.0, y: 1.0 };

    /// Creates a scale from its two components.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns the scale as `[x, y]`.
    pub fn to_array(self) -> [f64; 2] {
        [self.x, self.y]
    }
}

impl Default for RenderScale {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<[f64; 2]> for RenderScale {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl HashAppend for RenderScale {
    fn append_to(&self, hash: &mut Hash64) {
        hash.append(&self.x);
        hash.append(&self.y);
    }
}

/// An axis-aligned rectangle in canonical (floating-point) coordinates.
///
/// `(x1, y1)` is the bottom-left corner and `(x2, y2)` the top-right. A
/// rectangle with `x2 <= x1` or `y2 <= y1` is empty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RectD {
    /// Left edge.
    pub x1: f64,
    /// Bottom edge.
    pub y1: f64,
    /// Right edge.
    pub x2: f64,
    /// Top edge.
    pub y2: f64,
}

impl RectD {
    /// Creates a rectangle from its four edges.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Returns the width, which may be negative for malformed rectangles.
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    /// Returns the height, which may be negative for malformed rectangles.
    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Returns `true` if the rectangle encloses no area.
    pub fn is_empty(&self) -> bool {
        self.x2 <= self.x1 || self.y2 <= self.y1
    }

    /// Returns the edges as `[x1, y1, x2, y2]`.
    pub fn to_array(self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

impl From<[f64; 4]> for RectD {
    fn from([x1, y1, x2, y2]: [f64; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

/// An axis-aligned rectangle in pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RectI {
    /// Left edge.
    pub x1: i32,
    /// Bottom edge.
    pub y1: i32,
    /// Right edge (exclusive).
    pub x2: i32,
    /// Top edge (exclusive).
    pub y2: i32,
}

impl RectI {
    /// Creates a rectangle from its four edges.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Returns the edges as `[x1, y1, x2, y2]`.
    pub fn to_array(self) -> [i32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

impl From<[i32; 4]> for RectI {
    fn from([x1, y1, x2, y2]: [i32; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

/// A closed numeric range, used for frame ranges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeD {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

impl RangeD {
    /// Creates a range from its bounds.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Returns `true` if `value` lies within `[min, max]`.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_dimensions() {
        let r = RectD::new(-10.0, -10.0, 1920.0, 1080.0);
        assert_eq!(r.width(), 1930.0);
        assert_eq!(r.height(), 1090.0);
        assert!(!r.is_empty());
    }

    #[test]
    fn zero_area_rect_is_empty() {
        assert!(RectD::new(5.0, 5.0, 5.0, 10.0).is_empty());
        assert!(RectD::default().is_empty());
    }

    #[test]
    fn rect_array_conversions() {
        let r = RectD::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(RectD::from(r.to_array()), r);
        let i = RectI::new(0, 0, 640, 480);
        assert_eq!(RectI::from(i.to_array()), i);
    }

    #[test]
    fn scale_default_is_identity() {
        assert_eq!(RenderScale::default(), RenderScale::new(1.0, 1.0));
        assert_eq!(RenderScale::from([0.5, 0.25]).to_array(), [0.5, 0.25]);
    }

    #[test]
    fn scale_hash_is_order_sensitive() {
        let mut a = Hash64::new();
        a.append(&RenderScale::new(0.5, 1.0));
        let mut b = Hash64::new();
        b.append(&RenderScale::new(1.0, 0.5));
        assert_ne!(a.value(), b.value());
    }

    #[test]
    fn range_contains() {
        let r = RangeD::new(1.0, 100.0);
        assert!(r.contains(1.0));
        assert!(r.contains(100.0));
        assert!(!r.contains(100.5));
    }

    #[test]
    fn serde_roundtrip() {
        let r = RectD::new(-1.5, 0.0, 2.5, 3.0);
        let json = serde_json::to_string(&r).unwrap();
        let back: RectD = serde_json::from_str(&json).unwrap();
        assert_eq!(r, back);
    }
}
