//! Evaluation time and view indices.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hash::{Hash64, HashAppend};

/// A point on the timeline, in frames. May be fractional for motion blur
/// and retiming.
#[derive(Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct TimeValue(f64);

impl TimeValue {
    /// Frame zero.
    pub const ZERO: TimeValue = TimeValue(0.0);

    /// Creates a time value from a frame number.
    pub fn new(frame: f64) -> Self {
        Self(frame)
    }

    /// Returns the frame number.
    pub fn frame(self) -> f64 {
        self.0
    }
}

impl From<f64> for TimeValue {
    fn from(frame: f64) -> Self {
        Self(frame)
    }
}

impl fmt::Debug for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimeValue({})", self.0)
    }
}

impl HashAppend for TimeValue {
    fn append_to(&self, hash: &mut Hash64) {
        hash.append(&self.0);
    }
}

/// Index of a view in a multi-view (e.g. stereo) project. View `0` is the
/// main view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ViewIdx(i32);

impl ViewIdx {
    /// The main view.
    pub const MAIN: ViewIdx = ViewIdx(0);

    /// Creates a view index.
    pub fn new(index: i32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    pub fn index(self) -> i32 {
        self.0
    }
}

impl From<i32> for ViewIdx {
    fn from(index: i32) -> Self {
        Self(index)
    }
}

impl HashAppend for ViewIdx {
    fn append_to(&self, hash: &mut Hash64) {
        hash.append(&self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_zero() {
        assert_eq!(TimeValue::default().frame(), 0.0);
        assert_eq!(ViewIdx::default(), ViewIdx::MAIN);
    }

    #[test]
    fn views_are_ordered() {
        assert!(ViewIdx::new(0) < ViewIdx::new(1));
    }

    #[test]
    fn time_debug_shows_frame() {
        assert_eq!(format!("{:?}", TimeValue::new(12.5)), "TimeValue(12.5)");
    }

    #[test]
    fn serde_roundtrip() {
        let t = TimeValue::new(24.0);
        let json = serde_json::to_string(&t).unwrap();
        let back: TimeValue = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
    }
}
