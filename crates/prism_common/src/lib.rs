//! Shared foundational types used across the Prism render cache.
//!
//! This crate provides the streaming key hasher, content checksums, and the
//! small geometric and temporal value types that cache keys and results are
//! built from.

#![warn(missing_docs)]

pub mod geometry;
pub mod hash;
pub mod time;

pub use geometry::{RangeD, RectD, RectI, RenderScale};
pub use hash::{ContentHash, Hash64, HashAppend};
pub use time::{TimeValue, ViewIdx};
