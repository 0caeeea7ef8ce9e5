//! Error types for cache operations.

use std::fmt;
use std::path::PathBuf;

use crate::key::ActionKind;
use crate::tier::TierKind;

/// Which way a result was being moved through a property bag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Writing a result into a bag.
    Serialize,
    /// Reading a result out of a bag.
    Deserialize,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Serialize => f.write_str("written to"),
            Direction::Deserialize => f.write_str("read from"),
        }
    }
}

/// Errors that can occur during cache operations.
///
/// Reads from the persistent tier are fail-safe: errors for which
/// [`is_recoverable`](Self::is_recoverable) holds are turned into cache
/// misses. The remaining variants indicate miswired callers and propagate.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// A property was missing, had the wrong type, or had the wrong arity.
    #[error("failed to deserialize property '{property}': {reason}")]
    DeserializationFailed {
        /// The property name.
        property: String,
        /// What was wrong with it.
        reason: String,
    },

    /// An in-process-only result reached a persistent-tier code path.
    #[error("{kind} results cannot be {direction} a persistent cache")]
    SerializationUnsupported {
        /// The offending action kind.
        kind: ActionKind,
        /// Whether it was being written or read.
        direction: Direction,
    },

    /// A result was bound to, or stored in, a tier it may not live in.
    #[error("{kind} results cannot be held by the {tier} tier")]
    TierMismatch {
        /// The action kind of the result.
        kind: ActionKind,
        /// The tier it was offered to.
        tier: TierKind,
    },

    /// A key of one kind was used to create a result of another.
    #[error("key kind mismatch: expected {expected}, got {actual}")]
    KeyKindMismatch {
        /// The kind the result type handles.
        expected: ActionKind,
        /// The kind of the key supplied.
        actual: ActionKind,
    },

    /// A result was stored before its payload was set.
    #[error("{kind} result stored before being populated")]
    Unpopulated {
        /// The action kind of the result.
        kind: ActionKind,
    },

    /// An I/O error occurred while reading or writing segment files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A persisted segment has an invalid or missing header.
    #[error("invalid segment: {reason}")]
    InvalidSegment {
        /// Description of the header problem.
        reason: String,
    },

    /// The stored checksum does not match the checksum of the payload.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The checksum recorded in the header.
        expected: String,
        /// The checksum computed from the payload.
        actual: String,
    },

    /// The segment format version does not match the configured version.
    #[error("segment version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The configured segment version.
        expected: u32,
        /// The version found in the segment.
        actual: u32,
    },

    /// A bincode encoding or decoding error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

impl CacheError {
    /// Shorthand for a missing property.
    pub fn missing(property: &str) -> Self {
        CacheError::DeserializationFailed {
            property: property.to_string(),
            reason: "property is absent".to_string(),
        }
    }

    /// Returns `true` for errors a reader should treat as a cache miss.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CacheError::DeserializationFailed { .. }
                | CacheError::InvalidSegment { .. }
                | CacheError::ChecksumMismatch { .. }
                | CacheError::VersionMismatch { .. }
                | CacheError::Serialization { .. }
        )
    }
}
