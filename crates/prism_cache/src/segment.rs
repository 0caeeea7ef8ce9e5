//! Binary encoding of persisted property bags.
//!
//! A segment is a 4-byte little-endian header length, a bincode-encoded
//! [`SegmentHeader`], and the bincode-encoded [`PropertyBag`] payload. The
//! header carries magic bytes, a format version, the action kind, the key
//! hash, and a checksum of the payload, so a reader in another process can
//! reject stale or damaged segments before interpreting them.

use prism_common::ContentHash;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::key::ActionKind;
use crate::property::PropertyBag;

/// Magic bytes identifying a Prism cache segment.
pub const SEGMENT_MAGIC: [u8; 4] = *b"PRSM";

/// Header prepended to every persisted segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentHeader {
    /// Magic bytes: must be `b"PRSM"`.
    pub magic: [u8; 4],
    /// Segment format version.
    pub format_version: u32,
    /// [`ActionKind::unique_id`] of the stored result.
    pub kind_id: u32,
    /// [`ActionKey::hash`](crate::ActionKey::hash) of the stored result.
    pub key_hash: u64,
    /// Checksum of the payload bytes.
    pub checksum: ContentHash,
}

impl SegmentHeader {
    /// The action kind, if the ID is known.
    pub fn kind(&self) -> Option<ActionKind> {
        ActionKind::from_unique_id(self.kind_id)
    }
}

/// Encodes a property bag into a complete segment.
pub fn encode_segment(
    kind: ActionKind,
    key_hash: u64,
    format_version: u32,
    bag: &PropertyBag,
) -> Result<Vec<u8>, CacheError> {
    let config = bincode::config::standard();
    let payload = bincode::serde::encode_to_vec(bag, config).map_err(|e| {
        CacheError::Serialization {
            reason: e.to_string(),
        }
    })?;

    let header = SegmentHeader {
        magic: SEGMENT_MAGIC,
        format_version,
        kind_id: kind.unique_id(),
        key_hash,
        checksum: ContentHash::from_bytes(&payload),
    };
    let header_bytes = bincode::serde::encode_to_vec(&header, config).map_err(|e| {
        CacheError::Serialization {
            reason: e.to_string(),
        }
    })?;

    let header_len = header_bytes.len() as u32;
    let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
    output.extend_from_slice(&header_len.to_le_bytes());
    output.extend_from_slice(&header_bytes);
    output.extend_from_slice(&payload);
    Ok(output)
}

/// Decodes and validates a segment.
pub fn decode_segment(
    raw: &[u8],
    expected_version: u32,
) -> Result<(SegmentHeader, PropertyBag), CacheError> {
    let len_bytes: [u8; 4] = raw
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| CacheError::InvalidSegment {
            reason: "missing header length".to_string(),
        })?;
    let header_len = u32::from_le_bytes(len_bytes) as usize;
    let header_bytes = raw
        .get(4..4 + header_len)
        .ok_or_else(|| CacheError::InvalidSegment {
            reason: format!("header truncated: expected {header_len} bytes"),
        })?;

    let config = bincode::config::standard();
    let (header, _): (SegmentHeader, usize) =
        bincode::serde::decode_from_slice(header_bytes, config).map_err(|e| {
            CacheError::InvalidSegment {
                reason: e.to_string(),
            }
        })?;

    if header.magic != SEGMENT_MAGIC {
        return Err(CacheError::InvalidSegment {
            reason: "bad magic bytes".to_string(),
        });
    }
    if header.format_version != expected_version {
        return Err(CacheError::VersionMismatch {
            expected: expected_version,
            actual: header.format_version,
        });
    }

    let payload = &raw[4 + header_len..];
    let actual = ContentHash::from_bytes(payload);
    if actual != header.checksum {
        return Err(CacheError::ChecksumMismatch {
            expected: header.checksum.to_string(),
            actual: actual.to_string(),
        });
    }

    let (bag, _): (PropertyBag, usize) = bincode::serde::decode_from_slice(payload, config)
        .map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
    Ok((header, bag))
}
