//! Key hashing and content checksums.

use serde::{Deserialize, Serialize};
use std::fmt;
use xxhash_rust::xxh3::Xxh3;

/// A 128-bit content hash computed using XXH3 for integrity checks.
///
/// Used by the persistent tier to detect truncated or corrupted segments.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Computes a content hash from a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Self(hash.to_le_bytes())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// A value that can contribute its bytes to a [`Hash64`].
pub trait HashAppend {
    /// Feeds this value into the accumulator.
    fn append_to(&self, hash: &mut Hash64);
}

/// Streaming, order-sensitive 64-bit hash accumulator.
///
/// Values are appended one after another and the digest depends on both
/// their bytes and their order. Floating-point values contribute their exact
/// IEEE-754 bit pattern, so `0.0` and `-0.0` hash differently and no epsilon
/// is applied.
pub struct Hash64 {
    state: Xxh3,
}

impl Hash64 {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self { state: Xxh3::new() }
    }

    /// Appends a value to the accumulator.
    pub fn append<T: HashAppend + ?Sized>(&mut self, value: &T) {
        value.append_to(self);
    }

    /// Appends raw bytes.
    pub fn append_bytes(&mut self, bytes: &[u8]) {
        self.state.update(bytes);
    }

    /// Returns the digest of everything appended so far.
    pub fn value(&self) -> u64 {
        self.state.digest()
    }
}

impl Default for Hash64 {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Hash64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash64({:016x})", self.value())
    }
}

impl HashAppend for u64 {
    fn append_to(&self, hash: &mut Hash64) {
        hash.append_bytes(&self.to_le_bytes());
    }
}

impl HashAppend for u32 {
    fn append_to(&self, hash: &mut Hash64) {
        hash.append_bytes(&self.to_le_bytes());
    }
}

impl HashAppend for i32 {
    fn append_to(&self, hash: &mut Hash64) {
        hash.append_bytes(&self.to_le_bytes());
    }
}

impl HashAppend for bool {
    fn append_to(&self, hash: &mut Hash64) {
        hash.append_bytes(&[u8::from(*self)]);
    }
}

impl HashAppend for f64 {
    fn append_to(&self, hash: &mut Hash64) {
        hash.append_bytes(&self.to_bits().to_le_bytes());
    }
}

// Length prefix keeps ("ab", "c") and ("a", "bc") apart.
impl HashAppend for str {
    fn append_to(&self, hash: &mut Hash64) {
        hash.append(&(self.len() as u64));
        hash.append_bytes(self.as_bytes());
    }
}
