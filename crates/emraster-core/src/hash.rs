//! Stable hashing helpers for block plans and output digests.

use blake3::Hasher;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn to_hex(&self) -> String {
        let mut s = String::with_capacity(64);
        for b in &self.0 {
            use std::fmt::Write as _;
            let _ = write!(&mut s, "{:02x}", b);
        }
        s
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

pub fn hash_bytes(bytes: &[u8]) -> Hash256 {
    let mut h = Hasher::new();
    h.update(bytes);
    Hash256(h.finalize().into())
}

/// Hash any serde-serializable value deterministically (via JSON).
pub fn hash_serde<T: Serialize>(v: &T) -> Result<Hash256, crate::error::Error> {
    let bytes = serde_json::to_vec(v)?;
    Ok(hash_bytes(&bytes))
}

/// Incremental digest over cell values, fed one block at a time.
///
/// NaN payloads are canonicalised so every NA hashes the same.
pub struct CellDigest {
    inner: Hasher,
    cells: u64,
}

impl CellDigest {
    pub fn new() -> Self {
        Self {
            inner: Hasher::new(),
            cells: 0,
        }
    }

    pub fn update(&mut self, cells: &[f64]) {
        for v in cells {
            let bits = if v.is_nan() {
                f64::NAN.to_bits()
            } else {
                v.to_bits()
            };
            self.inner.update(&bits.to_le_bytes());
        }
        self.cells += cells.len() as u64;
    }

    /// Cells fed so far.
    pub fn cells(&self) -> u64 {
        self.cells
    }

    pub fn finish(&self) -> Hash256 {
        Hash256(self.inner.finalize().into())
    }
}

impl Default for CellDigest {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_split_invariant() {
        let mut whole = CellDigest::new();
        whole.update(&[1.0, 2.0, 3.0, 4.0]);

        let mut parts = CellDigest::new();
        parts.update(&[1.0]);
        parts.update(&[2.0, 3.0]);
        parts.update(&[4.0]);

        assert_eq!(whole.finish(), parts.finish());
        assert_eq!(parts.cells(), 4);
    }

    #[test]
    fn nan_payloads_hash_alike() {
        let odd_nan = f64::from_bits(f64::NAN.to_bits() | 1);
        let mut a = CellDigest::new();
        a.update(&[odd_nan]);
        let mut b = CellDigest::new();
        b.update(&[f64::NAN]);
        assert_eq!(a.finish(), b.finish());
    }

    #[test]
    fn hex_is_64_chars() {
        assert_eq!(hash_bytes(b"emraster").to_hex().len(), 64);
    }
}
