//! Stable content hashing for plan fingerprints.
//!
//! Fingerprints let events and run summaries be correlated back to the
//! exact plan shape that produced them, without holding the plan itself.

use blake3::Hasher;
use serde::Serialize;

use crate::error::{Error, Result};

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

/// Hash any serde-serializable value deterministically (via JSON bytes).
/// Keyed with a domain prefix so unrelated hash uses can never collide.
pub fn hash_serde<T: Serialize>(domain: &str, v: &T) -> Result<Hash256> {
    let bytes = serde_json::to_vec(v).map_err(|e| Error::Hash(e.to_string()))?;
    let mut h = Hasher::new();
    h.update(domain.as_bytes());
    h.update(&[0]);
    h.update(&bytes);
    Ok(Hash256(h.finalize().into()))
}
