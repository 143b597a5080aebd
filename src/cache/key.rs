//! Cache Key Module
//!
//! Deterministic SHA-256 fingerprints over a namespace and a canonical JSON
//! rendering of the input.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Computes the cache key for `input` within `namespace`.
///
/// The input is first converted to a `serde_json::Value`, whose object maps
/// are key-ordered, so structurally equal inputs always serialize the same.
pub fn generate_key<T: Serialize + ?Sized>(input: &T, namespace: &str) -> Result<String> {
    let canonical = serde_json::to_string(&serde_json::to_value(input)?)?;

    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(b":");
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
