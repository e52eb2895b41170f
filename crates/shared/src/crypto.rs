//! Cryptographic utilities for admin key hashing.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compares two strings without short-circuiting on the first differing byte.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Returns true when `presented` hashes to the same digest as `expected`.
///
/// Both sides are hashed first so the comparison length never depends on
/// the secret.
pub fn key_matches(presented: &str, expected: &str) -> bool {
    constant_time_eq(&sha256_hex(presented), &sha256_hex(expected))
}
