//! Token sequence hashing.
//!
//! A rule text and a matched query region are compared by the SHA1 digest of
//! their token ids. The index keeps the digests of false positive rules so a
//! match whose matched query tokens are exactly such a text can be discarded.

use sha1::{Digest, Sha1};

use crate::license_detection::index::vocabulary::TokenId;

/// SHA1 digest of a token id sequence.
pub type TokenHash = [u8; 20];

/// Compute the digest of token ids, each serialized as two little-endian bytes.
pub fn compute_hash(tokens: &[TokenId]) -> TokenHash {
    let mut hasher = Sha1::new();
    for token in tokens {
        hasher.update(token.to_le_bytes());
    }
    hasher.finalize().into()
}
