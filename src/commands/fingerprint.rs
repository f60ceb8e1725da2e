//! Short, comparable fingerprints of key material.

use sha2::{Digest, Sha256};

/// SHA-256 of `bytes` as eight 4-byte hex groups.
pub fn fingerprint(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    hash.chunks(4)
        .map(hex::encode_upper)
        .collect::<Vec<_>>()
        .join(" ")
}
