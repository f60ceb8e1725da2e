//! Cryptographic primitives for session establishment.
//!
//! This module provides:
//! - X25519 key pairs and the tagged public-key wire encoding
//! - Signed and one-time prekeys, local and published forms
//! - XEdDSA signatures made with X25519 identity keys
//! - HKDF-SHA256 derivation of root and chain keys

pub mod curve;
pub mod kdf;
pub mod keys;

pub use curve::{calculate_signature, verify_signature};
pub use kdf::{derive_secrets, LABEL_MASTER_SECRET, LABEL_RATCHET};
pub use keys::{
    KeyError, PreKeyBundle, SignalKeyPair, SignalPreKeyPair, SignalPublicKey,
    SignalSignedKeyPair, SignedPreKeyBundle, ENCODED_KEY_LENGTH,
};
