//! Session establishment error types.

use thiserror::Error;

use super::address::SessionAddress;
use crate::crypto::KeyError;
use crate::store::StoreError;

/// Errors that can occur while establishing a session.
///
/// None of these are retried internally; every failure leaves the stored
/// session exactly as it was.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The peer's identity key is not trusted for this address.
    #[error("Untrusted identity key for {address}")]
    UntrustedIdentity {
        /// The address whose pinned identity did not match.
        address: SessionAddress,
    },

    /// The signed prekey's signature did not verify against the identity key.
    #[error("Signature mismatch for signed prekey {signed_pre_key_id}")]
    InvalidSignature {
        /// Id of the rejected signed prekey.
        signed_pre_key_id: u32,
    },

    /// A handshake referenced a signed prekey we no longer hold.
    #[error("Cannot find signed pre key with id {0}")]
    MissingSignedPreKey(u32),

    /// Malformed key material on the wire.
    #[error("Key error: {0}")]
    InvalidKey(#[from] KeyError),

    /// The key store failed a lookup or write.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A thread panicked while holding the session lock for this address.
    #[error("Session lock poisoned for {0}")]
    LockPoisoned(SessionAddress),
}
