//! Key-store and trust contracts consumed by the session builder.
//!
//! The builder never owns key material or sessions itself. It reads the
//! local identity and prekeys, asks whether a peer identity is trusted and
//! writes the resulting [`Session`] back, all through [`KeyStore`].
//!
//! [`InMemoryKeyStore`] is a complete reference implementation backed by
//! lock-guarded maps.

pub mod memory;
pub mod trust;

pub use memory::InMemoryKeyStore;
pub use trust::{TofuTrustStore, TrustStore};

use thiserror::Error;

use crate::crypto::{SignalKeyPair, SignalPreKeyPair, SignalPublicKey, SignalSignedKeyPair};
use crate::session::{Session, SessionAddress};

/// Errors surfaced by a key-store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store lock poisoned: {0}")]
    Poisoned(&'static str),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Storage the session builder reads keys from and writes sessions to.
///
/// Lookups are synchronous and local. They may fail, but a missing entry
/// is `Ok(None)` rather than an error.
pub trait KeyStore {
    /// The local long-term identity key pair.
    fn identity_key_pair(&self) -> &SignalKeyPair;

    /// Whether `identity_key` is trusted for `address`.
    fn has_trust(
        &self,
        address: &SessionAddress,
        identity_key: &SignalPublicKey,
    ) -> Result<bool, StoreError>;

    /// Records `identity_key` as the accepted identity for `address`.
    ///
    /// Called once a session with that identity has been established.
    /// Stores without pinning keep the default no-op.
    fn trust_identity(
        &self,
        _address: &SessionAddress,
        _identity_key: &SignalPublicKey,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    fn find_session_by_address(
        &self,
        address: &SessionAddress,
    ) -> Result<Option<Session>, StoreError>;

    fn put_session(&self, address: &SessionAddress, session: Session) -> Result<(), StoreError>;

    fn find_pre_key_by_id(&self, id: u32) -> Result<Option<SignalPreKeyPair>, StoreError>;

    fn find_signed_key_pair_by_id(
        &self,
        id: u32,
    ) -> Result<Option<SignalSignedKeyPair>, StoreError>;
}
