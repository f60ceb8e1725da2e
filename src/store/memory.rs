//! In-memory key store.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use super::trust::{TofuTrustStore, TrustStore};
use super::{KeyStore, StoreError};
use crate::crypto::{SignalKeyPair, SignalPreKeyPair, SignalPublicKey, SignalSignedKeyPair};
use crate::session::{Session, SessionAddress};

/// A [`KeyStore`] holding everything in lock-guarded maps.
///
/// Sessions are cloned in and out, so a caller mutating a looked-up
/// session must write it back with [`KeyStore::put_session`].
#[derive(Debug)]
pub struct InMemoryKeyStore {
    identity: SignalKeyPair,
    registration_id: u32,
    sessions: RwLock<HashMap<SessionAddress, Session>>,
    pre_keys: RwLock<HashMap<u32, SignalPreKeyPair>>,
    signed_pre_keys: RwLock<HashMap<u32, SignalSignedKeyPair>>,
    trust: TofuTrustStore,
}

impl InMemoryKeyStore {
    pub fn new(identity: SignalKeyPair, registration_id: u32) -> Self {
        Self {
            identity,
            registration_id,
            sessions: RwLock::new(HashMap::new()),
            pre_keys: RwLock::new(HashMap::new()),
            signed_pre_keys: RwLock::new(HashMap::new()),
            trust: TofuTrustStore::new(),
        }
    }

    pub fn registration_id(&self) -> u32 {
        self.registration_id
    }

    pub fn trust_store(&self) -> &TofuTrustStore {
        &self.trust
    }

    /// Adds or replaces a one-time prekey.
    pub fn store_pre_key(&self, pre_key: SignalPreKeyPair) {
        if let Ok(mut pre_keys) = self.pre_keys.write() {
            pre_keys.insert(pre_key.id(), pre_key);
        }
    }

    /// Removes a one-time prekey, typically after the peer consumed it.
    pub fn remove_pre_key(&self, id: u32) -> Option<SignalPreKeyPair> {
        let removed = self.pre_keys.write().ok()?.remove(&id);
        if removed.is_some() {
            debug!("Removed one-time prekey {}", id);
        }
        removed
    }

    /// Adds or replaces a signed prekey.
    pub fn store_signed_pre_key(&self, signed_pre_key: SignalSignedKeyPair) {
        if let Ok(mut signed_pre_keys) = self.signed_pre_keys.write() {
            signed_pre_keys.insert(signed_pre_key.id(), signed_pre_key);
        }
    }

    pub fn remove_signed_pre_key(&self, id: u32) -> Option<SignalSignedKeyPair> {
        self.signed_pre_keys.write().ok()?.remove(&id)
    }

    /// Number of stored sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }
}

impl KeyStore for InMemoryKeyStore {
    fn identity_key_pair(&self) -> &SignalKeyPair {
        &self.identity
    }

    fn has_trust(
        &self,
        address: &SessionAddress,
        identity_key: &SignalPublicKey,
    ) -> Result<bool, StoreError> {
        self.trust.is_trusted(address, identity_key)
    }

    fn trust_identity(
        &self,
        address: &SessionAddress,
        identity_key: &SignalPublicKey,
    ) -> Result<(), StoreError> {
        self.trust.pin(address, identity_key)
    }

    fn find_session_by_address(
        &self,
        address: &SessionAddress,
    ) -> Result<Option<Session>, StoreError> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| StoreError::Poisoned("sessions"))?;
        Ok(sessions.get(address).cloned())
    }

    fn put_session(&self, address: &SessionAddress, session: Session) -> Result<(), StoreError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| StoreError::Poisoned("sessions"))?;
        sessions.insert(address.clone(), session);
        Ok(())
    }

    fn find_pre_key_by_id(&self, id: u32) -> Result<Option<SignalPreKeyPair>, StoreError> {
        let pre_keys = self
            .pre_keys
            .read()
            .map_err(|_| StoreError::Poisoned("pre_keys"))?;
        Ok(pre_keys.get(&id).cloned())
    }

    fn find_signed_key_pair_by_id(
        &self,
        id: u32,
    ) -> Result<Option<SignalSignedKeyPair>, StoreError> {
        let signed_pre_keys = self
            .signed_pre_keys
            .read()
            .map_err(|_| StoreError::Poisoned("signed_pre_keys"))?;
        Ok(signed_pre_keys.get(&id).cloned())
    }
}
