//! Trust-on-first-use identity pinning.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::{debug, warn};

use super::StoreError;
use crate::crypto::SignalPublicKey;
use crate::session::SessionAddress;

/// Identity trust decisions for remote addresses.
pub trait TrustStore {
    /// Whether `key` may be used for `address`.
    fn is_trusted(&self, address: &SessionAddress, key: &SignalPublicKey)
        -> Result<bool, StoreError>;

    /// Accepts `key` for `address`, replacing any earlier pin.
    fn pin(&self, address: &SessionAddress, key: &SignalPublicKey) -> Result<(), StoreError>;
}

/// Pins the first identity seen per address.
///
/// An unknown address is trusted. Once pinned, only the same key is trusted
/// until [`TrustStore::pin`] replaces it or [`TofuTrustStore::forget`]
/// clears it.
#[derive(Debug, Default)]
pub struct TofuTrustStore {
    pinned: RwLock<HashMap<SessionAddress, SignalPublicKey>>,
}

impl TofuTrustStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The identity currently pinned for `address`.
    pub fn pinned_key(&self, address: &SessionAddress) -> Result<Option<SignalPublicKey>, StoreError> {
        let pinned = self
            .pinned
            .read()
            .map_err(|_| StoreError::Poisoned("trust"))?;
        Ok(pinned.get(address).copied())
    }

    /// Drops the pin for `address`; the next identity seen is trusted.
    pub fn forget(&self, address: &SessionAddress) -> Result<bool, StoreError> {
        let mut pinned = self
            .pinned
            .write()
            .map_err(|_| StoreError::Poisoned("trust"))?;
        Ok(pinned.remove(address).is_some())
    }
}

impl TrustStore for TofuTrustStore {
    fn is_trusted(
        &self,
        address: &SessionAddress,
        key: &SignalPublicKey,
    ) -> Result<bool, StoreError> {
        let trusted = match self.pinned_key(address)? {
            Some(pinned) => pinned == *key,
            None => true,
        };
        if !trusted {
            warn!("Identity key for {} differs from pinned key", address);
        }
        Ok(trusted)
    }

    fn pin(&self, address: &SessionAddress, key: &SignalPublicKey) -> Result<(), StoreError> {
        let mut pinned = self
            .pinned
            .write()
            .map_err(|_| StoreError::Poisoned("trust"))?;
        if pinned.insert(address.clone(), *key).as_ref() != Some(key) {
            debug!("Pinned identity key for {}", address);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SignalKeyPair;

    #[test]
    fn test_unknown_address_is_trusted() {
        let store = TofuTrustStore::new();
        let address = SessionAddress::new("carol", 1);

        assert!(store
            .is_trusted(&address, &SignalKeyPair::random().public_key())
            .unwrap());
    }

    #[test]
    fn test_pinned_key_rejects_other_keys() {
        let store = TofuTrustStore::new();
        let address = SessionAddress::new("carol", 1);
        let first = SignalKeyPair::random().public_key();
        let second = SignalKeyPair::random().public_key();

        store.pin(&address, &first).unwrap();

        assert!(store.is_trusted(&address, &first).unwrap());
        assert!(!store.is_trusted(&address, &second).unwrap());
    }

    #[test]
    fn test_pins_are_per_address() {
        let store = TofuTrustStore::new();
        let key = SignalKeyPair::random().public_key();
        store.pin(&SessionAddress::new("carol", 1), &key).unwrap();

        let other_device = SessionAddress::new("carol", 2);
        assert!(store
            .is_trusted(&other_device, &SignalKeyPair::random().public_key())
            .unwrap());
    }

    #[test]
    fn test_repin_and_forget() {
        let store = TofuTrustStore::new();
        let address = SessionAddress::new("dave", 1);
        let old = SignalKeyPair::random().public_key();
        let new = SignalKeyPair::random().public_key();

        store.pin(&address, &old).unwrap();
        store.pin(&address, &new).unwrap();
        assert!(!store.is_trusted(&address, &old).unwrap());
        assert_eq!(store.pinned_key(&address).unwrap(), Some(new));

        assert!(store.forget(&address).unwrap());
        assert!(store.is_trusted(&address, &old).unwrap());
        assert!(!store.forget(&address).unwrap());
    }
}
