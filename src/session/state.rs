//! Ratchet state produced by one completed key agreement.

use std::collections::HashMap;

use zeroize::Zeroize;

use super::chain::SessionChain;
use crate::crypto::{SignalKeyPair, SignalPublicKey};
use crate::KEY_LENGTH;

/// Prekeys consumed by an outgoing handshake.
///
/// Kept on the initiator's state until the peer acknowledges the session so
/// that every outgoing envelope can tell the responder which local keys to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPreKey {
    pre_key_id: Option<u32>,
    base_key: SignalPublicKey,
    signed_pre_key_id: u32,
}

impl SessionPreKey {
    pub fn new(pre_key_id: Option<u32>, base_key: SignalPublicKey, signed_pre_key_id: u32) -> Self {
        Self {
            pre_key_id,
            base_key,
            signed_pre_key_id,
        }
    }

    pub fn pre_key_id(&self) -> Option<u32> {
        self.pre_key_id
    }

    pub fn base_key(&self) -> SignalPublicKey {
        self.base_key
    }

    pub fn signed_pre_key_id(&self) -> u32 {
        self.signed_pre_key_id
    }
}

/// Double-ratchet state for one session with a peer.
///
/// Chains are keyed by the ratchet public key that created them, so messages
/// still in flight on an older ratchet step can find their chain.
#[derive(Clone)]
pub struct SessionState {
    version: u32,
    remote_registration_id: u32,
    base_key: SignalPublicKey,
    remote_identity_key: SignalPublicKey,
    chains: HashMap<SignalPublicKey, SessionChain>,
    root_key: [u8; KEY_LENGTH],
    pending_pre_key: Option<SessionPreKey>,
    ephemeral_key_pair: SignalKeyPair,
    last_remote_ephemeral_key: SignalPublicKey,
    previous_counter: u32,
    closed: bool,
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("version", &self.version)
            .field("remote_registration_id", &self.remote_registration_id)
            .field("base_key", &self.base_key)
            .field("remote_identity_key", &self.remote_identity_key)
            .field("chains", &self.chains.len())
            .field("root_key", &"[REDACTED]")
            .field("pending_pre_key", &self.pending_pre_key)
            .field("ephemeral_key_pair", &self.ephemeral_key_pair)
            .field("last_remote_ephemeral_key", &self.last_remote_ephemeral_key)
            .field("previous_counter", &self.previous_counter)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Drop for SessionState {
    fn drop(&mut self) {
        self.root_key.zeroize();
    }
}

impl SessionState {
    /// Creates an open state with no chains.
    ///
    /// # Arguments
    ///
    /// * `version` - Protocol version of the handshake.
    /// * `remote_registration_id` - The peer's registration id.
    /// * `base_key` - The initiator's base key; identifies the handshake.
    /// * `remote_identity_key` - The peer's identity key.
    /// * `root_key` - Root key from the master-secret derivation.
    /// * `ephemeral_key_pair` - Our current ratchet key pair.
    /// * `last_remote_ephemeral_key` - The peer's last known ratchet key.
    pub fn new(
        version: u32,
        remote_registration_id: u32,
        base_key: SignalPublicKey,
        remote_identity_key: SignalPublicKey,
        root_key: [u8; KEY_LENGTH],
        ephemeral_key_pair: SignalKeyPair,
        last_remote_ephemeral_key: SignalPublicKey,
    ) -> Self {
        Self {
            version,
            remote_registration_id,
            base_key,
            remote_identity_key,
            chains: HashMap::new(),
            root_key,
            pending_pre_key: None,
            ephemeral_key_pair,
            last_remote_ephemeral_key,
            previous_counter: 0,
            closed: false,
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn remote_registration_id(&self) -> u32 {
        self.remote_registration_id
    }

    pub fn base_key(&self) -> SignalPublicKey {
        self.base_key
    }

    pub fn remote_identity_key(&self) -> SignalPublicKey {
        self.remote_identity_key
    }

    pub fn root_key(&self) -> &[u8; KEY_LENGTH] {
        &self.root_key
    }

    /// Replaces the root key, wiping the previous one.
    pub fn set_root_key(&mut self, root_key: [u8; KEY_LENGTH]) {
        self.root_key.zeroize();
        self.root_key = root_key;
    }

    pub fn ephemeral_key_pair(&self) -> &SignalKeyPair {
        &self.ephemeral_key_pair
    }

    pub fn last_remote_ephemeral_key(&self) -> SignalPublicKey {
        self.last_remote_ephemeral_key
    }

    pub fn previous_counter(&self) -> u32 {
        self.previous_counter
    }

    pub fn pending_pre_key(&self) -> Option<&SessionPreKey> {
        self.pending_pre_key.as_ref()
    }

    pub fn set_pending_pre_key(&mut self, pending: SessionPreKey) {
        self.pending_pre_key = Some(pending);
    }

    /// Drops the pending prekey once the peer has answered on this session.
    pub fn clear_pending_pre_key(&mut self) {
        self.pending_pre_key = None;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Marks this state as superseded. It stays usable for decryption.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Whether this state was created by the handshake `(version, base_key)`.
    pub fn matches(&self, version: u32, base_key: &SignalPublicKey) -> bool {
        self.version == version && &self.base_key == base_key
    }

    pub fn has_chain(&self, ratchet_key: &SignalPublicKey) -> bool {
        self.chains.contains_key(ratchet_key)
    }

    pub fn find_chain(&self, ratchet_key: &SignalPublicKey) -> Option<&SessionChain> {
        self.chains.get(ratchet_key)
    }

    pub fn find_chain_mut(&mut self, ratchet_key: &SignalPublicKey) -> Option<&mut SessionChain> {
        self.chains.get_mut(ratchet_key)
    }

    /// Registers a chain under the ratchet key that produced it.
    pub fn add_chain(&mut self, ratchet_key: SignalPublicKey, chain: SessionChain) {
        self.chains.insert(ratchet_key, chain);
    }

    pub fn chains(&self) -> impl Iterator<Item = (&SignalPublicKey, &SessionChain)> {
        self.chains.iter()
    }

    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }
}
