//! Handshake descriptor carried by the initiator's first messages.

use super::state::SessionState;
use crate::crypto::{KeyError, SignalPublicKey};

/// The handshake fields of an inbound prekey message.
///
/// Keys are kept in their tagged wire form; they are validated and the tag
/// stripped only when the responder uses them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreKeyMessage {
    version: u32,
    identity_key: Vec<u8>,
    registration_id: u32,
    base_key: Vec<u8>,
    pre_key_id: Option<u32>,
    signed_pre_key_id: u32,
}

impl PreKeyMessage {
    pub fn new(
        version: u32,
        identity_key: impl Into<Vec<u8>>,
        registration_id: u32,
        base_key: impl Into<Vec<u8>>,
        pre_key_id: Option<u32>,
        signed_pre_key_id: u32,
    ) -> Self {
        Self {
            version,
            identity_key: identity_key.into(),
            registration_id,
            base_key: base_key.into(),
            pre_key_id,
            signed_pre_key_id,
        }
    }

    /// Builds the descriptor an initiator attaches while its handshake is
    /// unacknowledged.
    ///
    /// Returns `None` once the state no longer records a pending prekey.
    pub fn from_pending(
        state: &SessionState,
        identity_key: &[u8],
        registration_id: u32,
    ) -> Option<Self> {
        let pending = state.pending_pre_key()?;
        Some(Self::new(
            state.version(),
            identity_key,
            registration_id,
            pending.base_key().encoded(),
            pending.pre_key_id(),
            pending.signed_pre_key_id(),
        ))
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Sender identity key, tagged.
    pub fn identity_key(&self) -> &[u8] {
        &self.identity_key
    }

    pub fn registration_id(&self) -> u32 {
        self.registration_id
    }

    /// Sender base key, tagged.
    pub fn base_key(&self) -> &[u8] {
        &self.base_key
    }

    pub fn pre_key_id(&self) -> Option<u32> {
        self.pre_key_id
    }

    pub fn signed_pre_key_id(&self) -> u32 {
        self.signed_pre_key_id
    }

    pub(crate) fn decode_identity_key(&self) -> Result<SignalPublicKey, KeyError> {
        SignalPublicKey::from_encoded(&self.identity_key)
    }

    pub(crate) fn decode_base_key(&self) -> Result<SignalPublicKey, KeyError> {
        SignalPublicKey::from_encoded(&self.base_key)
    }
}
