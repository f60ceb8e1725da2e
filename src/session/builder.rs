//! Session establishment for both handshake roles.
//!
//! [`SessionBuilder`] ties the agreement in [`super::ratchet`] to the key
//! store: it checks trust and signatures, resolves local prekeys, builds a
//! [`SessionState`] and installs it into the address's [`Session`].
//!
//! Every check runs under the address lock before the session is touched,
//! so a failed call leaves the stored session exactly as it was. The peer
//! identity is pinned only once the session has been persisted.

use tracing::{debug, info, warn};

use super::address::SessionAddress;
use super::error::SessionError;
use super::lock::SessionLocks;
use super::message::PreKeyMessage;
use super::ratchet::{self, AgreementRole};
use super::record::Session;
use super::state::{SessionPreKey, SessionState};
use crate::config::SessionConfig;
use crate::crypto::{
    verify_signature, PreKeyBundle, SignalKeyPair, SignalPublicKey, SignedPreKeyBundle,
};
use crate::store::KeyStore;

/// What [`SessionBuilder::create_incoming`] did with a handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncomingOutcome {
    /// A new state was installed as current.
    Established,
    /// A state from this handshake already existed; nothing changed.
    Duplicate,
}

/// Builds sessions with one remote address.
pub struct SessionBuilder<'a, S: KeyStore + ?Sized> {
    address: &'a SessionAddress,
    store: &'a S,
    locks: &'a SessionLocks,
    config: &'a SessionConfig,
}

impl<'a, S: KeyStore + ?Sized> SessionBuilder<'a, S> {
    pub fn new(
        address: &'a SessionAddress,
        store: &'a S,
        locks: &'a SessionLocks,
        config: &'a SessionConfig,
    ) -> Self {
        Self {
            address,
            store,
            locks,
            config,
        }
    }

    pub fn address(&self) -> &SessionAddress {
        self.address
    }

    /// Establishes a session as initiator from the peer's published bundle.
    ///
    /// # Arguments
    ///
    /// * `registration_id` - The peer's registration id.
    /// * `identity_key` - The peer's tagged identity key.
    /// * `signed_pre_key` - The peer's signed prekey.
    /// * `pre_key` - The peer's one-time prekey, if the bundle had one.
    ///
    /// # Errors
    ///
    /// [`SessionError::UntrustedIdentity`] if the identity is not trusted for
    /// this address and [`SessionError::InvalidSignature`] if the signed
    /// prekey was not signed by it. The stored session is untouched on error.
    pub fn create_outgoing(
        &self,
        registration_id: u32,
        identity_key: &[u8],
        signed_pre_key: &SignedPreKeyBundle,
        pre_key: Option<&PreKeyBundle>,
    ) -> Result<(), SessionError> {
        let identity_key = SignalPublicKey::from_encoded(identity_key)?;

        self.locks.with_lock(self.address, || {
            self.check_trust(&identity_key)?;
            let state = self.initiate(&identity_key, registration_id, signed_pre_key, pre_key)?;

            let mut session = self.load_session()?;
            session.close_current_state().add_state(state);
            self.store.put_session(self.address, session)?;
            self.store.trust_identity(self.address, &identity_key)?;
            Ok::<_, SessionError>(())
        })??;

        info!(
            "Established outgoing session with {} ({})",
            self.address,
            if pre_key.is_some() { "4-DH" } else { "3-DH" }
        );
        Ok(())
    }

    /// Verifies the signed prekey and runs the initiator agreement.
    fn initiate(
        &self,
        identity_key: &SignalPublicKey,
        registration_id: u32,
        signed_pre_key: &SignedPreKeyBundle,
        pre_key: Option<&PreKeyBundle>,
    ) -> Result<SessionState, SessionError> {
        if !verify_signature(
            identity_key,
            &signed_pre_key.public_key.encoded(),
            &signed_pre_key.signature,
        ) {
            warn!(
                "Rejected signed prekey {} from {}: bad signature",
                signed_pre_key.id, self.address
            );
            return Err(SessionError::InvalidSignature {
                signed_pre_key_id: signed_pre_key.id,
            });
        }

        let base_key = SignalKeyPair::random();
        let mut state = self.create_state(
            AgreementRole::Initiator {
                base_key: &base_key,
                their_signed_pre_key: signed_pre_key.public_key,
                their_one_time_pre_key: pre_key.map(|k| k.public_key),
            },
            identity_key,
            registration_id,
            self.config.protocol_version,
        );
        state.set_pending_pre_key(SessionPreKey::new(
            pre_key.map(|k| k.id),
            base_key.public_key(),
            signed_pre_key.id,
        ));
        Ok(state)
    }

    /// Runs the key agreement for `role` with our identity key.
    pub fn create_state(
        &self,
        role: AgreementRole<'_>,
        their_identity_key: &SignalPublicKey,
        registration_id: u32,
        version: u32,
    ) -> SessionState {
        ratchet::create_state(
            self.store.identity_key_pair(),
            role,
            their_identity_key,
            registration_id,
            version,
            self.config.max_skipped_message_keys,
        )
    }

    /// Installs the responder state for `message` into `session`.
    ///
    /// A handshake already present in `session` is reported as
    /// [`IncomingOutcome::Duplicate`] without changes. A referenced one-time
    /// prekey we no longer hold is not an error; the agreement proceeds
    /// without it.
    ///
    /// # Errors
    ///
    /// [`SessionError::UntrustedIdentity`] for an untrusted sender identity
    /// and [`SessionError::MissingSignedPreKey`] if the referenced signed
    /// prekey is unknown. `session` is unchanged on error.
    pub fn create_incoming(
        &self,
        session: &mut Session,
        message: &PreKeyMessage,
    ) -> Result<IncomingOutcome, SessionError> {
        let identity_key = message.decode_identity_key()?;
        let base_key = message.decode_base_key()?;
        self.check_trust(&identity_key)?;

        if session.has_state(message.version(), &base_key) {
            debug!(
                "Ignoring duplicate handshake from {} (version {})",
                self.address,
                message.version()
            );
            return Ok(IncomingOutcome::Duplicate);
        }

        let one_time_pre_key = match message.pre_key_id() {
            Some(id) => {
                let found = self.store.find_pre_key_by_id(id)?;
                if found.is_none() {
                    debug!(
                        "One-time prekey {} from {} not found, using 3-DH",
                        id, self.address
                    );
                }
                found
            }
            None => None,
        };

        let signed_pre_key = self
            .store
            .find_signed_key_pair_by_id(message.signed_pre_key_id())?
            .ok_or_else(|| {
                warn!(
                    "Handshake from {} references unknown signed prekey {}",
                    self.address,
                    message.signed_pre_key_id()
                );
                SessionError::MissingSignedPreKey(message.signed_pre_key_id())
            })?;

        let state = self.create_state(
            AgreementRole::Responder {
                our_signed_pre_key: signed_pre_key.key_pair(),
                our_one_time_pre_key: one_time_pre_key.as_ref().map(|k| k.key_pair()),
                their_base_key: base_key,
            },
            &identity_key,
            message.registration_id(),
            message.version(),
        );
        session.close_current_state().add_state(state);

        Ok(IncomingOutcome::Established)
    }

    /// Looks up or creates the session for this address and applies
    /// `message` to it under the address lock, persisting on change.
    pub fn process_incoming(
        &self,
        message: &PreKeyMessage,
    ) -> Result<IncomingOutcome, SessionError> {
        let outcome = self.locks.with_lock(self.address, || {
            let mut session = self.load_session()?;
            let outcome = self.create_incoming(&mut session, message)?;
            if outcome == IncomingOutcome::Established {
                let identity_key = message.decode_identity_key()?;
                self.store.put_session(self.address, session)?;
                self.store.trust_identity(self.address, &identity_key)?;
            }
            Ok::<_, SessionError>(outcome)
        })??;

        if outcome == IncomingOutcome::Established {
            info!("Established incoming session with {}", self.address);
        }
        Ok(outcome)
    }

    fn check_trust(&self, identity_key: &SignalPublicKey) -> Result<(), SessionError> {
        if self.store.has_trust(self.address, identity_key)? {
            return Ok(());
        }
        warn!("Rejected untrusted identity key for {}", self.address);
        Err(SessionError::UntrustedIdentity {
            address: self.address.clone(),
        })
    }

    fn load_session(&self) -> Result<Session, SessionError> {
        Ok(self
            .store
            .find_session_by_address(self.address)?
            .unwrap_or_else(|| Session::with_max_states(self.config.max_archived_states)))
    }
}
