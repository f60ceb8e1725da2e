//! X3DH key agreement and the first double-ratchet step.
//!
//! Both roles run the same agreement. The role decides which local and
//! remote keys fill the four Diffie-Hellman slots and in which order the
//! first two secrets are concatenated:
//!
//! ```text
//! signed          = DH(their_signed,    our_identity)
//! identity        = DH(their_identity,  our_signed)
//! signed_identity = DH(their_signed,    our_signed)
//! ephemeral       = DH(their_ephemeral, our_ephemeral)   // only with a one-time prekey
//!
//! initiator: 0xFF*32 || signed   || identity || signed_identity [|| ephemeral]
//! responder: 0xFF*32 || identity || signed   || signed_identity [|| ephemeral]
//! ```
//!
//! The initiator's base key doubles as its signed key, and the responder
//! sees that same base key as both the remote ephemeral and remote signed key.

use zeroize::Zeroizing;

use super::chain::SessionChain;
use super::state::SessionState;
use crate::crypto::{
    derive_secrets, SignalKeyPair, SignalPublicKey, LABEL_MASTER_SECRET, LABEL_RATCHET,
};
use crate::KEY_LENGTH;

/// Leading pad of the master-secret input.
pub const DISCONTINUITY_BYTES: [u8; KEY_LENGTH] = [0xFF; KEY_LENGTH];

type Secret = Zeroizing<[u8; KEY_LENGTH]>;

/// Which side of the handshake we are, with the keys only that side has.
#[derive(Debug, Clone, Copy)]
pub enum AgreementRole<'a> {
    /// We fetched the peer's bundle and send the first message.
    Initiator {
        /// Fresh ephemeral key pair for this handshake.
        base_key: &'a SignalKeyPair,
        /// The peer's verified signed prekey.
        their_signed_pre_key: SignalPublicKey,
        /// The peer's one-time prekey, when the bundle carried one.
        their_one_time_pre_key: Option<SignalPublicKey>,
    },
    /// We received the peer's handshake message.
    Responder {
        /// Our signed prekey referenced by the message.
        our_signed_pre_key: &'a SignalKeyPair,
        /// Our one-time prekey referenced by the message, if still held.
        our_one_time_pre_key: Option<&'a SignalKeyPair>,
        /// The initiator's base key.
        their_base_key: SignalPublicKey,
    },
}

impl AgreementRole<'_> {
    pub fn is_initiator(&self) -> bool {
        matches!(self, Self::Initiator { .. })
    }
}

/// The keys feeding the four Diffie-Hellman computations.
#[derive(Debug, Clone, Copy)]
pub struct DhInputs<'a> {
    pub our_ephemeral: Option<&'a SignalKeyPair>,
    pub our_signed: &'a SignalKeyPair,
    pub their_ephemeral: Option<SignalPublicKey>,
    pub their_signed: SignalPublicKey,
}

impl<'a> DhInputs<'a> {
    /// Maps a role onto the DH slots.
    pub fn resolve(role: &AgreementRole<'a>) -> Self {
        match *role {
            AgreementRole::Initiator {
                base_key,
                their_signed_pre_key,
                their_one_time_pre_key,
            } => Self {
                our_ephemeral: Some(base_key),
                our_signed: base_key,
                their_ephemeral: their_one_time_pre_key,
                their_signed: their_signed_pre_key,
            },
            AgreementRole::Responder {
                our_signed_pre_key,
                our_one_time_pre_key,
                their_base_key,
            } => Self {
                our_ephemeral: our_one_time_pre_key,
                our_signed: our_signed_pre_key,
                their_ephemeral: Some(their_base_key),
                their_signed: their_base_key,
            },
        }
    }
}

/// The individual Diffie-Hellman outputs of one agreement.
pub struct AgreementSecrets {
    pub signed: Secret,
    pub identity: Secret,
    pub signed_identity: Secret,
    pub ephemeral: Option<Secret>,
}

impl AgreementSecrets {
    /// Runs the three or four Diffie-Hellman computations.
    pub fn compute(
        our_identity: &SignalKeyPair,
        their_identity: &SignalPublicKey,
        inputs: &DhInputs<'_>,
    ) -> Self {
        let ephemeral = match (inputs.their_ephemeral, inputs.our_ephemeral) {
            (Some(theirs), Some(ours)) => Some(ours.agree(&theirs)),
            _ => None,
        };

        Self {
            signed: our_identity.agree(&inputs.their_signed),
            identity: inputs.our_signed.agree(their_identity),
            signed_identity: inputs.our_signed.agree(&inputs.their_signed),
            ephemeral,
        }
    }

    /// Whether the optional fourth secret took part.
    pub fn uses_one_time_pre_key(&self) -> bool {
        self.ephemeral.is_some()
    }
}

/// Concatenates the secrets into the input of the master-secret derivation.
pub fn master_secret_input(is_initiator: bool, secrets: &AgreementSecrets) -> Zeroizing<Vec<u8>> {
    let (first, second) = if is_initiator {
        (&secrets.signed, &secrets.identity)
    } else {
        (&secrets.identity, &secrets.signed)
    };

    let mut input = Zeroizing::new(Vec::with_capacity(KEY_LENGTH * 5));
    input.extend_from_slice(&DISCONTINUITY_BYTES);
    input.extend_from_slice(&first[..]);
    input.extend_from_slice(&second[..]);
    input.extend_from_slice(&secrets.signed_identity[..]);
    if let Some(ephemeral) = &secrets.ephemeral {
        input.extend_from_slice(&ephemeral[..]);
    }
    input
}

/// Derives the initial root key from the agreement secrets.
pub fn derive_root_key(is_initiator: bool, secrets: &AgreementSecrets) -> Secret {
    let input = master_secret_input(is_initiator, secrets);
    let [root_key, _] = derive_secrets::<2>(&input, None, LABEL_MASTER_SECRET);
    root_key
}

/// One ratchet step: mixes `DH(their_ratchet_key, our_ratchet_key)` into
/// `root_key`, returning `(new_root_key, new_chain_key)`.
///
/// Both parties derive the same pair, each from its own private half.
pub fn derive_ratchet_keys(
    root_key: &[u8; KEY_LENGTH],
    their_ratchet_key: &SignalPublicKey,
    our_ratchet_key: &SignalKeyPair,
) -> (Secret, Secret) {
    let shared = our_ratchet_key.agree(their_ratchet_key);
    let [new_root_key, new_chain_key] =
        derive_secrets::<2>(&shared[..], Some(&root_key[..]), LABEL_RATCHET);
    (new_root_key, new_chain_key)
}

/// Opens the first sending chain of an initiator state.
///
/// Uses the state's own fresh ratchet key pair against the peer's ratchet
/// key, advances the root key and registers a chain at counter `-1` under
/// our ratchet public key.
pub fn calculate_sending_ratchet(
    state: &mut SessionState,
    their_ratchet_key: &SignalPublicKey,
    max_message_keys: usize,
) {
    let (root_key, chain_key) =
        derive_ratchet_keys(state.root_key(), their_ratchet_key, state.ephemeral_key_pair());
    let ratchet_public = state.ephemeral_key_pair().public_key();

    state.set_root_key(*root_key);
    state.add_chain(ratchet_public, SessionChain::new(-1, *chain_key, max_message_keys));
}

/// Runs the agreement for `role` and builds the resulting state.
///
/// Initiator states come back with their first sending chain; responder
/// states have no chain until the first message is decrypted.
pub fn create_state(
    our_identity: &SignalKeyPair,
    role: AgreementRole<'_>,
    their_identity: &SignalPublicKey,
    registration_id: u32,
    version: u32,
    max_message_keys: usize,
) -> SessionState {
    let inputs = DhInputs::resolve(&role);
    let secrets = AgreementSecrets::compute(our_identity, their_identity, &inputs);
    let root_key = derive_root_key(role.is_initiator(), &secrets);

    match role {
        AgreementRole::Initiator {
            base_key,
            their_signed_pre_key,
            ..
        } => {
            let mut state = SessionState::new(
                version,
                registration_id,
                base_key.public_key(),
                *their_identity,
                *root_key,
                SignalKeyPair::random(),
                their_signed_pre_key,
            );
            calculate_sending_ratchet(&mut state, &their_signed_pre_key, max_message_keys);
            state
        }
        AgreementRole::Responder {
            our_signed_pre_key,
            their_base_key,
            ..
        } => SessionState::new(
            version,
            registration_id,
            their_base_key,
            *their_identity,
            *root_key,
            our_signed_pre_key.clone(),
            their_base_key,
        ),
    }
}
