//! Integration tests for session establishment
//!
//! Both roles run against in-memory key stores:
//! - Initiator and responder agree on root and first chain keys
//! - Trust and signature failures leave stored sessions untouched
//! - Replayed handshakes are idempotent
//! - Missing one-time prekeys degrade to a 3-DH agreement
//! - Identities are pinned only after the session is persisted

use std::sync::{mpsc, Mutex};
use std::thread;
use std::time::Duration;

use signal_session::crypto::{derive_secrets, LABEL_MASTER_SECRET};
use signal_session::session::derive_ratchet_keys;
use signal_session::session::ratchet::{master_secret_input, AgreementSecrets, DhInputs};
use signal_session::{
    AgreementRole, InMemoryKeyStore, IncomingOutcome, KeyStore, PreKeyBundle, PreKeyMessage,
    Session, SessionAddress, SessionBuilder, SessionConfig, SessionError, SessionLocks,
    SignalKeyPair, SignalPreKeyPair, SignalPublicKey, SignalSignedKeyPair, SignedPreKeyBundle,
    StoreError, TrustStore, CURRENT_VERSION, KEY_TYPE,
};

const SIGNED_ID: u32 = 1;
const ONE_TIME_ID: u32 = 10;

struct Party {
    store: InMemoryKeyStore,
    locks: SessionLocks,
    signed: SignedPreKeyBundle,
    one_time: PreKeyBundle,
}

impl Party {
    fn new(registration_id: u32) -> Self {
        Self::with_identity(SignalKeyPair::random(), registration_id)
    }

    fn with_identity(identity: SignalKeyPair, registration_id: u32) -> Self {
        let store = InMemoryKeyStore::new(identity, registration_id);
        let signed = SignalSignedKeyPair::generate(SIGNED_ID, store.identity_key_pair());
        let one_time = SignalPreKeyPair::generate(ONE_TIME_ID);
        let signed_bundle = signed.to_bundle();
        let one_time_bundle = one_time.to_bundle();
        store.store_signed_pre_key(signed);
        store.store_pre_key(one_time);
        Self {
            store,
            locks: SessionLocks::new(),
            signed: signed_bundle,
            one_time: one_time_bundle,
        }
    }

    fn identity(&self) -> Vec<u8> {
        self.store.identity_key_pair().encoded_public_key().to_vec()
    }

    fn builder<'a>(
        &'a self,
        address: &'a SessionAddress,
        config: &'a SessionConfig,
    ) -> SessionBuilder<'a, InMemoryKeyStore> {
        SessionBuilder::new(address, &self.store, &self.locks, config)
    }

    fn session(&self, address: &SessionAddress) -> Session {
        self.store
            .find_session_by_address(address)
            .unwrap()
            .expect("session exists")
    }
}

fn alice_address() -> SessionAddress {
    SessionAddress::new("alice", 1)
}

fn bob_address() -> SessionAddress {
    SessionAddress::new("bob", 1)
}

/// Alice initiates against Bob; returns the handshake Bob would receive.
fn initiate(alice: &Party, bob: &Party, with_one_time: bool) -> PreKeyMessage {
    let config = SessionConfig::default();
    let address = bob_address();
    alice
        .builder(&address, &config)
        .create_outgoing(
            bob.store.registration_id(),
            &bob.identity(),
            &bob.signed,
            with_one_time.then_some(&bob.one_time),
        )
        .unwrap();

    let session = alice.session(&address);
    PreKeyMessage::from_pending(
        session.current_state().unwrap(),
        &alice.identity(),
        alice.store.registration_id(),
    )
    .expect("pending prekey recorded")
}

fn assert_keys_agree(alice: &Party, bob: &Party) {
    let alice_session = alice.session(&bob_address());
    let bob_session = bob.session(&alice_address());
    let alice_state = alice_session.current_state().unwrap();
    let bob_state = bob_session.current_state().unwrap();

    let ratchet = alice_state.ephemeral_key_pair().public_key();
    let (root, chain) =
        derive_ratchet_keys(bob_state.root_key(), &ratchet, bob_state.ephemeral_key_pair());

    assert_eq!(alice_state.root_key(), &*root);
    assert_eq!(alice_state.find_chain(&ratchet).unwrap().key(), &*chain);
}

/// Test initiator and responder derive identical root and chain keys
#[test]
fn test_agreement_with_one_time_prekey() {
    let alice = Party::new(1);
    let bob = Party::new(2);
    let config = SessionConfig::default();

    let message = initiate(&alice, &bob, true);
    assert_eq!(message.pre_key_id(), Some(ONE_TIME_ID));

    let outcome = bob
        .builder(&alice_address(), &config)
        .process_incoming(&message)
        .unwrap();

    assert_eq!(outcome, IncomingOutcome::Established);
    assert_keys_agree(&alice, &bob);
}

#[test]
fn test_agreement_without_one_time_prekey() {
    let alice = Party::new(1);
    let bob = Party::new(2);
    let config = SessionConfig::default();

    let message = initiate(&alice, &bob, false);
    assert_eq!(message.pre_key_id(), None);

    bob.builder(&alice_address(), &config)
        .process_incoming(&message)
        .unwrap();

    assert_keys_agree(&alice, &bob);
}

/// Test a one-time prekey id Bob no longer holds falls back to 3-DH
#[test]
fn test_missing_one_time_prekey_degrades_to_three_dh() {
    let bob = Party::new(2);
    let config = SessionConfig::default();
    let alice_identity = SignalKeyPair::random();
    let base = SignalKeyPair::random();

    let message_with = PreKeyMessage::new(
        CURRENT_VERSION,
        alice_identity.encoded_public_key(),
        1,
        base.encoded_public_key(),
        Some(ONE_TIME_ID),
        SIGNED_ID,
    );
    let message_missing = PreKeyMessage::new(
        CURRENT_VERSION,
        alice_identity.encoded_public_key(),
        1,
        base.encoded_public_key(),
        Some(999),
        SIGNED_ID,
    );

    let four_dh = SessionAddress::new("alice", 1);
    let three_dh = SessionAddress::new("alice", 2);
    bob.builder(&four_dh, &config)
        .process_incoming(&message_with)
        .unwrap();
    let outcome = bob
        .builder(&three_dh, &config)
        .process_incoming(&message_missing)
        .unwrap();
    assert_eq!(outcome, IncomingOutcome::Established);

    let four_dh_session = bob.session(&four_dh);
    let three_dh_session = bob.session(&three_dh);
    let root_4 = four_dh_session.current_state().unwrap().root_key();
    let root_3 = three_dh_session.current_state().unwrap().root_key();
    assert_ne!(root_4, root_3);

    // The 3-DH root matches an initiator that never saw a one-time prekey.
    let alice_store = InMemoryKeyStore::new(alice_identity, 1);
    let locks = SessionLocks::new();
    let bob_addr = bob_address();
    let initiator = SessionBuilder::new(&bob_addr, &alice_store, &locks, &config).create_state(
        AgreementRole::Initiator {
            base_key: &base,
            their_signed_pre_key: bob.signed.public_key,
            their_one_time_pre_key: None,
        },
        &bob.store.identity_key_pair().public_key(),
        2,
        CURRENT_VERSION,
    );
    let responder = three_dh_session.current_state().unwrap();
    let ratchet = initiator.ephemeral_key_pair().public_key();
    let (root, _) =
        derive_ratchet_keys(responder.root_key(), &ratchet, responder.ephemeral_key_pair());
    assert_eq!(initiator.root_key(), &*root);
}

/// Test the fixed-key scenario: A(IA, EA) against B(IB, SB, OB)
#[test]
fn test_scenario_fixed_keys() {
    let identity_a = SignalKeyPair::from_secret_bytes([0x11; 32]);
    let base_a = SignalKeyPair::from_secret_bytes([0x22; 32]);
    let bob = Party::with_identity(SignalKeyPair::from_secret_bytes([0x33; 32]), 2);
    let config = SessionConfig::default();

    let alice_store = InMemoryKeyStore::new(identity_a, 1);
    let locks = SessionLocks::new();
    let bob_addr = bob_address();
    let initiator = SessionBuilder::new(&bob_addr, &alice_store, &locks, &config).create_state(
        AgreementRole::Initiator {
            base_key: &base_a,
            their_signed_pre_key: bob.signed.public_key,
            their_one_time_pre_key: Some(bob.one_time.public_key),
        },
        &bob.store.identity_key_pair().public_key(),
        2,
        CURRENT_VERSION,
    );

    let message = PreKeyMessage::new(
        CURRENT_VERSION,
        alice_store.identity_key_pair().encoded_public_key(),
        1,
        base_a.encoded_public_key(),
        Some(bob.one_time.id),
        bob.signed.id,
    );
    bob.builder(&alice_address(), &config)
        .process_incoming(&message)
        .unwrap();

    let session = bob.session(&alice_address());
    let responder = session.current_state().unwrap();
    assert_eq!(responder.base_key(), base_a.public_key());
    assert_eq!(
        responder.remote_identity_key(),
        alice_store.identity_key_pair().public_key()
    );

    let ratchet = initiator.ephemeral_key_pair().public_key();
    let (root, chain) =
        derive_ratchet_keys(responder.root_key(), &ratchet, responder.ephemeral_key_pair());
    assert_eq!(initiator.root_key(), &*root);
    assert_eq!(initiator.find_chain(&ratchet).unwrap().key(), &*chain);
}

/// Test an untrusted identity is rejected without touching the session
#[test]
fn test_untrusted_identity_leaves_session_unmodified() {
    let alice = Party::new(1);
    let bob = Party::new(2);
    let config = SessionConfig::default();
    let address = bob_address();

    initiate(&alice, &bob, true);
    let before = alice.session(&address);

    // Bob's identity changed since Alice pinned it.
    let impostor = Party::new(2);
    let result = alice.builder(&address, &config).create_outgoing(
        2,
        &impostor.identity(),
        &impostor.signed,
        None,
    );

    assert!(matches!(
        result,
        Err(SessionError::UntrustedIdentity { ref address }) if address.name() == "bob"
    ));
    let after = alice.session(&address);
    assert_eq!(after.len(), before.len());
    assert_eq!(
        after.current_state().unwrap().root_key(),
        before.current_state().unwrap().root_key()
    );
    assert!(!after.current_state().unwrap().is_closed());
}

#[test]
fn test_untrusted_identity_without_existing_session() {
    let alice = Party::new(1);
    let bob = Party::new(2);
    let config = SessionConfig::default();
    let address = bob_address();

    alice
        .store
        .trust_store()
        .pin(&address, &SignalKeyPair::random().public_key())
        .unwrap();

    let result =
        alice
            .builder(&address, &config)
            .create_outgoing(2, &bob.identity(), &bob.signed, None);

    assert!(matches!(result, Err(SessionError::UntrustedIdentity { .. })));
    assert!(alice.store.find_session_by_address(&address).unwrap().is_none());
}

/// Test every altered signature byte is rejected
#[test]
fn test_tampered_signature_rejected() {
    let alice = Party::new(1);
    let bob = Party::new(2);
    let config = SessionConfig::default();
    let address = bob_address();

    initiate(&alice, &bob, true);
    let before = alice.session(&address);

    for i in 0..bob.signed.signature.len() {
        let mut tampered = bob.signed.clone();
        tampered.signature[i] ^= 0x01;

        let result = alice.builder(&address, &config).create_outgoing(
            2,
            &bob.identity(),
            &tampered,
            Some(&bob.one_time),
        );

        assert!(
            matches!(
                result,
                Err(SessionError::InvalidSignature { signed_pre_key_id: SIGNED_ID })
            ),
            "byte {} accepted",
            i
        );
    }

    let after = alice.session(&address);
    assert_eq!(after.len(), before.len());
    assert_eq!(
        after.current_state().unwrap().root_key(),
        before.current_state().unwrap().root_key()
    );
}

#[test]
fn test_substituted_signed_prekey_rejected() {
    let alice = Party::new(1);
    let bob = Party::new(2);
    let config = SessionConfig::default();
    let address = bob_address();

    let mut substituted = bob.signed.clone();
    substituted.public_key = SignalKeyPair::random().public_key();

    let result =
        alice
            .builder(&address, &config)
            .create_outgoing(2, &bob.identity(), &substituted, None);

    assert!(matches!(result, Err(SessionError::InvalidSignature { .. })));
    assert!(alice.store.find_session_by_address(&address).unwrap().is_none());
}

/// Test the same handshake delivered twice changes nothing
#[test]
fn test_duplicate_handshake_is_idempotent() {
    let alice = Party::new(1);
    let bob = Party::new(2);
    let config = SessionConfig::default();

    let message = initiate(&alice, &bob, true);
    let alice_addr = alice_address();
    let builder = bob.builder(&alice_addr, &config);

    assert_eq!(
        builder.process_incoming(&message).unwrap(),
        IncomingOutcome::Established
    );
    let first = bob.session(&alice_address());

    assert_eq!(
        builder.process_incoming(&message).unwrap(),
        IncomingOutcome::Duplicate
    );
    let second = bob.session(&alice_address());

    assert_eq!(second.len(), 1);
    assert_eq!(
        second.current_state().unwrap().root_key(),
        first.current_state().unwrap().root_key()
    );
    assert!(!second.current_state().unwrap().is_closed());
}

#[test]
fn test_create_incoming_duplicate_on_caller_session() {
    let alice = Party::new(1);
    let bob = Party::new(2);
    let config = SessionConfig::default();
    let message = initiate(&alice, &bob, false);
    let alice_addr = alice_address();
    let builder = bob.builder(&alice_addr, &config);

    let mut session = Session::new();
    assert_eq!(
        builder.create_incoming(&mut session, &message).unwrap(),
        IncomingOutcome::Established
    );
    let root = *session.current_state().unwrap().root_key();

    assert_eq!(
        builder.create_incoming(&mut session, &message).unwrap(),
        IncomingOutcome::Duplicate
    );
    assert_eq!(session.len(), 1);
    assert_eq!(session.current_state().unwrap().root_key(), &root);
}

/// Test an unknown signed prekey id fails the responder
#[test]
fn test_unknown_signed_prekey_fails() {
    let alice = Party::new(1);
    let bob = Party::new(2);
    let config = SessionConfig::default();

    let message = initiate(&alice, &bob, true);
    bob.store.remove_signed_pre_key(SIGNED_ID);

    let result = bob
        .builder(&alice_address(), &config)
        .process_incoming(&message);

    assert!(matches!(
        result,
        Err(SessionError::MissingSignedPreKey(SIGNED_ID))
    ));
    assert!(bob
        .store
        .find_session_by_address(&alice_address())
        .unwrap()
        .is_none());
}

#[test]
fn test_responder_rejects_untrusted_identity() {
    let alice = Party::new(1);
    let bob = Party::new(2);
    let config = SessionConfig::default();

    let message = initiate(&alice, &bob, true);
    bob.store
        .trust_store()
        .pin(&alice_address(), &SignalKeyPair::random().public_key())
        .unwrap();

    let result = bob
        .builder(&alice_address(), &config)
        .process_incoming(&message);

    assert!(matches!(result, Err(SessionError::UntrustedIdentity { .. })));
}

/// Test fresh initiator and responder states have the expected chains
#[test]
fn test_fresh_state_chain_counts() {
    let alice = Party::new(1);
    let bob = Party::new(2);
    let config = SessionConfig::default();

    let message = initiate(&alice, &bob, true);
    bob.builder(&alice_address(), &config)
        .process_incoming(&message)
        .unwrap();

    let alice_session = alice.session(&bob_address());
    let initiator = alice_session.current_state().unwrap();
    let ratchet = initiator.ephemeral_key_pair().public_key();
    assert_eq!(initiator.chain_count(), 1);
    assert_eq!(initiator.find_chain(&ratchet).unwrap().counter(), -1);
    assert_eq!(initiator.find_chain(&ratchet).unwrap().key().len(), 32);
    assert_eq!(initiator.root_key().len(), 32);

    let bob_session = bob.session(&alice_address());
    assert_eq!(bob_session.current_state().unwrap().chain_count(), 0);
}

/// Test the master-secret input starts with 32 bytes of 0xFF
#[test]
fn test_master_secret_input_header() {
    let alice_identity = SignalKeyPair::random();
    let bob_identity = SignalKeyPair::random();
    let bob_signed = SignalKeyPair::random();
    let base = SignalKeyPair::random();

    for one_time in [None, Some(SignalKeyPair::random().public_key())] {
        let role = AgreementRole::Initiator {
            base_key: &base,
            their_signed_pre_key: bob_signed.public_key(),
            their_one_time_pre_key: one_time,
        };
        let secrets = AgreementSecrets::compute(
            &alice_identity,
            &bob_identity.public_key(),
            &DhInputs::resolve(&role),
        );
        let input = master_secret_input(true, &secrets);

        assert_eq!(&input[..32], &[0xFF; 32]);
        assert_eq!(input.len() % 32, 0);

        let [root, chain] = derive_secrets::<2>(&input, None, LABEL_MASTER_SECRET);
        assert_eq!(root.len(), 32);
        assert_eq!(chain.len(), 32);
    }
}

/// Test re-handshakes keep one open state and bounded history
#[test]
fn test_rehandshake_closes_previous_state() {
    let alice = Party::new(1);
    let bob = Party::new(2);
    let config = SessionConfig {
        max_archived_states: 3,
        ..SessionConfig::default()
    };
    let address = bob_address();

    for _ in 0..5 {
        alice
            .builder(&address, &config)
            .create_outgoing(2, &bob.identity(), &bob.signed, None)
            .unwrap();

        let session = alice.session(&address);
        assert_eq!(session.open_state_count(), 1);
        assert!(!session.current_state().unwrap().is_closed());
    }

    let session = alice.session(&address);
    assert_eq!(session.len(), 3);
    assert!(session.states().skip(1).all(|s| s.is_closed()));
}

#[test]
fn test_handshake_message_keys_are_tagged() {
    let alice = Party::new(1);
    let bob = Party::new(2);

    let message = initiate(&alice, &bob, true);

    assert_eq!(message.identity_key().len(), 33);
    assert_eq!(message.identity_key()[0], KEY_TYPE);
    assert_eq!(message.base_key().len(), 33);
    assert_eq!(message.base_key()[0], KEY_TYPE);
    assert_eq!(message.version(), CURRENT_VERSION);
}

/// Test concurrent handshakes for one address lose no updates
#[test]
fn test_concurrent_handshakes_same_address() {
    let bob = Party::new(2);
    let config = SessionConfig::default();
    let address = alice_address();
    let identity = SignalKeyPair::random();

    thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                let message = PreKeyMessage::new(
                    CURRENT_VERSION,
                    identity.encoded_public_key(),
                    1,
                    SignalKeyPair::random().encoded_public_key(),
                    None,
                    SIGNED_ID,
                );
                let outcome = bob
                    .builder(&address, &config)
                    .process_incoming(&message)
                    .unwrap();
                assert_eq!(outcome, IncomingOutcome::Established);
            });
        }
    });

    let session = bob.session(&address);
    assert_eq!(session.len(), 8);
    assert_eq!(session.open_state_count(), 1);
    assert_eq!(bob.locks.active_addresses(), 0);
}

#[test]
fn test_concurrent_handshakes_distinct_addresses() {
    let bob = Party::new(2);
    let config = SessionConfig::default();

    thread::scope(|scope| {
        for device in 1..=4u32 {
            let bob = &bob;
            let config = &config;
            scope.spawn(move || {
                let address = SessionAddress::new("alice", device);
                let message = PreKeyMessage::new(
                    CURRENT_VERSION,
                    SignalKeyPair::random().encoded_public_key(),
                    device,
                    SignalKeyPair::random().encoded_public_key(),
                    Some(ONE_TIME_ID),
                    SIGNED_ID,
                );
                bob.builder(&address, config)
                    .process_incoming(&message)
                    .unwrap();
            });
        }
    });

    assert_eq!(bob.store.session_count(), 4);
}

/// Wraps an in-memory store so tests can stall the first trust check or
/// fail every session write.
struct HookedStore {
    inner: InMemoryKeyStore,
    on_first_trust_check: Mutex<Option<mpsc::Sender<()>>>,
    fail_writes: bool,
}

impl HookedStore {
    fn new(inner: InMemoryKeyStore) -> Self {
        Self {
            inner,
            on_first_trust_check: Mutex::new(None),
            fail_writes: false,
        }
    }
}

impl KeyStore for HookedStore {
    fn identity_key_pair(&self) -> &SignalKeyPair {
        self.inner.identity_key_pair()
    }

    fn has_trust(
        &self,
        address: &SessionAddress,
        identity_key: &SignalPublicKey,
    ) -> Result<bool, StoreError> {
        let trusted = self.inner.has_trust(address, identity_key)?;
        let signal = self.on_first_trust_check.lock().unwrap().take();
        if let Some(signal) = signal {
            signal.send(()).unwrap();
            // Give the competing handshake time to reach the address lock.
            thread::sleep(Duration::from_millis(50));
        }
        Ok(trusted)
    }

    fn trust_identity(
        &self,
        address: &SessionAddress,
        identity_key: &SignalPublicKey,
    ) -> Result<(), StoreError> {
        self.inner.trust_identity(address, identity_key)
    }

    fn find_session_by_address(
        &self,
        address: &SessionAddress,
    ) -> Result<Option<Session>, StoreError> {
        self.inner.find_session_by_address(address)
    }

    fn put_session(&self, address: &SessionAddress, session: Session) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        self.inner.put_session(address, session)
    }

    fn find_pre_key_by_id(&self, id: u32) -> Result<Option<SignalPreKeyPair>, StoreError> {
        self.inner.find_pre_key_by_id(id)
    }

    fn find_signed_key_pair_by_id(
        &self,
        id: u32,
    ) -> Result<Option<SignalSignedKeyPair>, StoreError> {
        self.inner.find_signed_key_pair_by_id(id)
    }
}

/// Test a second identity racing the first handshake for an unpinned
/// address is rejected once the first one is pinned
#[test]
fn test_racing_identity_cannot_replace_pin() {
    let bob = Party::new(2);
    let mallory = Party::new(2);
    let config = SessionConfig::default();
    let address = bob_address();
    let locks = SessionLocks::new();

    let (signal, checked) = mpsc::channel();
    let alice = HookedStore::new(InMemoryKeyStore::new(SignalKeyPair::random(), 1));
    *alice.on_first_trust_check.lock().unwrap() = Some(signal);
    let builder = SessionBuilder::new(&address, &alice, &locks, &config);

    let mallory_result = thread::scope(|scope| {
        let bob_handshake = scope.spawn(|| {
            builder.create_outgoing(2, &bob.identity(), &bob.signed, Some(&bob.one_time))
        });

        // Bob's trust check has passed and is still in flight.
        checked.recv().unwrap();
        let result = builder.create_outgoing(2, &mallory.identity(), &mallory.signed, None);

        bob_handshake.join().unwrap().unwrap();
        result
    });

    assert!(matches!(
        mallory_result,
        Err(SessionError::UntrustedIdentity { .. })
    ));
    assert_eq!(
        alice.inner.trust_store().pinned_key(&address).unwrap(),
        Some(bob.store.identity_key_pair().public_key())
    );

    let session = alice.inner.find_session_by_address(&address).unwrap().unwrap();
    assert_eq!(session.len(), 1);
    assert_eq!(
        session.current_state().unwrap().remote_identity_key(),
        bob.store.identity_key_pair().public_key()
    );
}

/// Test a failed session write leaves the initiator's identity unpinned
#[test]
fn test_failed_outgoing_write_does_not_pin() {
    let bob = Party::new(2);
    let config = SessionConfig::default();
    let address = bob_address();
    let locks = SessionLocks::new();
    let alice = HookedStore {
        fail_writes: true,
        ..HookedStore::new(InMemoryKeyStore::new(SignalKeyPair::random(), 1))
    };

    let result = SessionBuilder::new(&address, &alice, &locks, &config).create_outgoing(
        2,
        &bob.identity(),
        &bob.signed,
        Some(&bob.one_time),
    );

    assert!(matches!(
        result,
        Err(SessionError::Store(StoreError::Backend(_)))
    ));
    assert_eq!(alice.inner.trust_store().pinned_key(&address).unwrap(), None);
    assert!(alice.inner.find_session_by_address(&address).unwrap().is_none());

    // A different identity is still acceptable for the unpinned address.
    let other = Party::new(2);
    assert!(alice
        .inner
        .has_trust(&address, &other.store.identity_key_pair().public_key())
        .unwrap());
}

#[test]
fn test_failed_incoming_write_does_not_pin() {
    let alice = Party::new(1);
    let bob = Party::new(2);
    let config = SessionConfig::default();
    let message = initiate(&alice, &bob, true);

    let failing_bob = HookedStore {
        fail_writes: true,
        ..HookedStore::new(bob.store)
    };
    let address = alice_address();

    let result =
        SessionBuilder::new(&address, &failing_bob, &bob.locks, &config).process_incoming(&message);

    assert!(matches!(
        result,
        Err(SessionError::Store(StoreError::Backend(_)))
    ));
    assert_eq!(
        failing_bob.inner.trust_store().pinned_key(&address).unwrap(),
        None
    );
    assert!(failing_bob
        .inner
        .find_session_by_address(&address)
        .unwrap()
        .is_none());
}
