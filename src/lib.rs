//! # signal-session - X3DH session establishment
//!
//! Builds end-to-end encrypted sessions between two devices using an
//! X3DH-style key agreement followed by the first step of the double ratchet.
//!
//! ## Overview
//!
//! - The **initiator** fetches the peer's published prekey bundle (identity key,
//!   signed prekey, optional one-time prekey), verifies it and derives a session
//!   with a ready sending chain ([`SessionBuilder::create_outgoing`]).
//! - The **responder** receives the initiator's handshake descriptor
//!   ([`PreKeyMessage`]), resolves its own prekeys by id and derives the same
//!   root key ([`SessionBuilder::create_incoming`]).
//! - Every session is stored per [`SessionAddress`] as a bounded history of
//!   [`SessionState`]s, newest first, with at most one open state.
//!
//! ## Example Usage
//!
//! ```rust
//! use signal_session::{
//!     InMemoryKeyStore, KeyStore, PreKeyMessage, SessionAddress, SessionBuilder, SessionConfig,
//!     SessionLocks, SignalKeyPair, SignalPreKeyPair, SignalSignedKeyPair,
//! };
//!
//! let config = SessionConfig::default();
//!
//! // Bob publishes a signed prekey and a one-time prekey.
//! let bob = InMemoryKeyStore::new(SignalKeyPair::random(), 2);
//! let signed = SignalSignedKeyPair::generate(1, bob.identity_key_pair());
//! let one_time = SignalPreKeyPair::generate(7);
//! let bundle = (signed.to_bundle(), one_time.to_bundle());
//! bob.store_signed_pre_key(signed);
//! bob.store_pre_key(one_time);
//!
//! // Alice establishes an outgoing session against Bob's bundle.
//! let alice = InMemoryKeyStore::new(SignalKeyPair::random(), 1);
//! let alice_locks = SessionLocks::new();
//! let bob_address = SessionAddress::new("bob", 1);
//! let builder = SessionBuilder::new(&bob_address, &alice, &alice_locks, &config);
//! builder
//!     .create_outgoing(2, &bob.identity_key_pair().encoded_public_key(), &bundle.0, Some(&bundle.1))
//!     .unwrap();
//!
//! // Bob processes the handshake carried by Alice's first message.
//! let session = alice.find_session_by_address(&bob_address).unwrap().unwrap();
//! let message = PreKeyMessage::from_pending(
//!     session.current_state().unwrap(),
//!     &alice.identity_key_pair().encoded_public_key(),
//!     1,
//! )
//! .unwrap();
//! let bob_locks = SessionLocks::new();
//! let alice_address = SessionAddress::new("alice", 1);
//! SessionBuilder::new(&alice_address, &bob, &bob_locks, &config)
//!     .process_incoming(&message)
//!     .unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`crypto`]: X25519 keys, XEdDSA signatures and HKDF glue
//! - [`session`]: session data model, agreement algorithm and builder
//! - [`store`]: key-store and trust contracts plus an in-memory implementation
//! - [`config`]: tunable bounds and protocol version

/// Protocol version stamped on newly created sessions.
pub const CURRENT_VERSION: u32 = 3;

/// Wire tag prefixed to every exchanged X25519 public key.
pub const KEY_TYPE: u8 = 5;

/// Length of raw public keys, root keys and chain keys.
pub const KEY_LENGTH: usize = 32;

/// Length of a signed-prekey signature.
pub const SIGNATURE_LENGTH: usize = 64;

/// Default number of skipped message keys cached per chain.
pub const MAX_MESSAGES: usize = 2000;

/// Default number of session states retained per address.
pub const MAX_ARCHIVED_STATES: usize = 40;

pub mod config;
pub mod crypto;
pub mod session;
pub mod store;

// Re-export commonly used types at the crate root
pub use config::{ConfigError, SessionConfig};
pub use crypto::{
    KeyError, PreKeyBundle, SignalKeyPair, SignalPreKeyPair, SignalPublicKey,
    SignalSignedKeyPair, SignedPreKeyBundle,
};
pub use session::{
    AgreementRole, IncomingOutcome, PreKeyMessage, Session, SessionAddress, SessionBuilder,
    SessionChain, SessionError, SessionLocks, SessionPreKey, SessionState,
};
pub use store::{InMemoryKeyStore, KeyStore, StoreError, TofuTrustStore, TrustStore};
