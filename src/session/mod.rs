//! Session data model and establishment.
//!
//! This module provides:
//! - [`SessionAddress`], [`Session`], [`SessionState`], [`SessionChain`] and
//!   [`SessionPreKey`], the per-peer ratchet data
//! - The X3DH agreement and first ratchet step ([`ratchet`])
//! - [`SessionBuilder`], which runs the handshake in either role against a
//!   [`KeyStore`](crate::store::KeyStore)
//! - [`SessionLocks`] for per-address mutual exclusion

pub mod address;
pub mod builder;
pub mod chain;
pub mod error;
pub mod lock;
pub mod message;
pub mod ratchet;
pub mod record;
pub mod state;

pub use address::SessionAddress;
pub use builder::{IncomingOutcome, SessionBuilder};
pub use chain::SessionChain;
pub use error::SessionError;
pub use lock::SessionLocks;
pub use message::PreKeyMessage;
pub use ratchet::{derive_ratchet_keys, AgreementRole};
pub use record::Session;
pub use state::{SessionPreKey, SessionState};
