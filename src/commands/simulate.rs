//! Simulate command - run both sides of a handshake in memory.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use signal_session::session::derive_ratchet_keys;
use signal_session::{
    InMemoryKeyStore, IncomingOutcome, KeyStore, PreKeyMessage, SessionAddress, SessionBuilder,
    SessionConfig, SessionLocks, SignalKeyPair, SignalPreKeyPair, SignalSignedKeyPair,
};

use super::bundle::PartyKeys;
use super::fingerprint::fingerprint;
use super::CommandExecutor;

/// Establish a session between two in-memory parties and compare their keys.
///
/// Alice initiates against Bob's bundle; Bob answers from the handshake
/// descriptor. Both sides must arrive at the same root and chain keys.
#[derive(Args, Debug)]
pub struct SimulateCommand {
    /// Leave the one-time prekey out of Bob's bundle (3-DH agreement)
    #[arg(long)]
    pub without_one_time_prekey: bool,

    /// Deliver the handshake to Bob twice
    #[arg(long)]
    pub replay: bool,

    /// TOML file with session settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Play Bob from a key file written by `bundle --output`
    #[arg(long)]
    pub responder: Option<PathBuf>,
}

impl CommandExecutor for SimulateCommand {
    fn execute(&self) -> Result<()> {
        let config = match &self.config {
            Some(path) => SessionConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => SessionConfig::default(),
        };

        let alice = InMemoryKeyStore::new(SignalKeyPair::random(), 1);
        let alice_address = SessionAddress::new("alice", 1);
        let bob_address = SessionAddress::new("bob", 1);

        let bob_keys = match &self.responder {
            Some(path) => PartyKeys::load(path)?,
            None => {
                let identity = SignalKeyPair::random();
                PartyKeys {
                    registration_id: 2,
                    signed_pre_key: SignalSignedKeyPair::generate(1, &identity),
                    identity,
                    one_time_pre_keys: vec![SignalPreKeyPair::generate(1)],
                }
            }
        };
        let signed_bundle = bob_keys.signed_bundle();
        let one_time_bundle = if self.without_one_time_prekey {
            None
        } else {
            bob_keys.one_time_bundles().first().copied()
        };
        let bob = bob_keys.into_store();

        let alice_locks = SessionLocks::new();
        SessionBuilder::new(&bob_address, &alice, &alice_locks, &config)
            .create_outgoing(
                bob.registration_id(),
                &bob.identity_key_pair().encoded_public_key(),
                &signed_bundle,
                one_time_bundle.as_ref(),
            )
            .context("Alice failed to create the outgoing session")?;

        let alice_session = alice
            .find_session_by_address(&bob_address)?
            .context("Alice has no session with Bob")?;
        let alice_state = alice_session
            .current_state()
            .context("Alice's session has no state")?;
        let message = PreKeyMessage::from_pending(
            alice_state,
            &alice.identity_key_pair().encoded_public_key(),
            alice.registration_id(),
        )
        .context("Alice's state has no pending prekey")?;

        let bob_locks = SessionLocks::new();
        let bob_builder = SessionBuilder::new(&alice_address, &bob, &bob_locks, &config);
        let outcome = bob_builder
            .process_incoming(&message)
            .context("Bob failed to process the handshake")?;
        println!("Handshake:        {:?}", outcome);

        if self.replay {
            let replayed = bob_builder.process_incoming(&message)?;
            println!("Replay:           {:?}", replayed);
            if replayed != IncomingOutcome::Duplicate {
                bail!("Replayed handshake was not recognized as a duplicate");
            }
        }

        let bob_session = bob
            .find_session_by_address(&alice_address)?
            .context("Bob has no session with Alice")?;
        let bob_state = bob_session
            .current_state()
            .context("Bob's session has no state")?;

        let alice_ratchet = alice_state.ephemeral_key_pair().public_key();
        let alice_chain = alice_state
            .find_chain(&alice_ratchet)
            .context("Alice has no sending chain")?;
        let (bob_root, bob_chain) = derive_ratchet_keys(
            bob_state.root_key(),
            &alice_ratchet,
            bob_state.ephemeral_key_pair(),
        );

        println!(
            "Agreement:        {}",
            if message.pre_key_id().is_some() { "4-DH" } else { "3-DH" }
        );
        println!("Bob states:       {}", bob_session.len());
        println!("Alice root key:   {}", fingerprint(alice_state.root_key()));
        println!("Bob root key:     {}", fingerprint(&bob_root[..]));
        println!("Alice chain key:  {}", fingerprint(alice_chain.key()));
        println!("Bob chain key:    {}", fingerprint(&bob_chain[..]));

        if alice_state.root_key() != &*bob_root || alice_chain.key() != &*bob_chain {
            bail!("Alice and Bob derived different keys");
        }
        println!("Keys match.");
        Ok(())
    }
}
