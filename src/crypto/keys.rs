//! Key material for session establishment.
//!
//! Public keys travel on the wire with a 1-byte type tag ([`KEY_TYPE`]) in
//! front of the 32 raw X25519 bytes. The tag is stripped on ingress by
//! [`SignalPublicKey::from_encoded`], so Diffie-Hellman only ever sees raw points.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::rngs::OsRng;
use thiserror::Error;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use super::curve::calculate_signature;
use crate::{KEY_LENGTH, KEY_TYPE, SIGNATURE_LENGTH};

/// Length of a tagged public key on the wire.
pub const ENCODED_KEY_LENGTH: usize = KEY_LENGTH + 1;

/// Errors that can occur while decoding key material.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Invalid key length: expected {expected} bytes plus optional type tag, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("Invalid key type: expected {expected}, got {got}")]
    InvalidKeyType { expected: u8, got: u8 },

    #[error("Invalid signature length: expected {expected}, got {got}")]
    InvalidSignatureLength { expected: usize, got: usize },
}

/// A raw 32-byte X25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalPublicKey([u8; KEY_LENGTH]);

impl std::fmt::Debug for SignalPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SignalPublicKey")
            .field(&BASE64.encode(self.0))
            .finish()
    }
}

impl SignalPublicKey {
    /// Wraps raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Decodes a public key from its wire form.
    ///
    /// Accepts the tagged 33-byte encoding, whose first byte must be
    /// [`KEY_TYPE`], or an already untagged 32-byte key.
    pub fn from_encoded(bytes: &[u8]) -> Result<Self, KeyError> {
        match bytes.len() {
            ENCODED_KEY_LENGTH => {
                if bytes[0] != KEY_TYPE {
                    return Err(KeyError::InvalidKeyType {
                        expected: KEY_TYPE,
                        got: bytes[0],
                    });
                }
                let mut raw = [0u8; KEY_LENGTH];
                raw.copy_from_slice(&bytes[1..]);
                Ok(Self(raw))
            }
            KEY_LENGTH => {
                let mut raw = [0u8; KEY_LENGTH];
                raw.copy_from_slice(bytes);
                Ok(Self(raw))
            }
            got => Err(KeyError::InvalidKeyLength {
                expected: KEY_LENGTH,
                got,
            }),
        }
    }

    /// Returns the tagged wire encoding.
    pub fn encoded(&self) -> [u8; ENCODED_KEY_LENGTH] {
        let mut out = [0u8; ENCODED_KEY_LENGTH];
        out[0] = KEY_TYPE;
        out[1..].copy_from_slice(&self.0);
        out
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }

    pub(crate) fn to_dalek(self) -> PublicKey {
        PublicKey::from(self.0)
    }
}

impl From<&StaticSecret> for SignalPublicKey {
    fn from(secret: &StaticSecret) -> Self {
        Self(PublicKey::from(secret).to_bytes())
    }
}

/// An X25519 key pair owned by the local device.
#[derive(Clone)]
pub struct SignalKeyPair {
    secret: StaticSecret,
    public: SignalPublicKey,
}

impl std::fmt::Debug for SignalKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Don't expose private key in debug output
        f.debug_struct("SignalKeyPair")
            .field("public", &BASE64.encode(self.public.as_bytes()))
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl SignalKeyPair {
    /// Generates a new random key pair from the OS CSPRNG.
    pub fn random() -> Self {
        Self::from_secret(StaticSecret::random_from_rng(OsRng))
    }

    /// Creates a key pair from raw private key bytes.
    pub fn from_secret_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self::from_secret(StaticSecret::from(bytes))
    }

    fn from_secret(secret: StaticSecret) -> Self {
        let public = SignalPublicKey::from(&secret);
        Self { secret, public }
    }

    /// Returns the public half.
    pub fn public_key(&self) -> SignalPublicKey {
        self.public
    }

    /// Returns the tagged wire encoding of the public half.
    pub fn encoded_public_key(&self) -> [u8; ENCODED_KEY_LENGTH] {
        self.public.encoded()
    }

    /// Returns the private key bytes.
    pub fn secret_bytes(&self) -> Zeroizing<[u8; KEY_LENGTH]> {
        Zeroizing::new(self.secret.to_bytes())
    }

    /// Computes the X25519 shared secret with `their_public`.
    pub fn agree(&self, their_public: &SignalPublicKey) -> Zeroizing<[u8; KEY_LENGTH]> {
        let shared = self.secret.diffie_hellman(&their_public.to_dalek());
        Zeroizing::new(shared.to_bytes())
    }

    /// Signs `message` with this key pair (XEdDSA).
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LENGTH] {
        calculate_signature(&self.secret, message)
    }
}

/// A locally owned signed prekey: key pair, id and identity signature.
#[derive(Clone, Debug)]
pub struct SignalSignedKeyPair {
    id: u32,
    key_pair: SignalKeyPair,
    signature: [u8; SIGNATURE_LENGTH],
}

impl SignalSignedKeyPair {
    /// Generates a fresh signed prekey signed by `identity`.
    ///
    /// The signature covers the tagged encoding of the public key.
    pub fn generate(id: u32, identity: &SignalKeyPair) -> Self {
        let key_pair = SignalKeyPair::random();
        let signature = identity.sign(&key_pair.encoded_public_key());
        Self {
            id,
            key_pair,
            signature,
        }
    }

    /// Assembles a signed prekey from existing parts.
    pub fn new(id: u32, key_pair: SignalKeyPair, signature: [u8; SIGNATURE_LENGTH]) -> Self {
        Self {
            id,
            key_pair,
            signature,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn key_pair(&self) -> &SignalKeyPair {
        &self.key_pair
    }

    pub fn signature(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.signature
    }

    /// Returns the public form published to peers.
    pub fn to_bundle(&self) -> SignedPreKeyBundle {
        SignedPreKeyBundle {
            id: self.id,
            public_key: self.key_pair.public_key(),
            signature: self.signature,
        }
    }
}

/// A locally owned one-time prekey.
#[derive(Clone, Debug)]
pub struct SignalPreKeyPair {
    id: u32,
    key_pair: SignalKeyPair,
}

impl SignalPreKeyPair {
    /// Generates a fresh one-time prekey.
    pub fn generate(id: u32) -> Self {
        Self::new(id, SignalKeyPair::random())
    }

    pub fn new(id: u32, key_pair: SignalKeyPair) -> Self {
        Self { id, key_pair }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn key_pair(&self) -> &SignalKeyPair {
        &self.key_pair
    }

    /// Returns the public form published to peers.
    pub fn to_bundle(&self) -> PreKeyBundle {
        PreKeyBundle {
            id: self.id,
            public_key: self.key_pair.public_key(),
        }
    }
}

/// A peer's published signed prekey.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedPreKeyBundle {
    pub id: u32,
    pub public_key: SignalPublicKey,
    pub signature: [u8; SIGNATURE_LENGTH],
}

impl SignedPreKeyBundle {
    /// Builds a bundle from wire fields.
    pub fn from_encoded(id: u32, public_key: &[u8], signature: &[u8]) -> Result<Self, KeyError> {
        let signature: [u8; SIGNATURE_LENGTH] =
            signature
                .try_into()
                .map_err(|_| KeyError::InvalidSignatureLength {
                    expected: SIGNATURE_LENGTH,
                    got: signature.len(),
                })?;
        Ok(Self {
            id,
            public_key: SignalPublicKey::from_encoded(public_key)?,
            signature,
        })
    }
}

/// A peer's published one-time prekey.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreKeyBundle {
    pub id: u32,
    pub public_key: SignalPublicKey,
}
