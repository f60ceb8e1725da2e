//! XEdDSA signatures over X25519 identity keys.
//!
//! Identity keys are Montgomery-form X25519 keys, so signatures are produced
//! with the Edwards-equivalent scalar and checked as ordinary Ed25519
//! signatures against the birationally mapped public key. The Edwards sign
//! bit, which the Montgomery form loses, rides in the top bit of the last
//! signature byte.

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::montgomery::MontgomeryPoint;
use curve25519_dalek::scalar::{clamp_integer, Scalar};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha512};
use x25519_dalek::StaticSecret;
use zeroize::Zeroizing;

use super::keys::SignalPublicKey;
use crate::SIGNATURE_LENGTH;

/// Prefix separating the nonce hash from the challenge hash.
const NONCE_HASH_PREFIX: [u8; 32] = {
    let mut prefix = [0xFFu8; 32];
    prefix[0] = 0xFE;
    prefix
};

/// Signs `message` with an X25519 private key.
///
/// A fresh 64-byte random value is mixed into the nonce derivation, so two
/// signatures over the same message differ but both verify.
pub fn calculate_signature(secret: &StaticSecret, message: &[u8]) -> [u8; SIGNATURE_LENGTH] {
    let mut random = Zeroizing::new([0u8; 64]);
    OsRng.fill_bytes(&mut random[..]);

    let a = Scalar::from_bytes_mod_order(clamp_integer(secret.to_bytes()));
    let ed_public = EdwardsPoint::mul_base(&a).compress();
    let sign_bit = ed_public.as_bytes()[31] & 0x80;

    let r = hash_to_scalar(
        Sha512::new()
            .chain_update(NONCE_HASH_PREFIX)
            .chain_update(a.as_bytes())
            .chain_update(message)
            .chain_update(&random[..]),
    );
    let cap_r = EdwardsPoint::mul_base(&r).compress();

    let h = hash_to_scalar(
        Sha512::new()
            .chain_update(cap_r.as_bytes())
            .chain_update(ed_public.as_bytes())
            .chain_update(message),
    );
    let s = h * a + r;

    let mut signature = [0u8; SIGNATURE_LENGTH];
    signature[..32].copy_from_slice(cap_r.as_bytes());
    signature[32..].copy_from_slice(s.as_bytes());
    signature[63] &= 0x7F;
    signature[63] |= sign_bit;
    signature
}

fn hash_to_scalar(hasher: Sha512) -> Scalar {
    let mut wide = Zeroizing::new([0u8; 64]);
    wide.copy_from_slice(&hasher.finalize());
    Scalar::from_bytes_mod_order_wide(&wide)
}

/// Verifies an XEdDSA `signature` over `message` against an X25519 public key.
///
/// Returns `false` for malformed signatures or keys instead of erroring.
pub fn verify_signature(public_key: &SignalPublicKey, message: &[u8], signature: &[u8]) -> bool {
    let Ok(signature) = <[u8; SIGNATURE_LENGTH]>::try_from(signature) else {
        return false;
    };

    let sign_bit = (signature[63] & 0x80) >> 7;
    let Some(ed_public) = MontgomeryPoint(*public_key.as_bytes()).to_edwards(sign_bit) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(ed_public.compress().as_bytes()) else {
        return false;
    };

    let mut ed_signature = signature;
    ed_signature[63] &= 0x7F;
    verifying_key
        .verify(message, &Signature::from_bytes(&ed_signature))
        .is_ok()
}
