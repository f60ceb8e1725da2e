//! HKDF-SHA256 derivation of fixed-length protocol secrets.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::KEY_LENGTH;

/// Domain separation for the initial master-secret derivation.
pub const LABEL_MASTER_SECRET: &[u8] = b"WhisperText";

/// Domain separation for every ratchet step after the first.
pub const LABEL_RATCHET: &[u8] = b"WhisperRatchet";

/// Derives `N` consecutive 32-byte secrets from `input`.
///
/// An absent `salt` is the RFC 5869 default of 32 zero bytes. Output `i` is
/// bytes `32 * i .. 32 * (i + 1)` of the expanded key material, so asking for
/// fewer secrets never changes the leading ones.
///
/// # Panics
///
/// If `N * 32` exceeds the HKDF-SHA256 limit of 8160 bytes.
pub fn derive_secrets<const N: usize>(
    input: &[u8],
    salt: Option<&[u8]>,
    info: &[u8],
) -> [Zeroizing<[u8; KEY_LENGTH]>; N] {
    let hk = Hkdf::<Sha256>::new(salt, input);

    let mut okm = Zeroizing::new(vec![0u8; N * KEY_LENGTH]);
    hk.expand(info, &mut okm)
        .expect("requested secrets fit in HKDF-SHA256 output");

    std::array::from_fn(|i| {
        let mut secret = Zeroizing::new([0u8; KEY_LENGTH]);
        secret.copy_from_slice(&okm[i * KEY_LENGTH..(i + 1) * KEY_LENGTH]);
        secret
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_secrets_deterministic() {
        let [a1, b1] = derive_secrets::<2>(&[1u8; 32], None, LABEL_MASTER_SECRET);
        let [a2, b2] = derive_secrets::<2>(&[1u8; 32], None, LABEL_MASTER_SECRET);

        assert_eq!(*a1, *a2);
        assert_eq!(*b1, *b2);
        assert_ne!(*a1, *b1);
    }

    #[test]
    fn test_absent_salt_equals_zero_salt() {
        let [a, b] = derive_secrets::<2>(&[7u8; 96], None, LABEL_MASTER_SECRET);
        let [c, d] = derive_secrets::<2>(&[7u8; 96], Some(&[0u8; 32][..]), LABEL_MASTER_SECRET);

        assert_eq!(*a, *c);
        assert_eq!(*b, *d);
    }

    #[test]
    fn test_prefix_stable_across_counts() {
        let [a, b] = derive_secrets::<2>(&[3u8; 32], Some(&[4u8; 32][..]), LABEL_RATCHET);
        let [c, d, _] = derive_secrets::<3>(&[3u8; 32], Some(&[4u8; 32][..]), LABEL_RATCHET);

        assert_eq!(*a, *c);
        assert_eq!(*b, *d);
    }

    #[test]
    fn test_labels_separate_domains() {
        let [text, _] = derive_secrets::<2>(&[5u8; 32], None, LABEL_MASTER_SECRET);
        let [ratchet, _] = derive_secrets::<2>(&[5u8; 32], None, LABEL_RATCHET);

        assert_ne!(*text, *ratchet);
    }

    #[test]
    fn test_salt_changes_output() {
        let [a, _] = derive_secrets::<2>(&[5u8; 32], Some(&[1u8; 32][..]), LABEL_RATCHET);
        let [b, _] = derive_secrets::<2>(&[5u8; 32], Some(&[2u8; 32][..]), LABEL_RATCHET);

        assert_ne!(*a, *b);
    }
}
