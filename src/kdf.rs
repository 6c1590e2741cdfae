//! Password-based key derivation
//!
//! PBKDF2-HMAC-SHA256 with a fixed round count. The round count is the only
//! brute-force deterrent a shared-password token has, so it is a constant
//! rather than a parameter.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::codec::SALT_LEN;

/// PBKDF2 round count.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Length of derived key in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// Derive a 32-byte key from a password and salt.
///
/// Pure function of its inputs; a wrong password still yields a key, and it
/// is the AEAD tag check that rejects it.
pub(crate) fn derive_key(password: &[u8], salt: &[u8; SALT_LEN]) -> Zeroizing<[u8; KEY_LEN]> {
    stretch(password, salt, PBKDF2_ITERATIONS)
}

fn stretch(password: &[u8], salt: &[u8], rounds: u32) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(password, salt, rounds, key.as_mut_slice());
    key
}
