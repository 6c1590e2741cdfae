//! Encryption/decryption using PBKDF2-HMAC-SHA256 + AES-256-GCM
//!
//! This module implements password-based message encryption using:
//! - PBKDF2 (100,000 rounds of HMAC-SHA256) for key derivation
//! - AES-256-GCM for authenticated encryption, no associated data
//!
//! The binary format carried inside a token is:
//! - salt: 16 bytes
//! - nonce: 12 bytes
//! - sealed box: variable length (ciphertext followed by a 16-byte GCM tag)
//!
//! There is no length field; everything after the nonce is the sealed box.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use rand::rngs::OsRng;
use tracing::{debug, error};
use zeroize::Zeroizing;

use crate::error::{DecryptionFailure, E2eChatError, ErrorCategory, ErrorKind, Result};
use crate::kdf::derive_key;
use crate::token::{self, Token};

/// Length of salt in bytes
pub const SALT_LEN: usize = 16;

/// Length of nonce in bytes
pub const NONCE_LEN: usize = 12;

/// Length of the GCM authentication tag in bytes
pub const TAG_LEN: usize = 16;

/// Smallest decoded payload that can hold an (empty) message
pub const MIN_RAW_LEN: usize = SALT_LEN + NONCE_LEN + TAG_LEN;

/// Fill buffer with cryptographically secure random bytes
fn secure_random(buf: &mut [u8]) -> Result<()> {
    OsRng.try_fill_bytes(buf).map_err(|e| {
        error!("OS random generator unavailable");
        E2eChatError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::InternalCrypto,
            "OS random generator unavailable",
            e,
        )
    })
}

fn cipher_for(key: &[u8]) -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(key).map_err(|e| {
        error!("AES-256-GCM rejected the derived key");
        E2eChatError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InternalCrypto,
            format!("failed to initialize cipher: {}", e),
        )
    })
}

/// Encrypt a message with a password using random salt and nonce.
///
/// Any failure here means the message was never protected; the caller must
/// not fall back to sending it in the clear.
pub fn encrypt(plaintext: &str, password: &[u8]) -> Result<Token> {
    let mut salt = [0u8; SALT_LEN];
    secure_random(&mut salt)?;

    let mut nonce = [0u8; NONCE_LEN];
    secure_random(&mut nonce)?;

    encrypt_deterministic(plaintext, password, &salt, &nonce)
}

/// Encrypt with caller-chosen salt and nonce. Outside of `encrypt` this is
/// only reachable from tests, which need reproducible output.
fn encrypt_deterministic(
    plaintext: &str,
    password: &[u8],
    salt: &[u8; SALT_LEN],
    nonce: &[u8; NONCE_LEN],
) -> Result<Token> {
    let raw = seal(plaintext.as_bytes(), password, salt, nonce)?;
    Ok(token::wrap(&raw))
}

/// Returns the raw format: salt(16) + nonce(12) + sealedbox(variable)
pub(crate) fn seal(
    plaintext: &[u8],
    password: &[u8],
    salt: &[u8; SALT_LEN],
    nonce: &[u8; NONCE_LEN],
) -> Result<Vec<u8>> {
    let key = derive_key(password, salt);
    let cipher = cipher_for(key.as_slice())?;

    let sealed_box = cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| {
            error!("AES-256-GCM encryption failed");
            E2eChatError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::InternalCrypto,
                format!("encryption failed: {}", e),
            )
        })?;

    let mut output = Vec::with_capacity(SALT_LEN + NONCE_LEN + sealed_box.len());
    output.extend_from_slice(salt);
    output.extend_from_slice(nonce);
    output.extend_from_slice(&sealed_box);

    debug!(plaintext_len = plaintext.len(), raw_len = output.len(), "sealed message");
    Ok(output)
}

/// Open the raw format produced by [`seal`].
pub(crate) fn open(raw: &[u8], password: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if raw.len() < MIN_RAW_LEN {
        return Err(E2eChatError::with_kind(
            ErrorCategory::User,
            ErrorKind::MalformedToken,
            format!(
                "token payload is {} bytes, shorter than the {} byte minimum",
                raw.len(),
                MIN_RAW_LEN
            ),
        ));
    }

    let (salt, rest) = raw.split_at(SALT_LEN);
    let (nonce, sealed_box) = rest.split_at(NONCE_LEN);
    let salt: &[u8; SALT_LEN] = salt.try_into().map_err(|_| {
        E2eChatError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InternalCrypto,
            "failed to read salt",
        )
    })?;

    let key = derive_key(password, salt);
    let cipher = cipher_for(key.as_slice())?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), sealed_box)
        .map_err(|_| {
            E2eChatError::with_kind(
                ErrorCategory::User,
                ErrorKind::AuthenticationFailed,
                "corrupt token, tampered-with data, or wrong password",
            )
        })?;

    Ok(Zeroizing::new(plaintext))
}

/// Full decrypt pipeline with the failure reason still attached.
pub(crate) fn open_token(text: &str, password: &[u8]) -> Result<String> {
    let raw = token::unwrap(text)?;
    let plaintext = open(&raw, password)?;

    String::from_utf8(plaintext.to_vec()).map_err(|e| {
        E2eChatError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::InvalidUtf8,
            "decrypted message is not valid UTF-8",
            e,
        )
    })
}

/// Decrypt the first token found in `text`.
///
/// Every failure, whether the text holds no token, the payload is garbled,
/// the password is wrong or the data was tampered with, yields the same
/// [`DecryptionFailure`]. Safe to call speculatively on untrusted text.
pub fn decrypt(text: &str, password: &[u8]) -> std::result::Result<String, DecryptionFailure> {
    open_token(text, password).map_err(|e| {
        if e.kind == Some(ErrorKind::InternalCrypto) {
            error!(error = %e, "cryptographic primitive failure during decryption");
        } else {
            debug!("decryption failed");
        }
        DecryptionFailure
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine, engine::general_purpose::STANDARD};

    fn raw_of(token: &Token) -> Vec<u8> {
        STANDARD.decode(token.payload()).unwrap()
    }

    #[test]
    fn test_empty_plaintext() {
        let token = encrypt("", b"test").unwrap();
        assert_eq!(decrypt(token.as_str(), b"test").unwrap(), "");
        assert_eq!(raw_of(&token).len(), MIN_RAW_LEN);
    }

    #[test]
    fn test_empty_password() {
        let token = encrypt("hello", b"").unwrap();
        assert_eq!(decrypt(token.as_str(), b"").unwrap(), "hello");
    }

    #[test]
    fn test_hello_secret_layout() {
        let token = encrypt("hello", b"secret").unwrap();
        let s = token.as_str();
        assert!(s.starts_with("[E2E:"));
        assert!(s.ends_with(']'));
        assert!(
            token
                .payload()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=')
        );
        assert_eq!(raw_of(&token).len(), 16 + 12 + 5 + 16);
        assert_eq!(decrypt(s, b"secret").unwrap(), "hello");
    }

    #[test]
    fn test_multibyte_unicode() {
        let message = "héllo wörld ✓ 你好 🔐";
        let token = encrypt(message, b"p\xc3\xa4ss").unwrap();
        assert_eq!(decrypt(token.as_str(), b"p\xc3\xa4ss").unwrap(), message);
        assert_eq!(
            raw_of(&token).len(),
            MIN_RAW_LEN + message.len()
        );
    }

    #[test]
    fn test_deterministic_encryption() {
        let salt = [1u8; SALT_LEN];
        let nonce = [2u8; NONCE_LEN];

        let t1 = encrypt_deterministic("hello world", b"test", &salt, &nonce).unwrap();
        let t2 = encrypt_deterministic("hello world", b"test", &salt, &nonce).unwrap();

        // Same salt/nonce produces identical token
        assert_eq!(t1, t2);

        let raw = raw_of(&t1);
        assert_eq!(&raw[..SALT_LEN], &salt);
        assert_eq!(&raw[SALT_LEN..SALT_LEN + NONCE_LEN], &nonce);
        assert_eq!(decrypt(t1.as_str(), b"test").unwrap(), "hello world");
    }

    #[test]
    fn test_different_nonce_different_token() {
        let salt = [1u8; SALT_LEN];
        let t1 = encrypt_deterministic("hello world", b"test", &salt, &[2u8; NONCE_LEN]).unwrap();
        let t2 = encrypt_deterministic("hello world", b"test", &salt, &[3u8; NONCE_LEN]).unwrap();

        assert_ne!(t1, t2);
        assert_eq!(decrypt(t1.as_str(), b"test").unwrap(), "hello world");
        assert_eq!(decrypt(t2.as_str(), b"test").unwrap(), "hello world");
    }

    #[test]
    fn test_fresh_salt_and_nonce_per_call() {
        let t1 = encrypt("same", b"pw").unwrap();
        let t2 = encrypt("same", b"pw").unwrap();
        assert_ne!(t1, t2);

        let (r1, r2) = (raw_of(&t1), raw_of(&t2));
        assert_ne!(&r1[..SALT_LEN], &r2[..SALT_LEN]);
        assert_ne!(
            &r1[SALT_LEN..SALT_LEN + NONCE_LEN],
            &r2[SALT_LEN..SALT_LEN + NONCE_LEN]
        );

        assert_eq!(decrypt(t1.as_str(), b"pw").unwrap(), "same");
        assert_eq!(decrypt(t2.as_str(), b"pw").unwrap(), "same");
    }

    #[test]
    fn test_wrong_password() {
        let token = encrypt("secret data", b"correct").unwrap();
        assert_eq!(decrypt(token.as_str(), b"wrong"), Err(DecryptionFailure));

        let err = open_token(token.as_str(), b"wrong").expect_err("expected auth failure");
        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
    }

    #[test]
    fn test_every_tampered_byte_fails() {
        let token = encrypt("hello", b"secret").unwrap();
        let raw = raw_of(&token);
        assert_eq!(raw.len(), 49);

        // Salt, nonce, ciphertext and tag: every position is covered.
        for pos in 0..raw.len() {
            let mut tampered = raw.clone();
            tampered[pos] ^= 0x01;
            let tampered = token::wrap(&tampered);
            assert_eq!(
                decrypt(tampered.as_str(), b"secret"),
                Err(DecryptionFailure),
                "flipping byte {} went undetected",
                pos
            );
        }
    }

    #[test]
    fn test_every_altered_payload_character_fails() {
        let token = encrypt("hello", b"secret").unwrap();
        let payload = token.payload();

        for (pos, c) in payload.char_indices() {
            let replacement = if c == 'A' { 'B' } else { 'A' };
            let mut altered = payload.to_string();
            altered.replace_range(pos..pos + 1, &replacement.to_string());
            let text = format!("[E2E:{}]", altered);
            assert_eq!(
                decrypt(&text, b"secret"),
                Err(DecryptionFailure),
                "changing payload character {} went undetected",
                pos
            );
        }
    }

    #[test]
    fn test_truncated_payload() {
        let token = token::wrap(&[0u8; MIN_RAW_LEN - 1]);
        assert_eq!(decrypt(token.as_str(), b"test"), Err(DecryptionFailure));

        let err = open_token(token.as_str(), b"test").expect_err("expected malformed token");
        assert_eq!(err.kind, Some(ErrorKind::MalformedToken));
    }

    #[test]
    fn test_not_a_token() {
        assert_eq!(decrypt("hello world", b"test"), Err(DecryptionFailure));
        assert_eq!(decrypt("", b"test"), Err(DecryptionFailure));

        let err = open_token("hello world", b"test").expect_err("expected malformed token");
        assert_eq!(err.kind, Some(ErrorKind::MalformedToken));
    }

    #[test]
    fn test_bad_base64_payload() {
        assert_eq!(decrypt("[E2E:QU=JD]", b"test"), Err(DecryptionFailure));
    }

    #[test]
    fn test_token_inside_chat_message() {
        let token = encrypt("meet at noon", b"pw").unwrap();
        let message = format!("hey, {} see you", token);
        assert_eq!(decrypt(&message, b"pw").unwrap(), "meet at noon");
    }

    #[test]
    fn test_non_utf8_plaintext_is_rejected() {
        let raw = seal(&[0xff, 0xfe, 0x00], b"pw", &[5u8; SALT_LEN], &[6u8; NONCE_LEN]).unwrap();
        let token = token::wrap(&raw);

        assert_eq!(decrypt(token.as_str(), b"pw"), Err(DecryptionFailure));
        let err = open_token(token.as_str(), b"pw").expect_err("expected utf-8 failure");
        assert_eq!(err.kind, Some(ErrorKind::InvalidUtf8));
    }

    #[test]
    fn test_concurrent_calls() {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                std::thread::spawn(move || {
                    let message = format!("message {}", i);
                    let password = format!("password {}", i);
                    let token = encrypt(&message, password.as_bytes()).unwrap();
                    decrypt(token.as_str(), password.as_bytes()).unwrap() == message
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
