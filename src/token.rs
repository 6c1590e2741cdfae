//! Token framing for encrypted messages
//!
//! A token is `[E2E:` + standard base64 (with padding) + `]`. The framing is
//! designed to survive being pasted into chat messages, so tokens are also
//! recognised when surrounded by arbitrary other text.

use std::fmt;
use std::sync::LazyLock;

use base64::{Engine, engine::general_purpose::STANDARD};
use regex_lite::Regex;

use crate::error::{E2eChatError, ErrorCategory, ErrorKind, Result};

/// Opening marker of every token
pub const TOKEN_PREFIX: &str = "[E2E:";

/// Closing marker of every token
pub const TOKEN_SUFFIX: &str = "]";

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[E2E:([A-Za-z0-9+/=]+)\]").expect("token pattern is valid"));

/// An encrypted message in its transportable text form.
///
/// Only [`wrap`] constructs a `Token`, so holding one means holding a
/// well-formed token rather than a failure marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The base64 payload between the markers.
    pub fn payload(&self) -> &str {
        &self.0[TOKEN_PREFIX.len()..self.0.len() - TOKEN_SUFFIX.len()]
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Token> for String {
    fn from(token: Token) -> Self {
        token.0
    }
}

/// Wrap raw bytes (salt, nonce, sealed box) into a token.
pub fn wrap(raw: &[u8]) -> Token {
    Token(format!("{}{}{}", TOKEN_PREFIX, STANDARD.encode(raw), TOKEN_SUFFIX))
}

/// Return the payload of the first token embedded in `text`, if any.
pub fn extract(text: &str) -> Option<&str> {
    TOKEN_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Iterate over the payloads of every token embedded in `text`, in order.
pub fn extract_all(text: &str) -> impl Iterator<Item = &str> {
    TOKEN_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Whether `text` contains at least one token. Does not attempt decryption.
pub fn contains_token(text: &str) -> bool {
    TOKEN_PATTERN.is_match(text)
}

/// Locate the first token in `text` and decode its payload.
pub fn unwrap(text: &str) -> Result<Vec<u8>> {
    let payload = extract(text).ok_or_else(|| {
        E2eChatError::with_kind(
            ErrorCategory::User,
            ErrorKind::MalformedToken,
            "input contains no [E2E:...] token",
        )
    })?;

    STANDARD.decode(payload).map_err(|e| {
        E2eChatError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::MalformedToken,
            format!("base64 decoding failed: {}", e),
            e,
        )
    })
}
