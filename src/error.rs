use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to any other error
    /// category in this enum.
    ///
    /// A failed OS random source or an unusable cipher lands here: the
    /// environment is broken, not the input.
    Internal,

    /// The user provided invalid input or performed an action that is
    /// unsupported or impossible to complete.
    User,
}

/// Fine-grained condition flags for consumers that want to branch on error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Text contains no `[E2E:...]` token, the payload is not valid base64,
    /// or the decoded payload is too short to hold salt, nonce and tag.
    MalformedToken,
    /// AEAD tag verification failed: wrong password, corruption or tampering.
    AuthenticationFailed,
    /// Recovered plaintext, or text handed to the codec, is not valid UTF-8.
    InvalidUtf8,
    /// The underlying cryptographic primitive or random source is unusable.
    InternalCrypto,
    /// Uniform decryption failure surfaced to callers outside the codec.
    DecryptionFailed,
    /// Password could not be obtained from the configured reader.
    PasswordUnavailable,
    /// Interaction with the filesystem, stdin/stdout, or other I/O failed.
    Io,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct E2eChatError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Optional specific condition tag. Any code consuming errors MUST
    /// handle the absence of a defined kind.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl E2eChatError {
    /// Creates a new error with a required category and display message.
    pub fn new(category: ErrorCategory, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: None,
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that also tags the failure with a kind.
    pub fn with_kind(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that carries both a kind tag and the originating source error.
    pub fn with_kind_and_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns the preserved source error if present.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Wraps the current error with a higher-level message while preserving the original as source.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }
}

/// The single outcome of a failed [`crate::codec::decrypt`].
///
/// Deliberately carries no detail: a malformed token, a wrong password,
/// tampered ciphertext and non-UTF-8 plaintext all look the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("failed to decrypt message")]
pub struct DecryptionFailure;

impl From<DecryptionFailure> for E2eChatError {
    fn from(failure: DecryptionFailure) -> Self {
        E2eChatError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::DecryptionFailed,
            "failed to decrypt message (wrong password or corrupt token)",
            failure,
        )
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, E2eChatError>;
