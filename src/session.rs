//! Per-session password state and the automatic encrypt/decrypt hooks a
//! chat host calls around the codec.
//!
//! The codec itself is stateless. Everything remembered between calls, the
//! default password and the passwords remembered per channel, lives here in
//! an owned [`Session`] that the host creates on login and drops (or
//! [`Session::clear`]s) when the session ends. A host that shares one
//! session between threads wraps it in its own lock.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;
use zeroize::Zeroizing;

use crate::codec;
use crate::error::{DecryptionFailure, Result};
use crate::token::{self, TOKEN_PREFIX, Token};

/// Host-facing settings for a session.
#[derive(Clone)]
pub struct SessionConfig {
    /// Password used when no channel-specific one is remembered.
    pub default_password: Option<Zeroizing<Vec<u8>>>,
    /// Try to decrypt incoming messages that contain a token.
    pub auto_decrypt: bool,
    /// Encrypt every outgoing message with the resolved password.
    pub auto_encrypt: bool,
    /// Remember passwords per channel after a successful manual operation.
    pub remember_channel_passwords: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_password: None,
            auto_decrypt: true,
            auto_encrypt: false,
            remember_channel_passwords: false,
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field(
                "default_password",
                &self.default_password.as_ref().map(|_| "<redacted>"),
            )
            .field("auto_decrypt", &self.auto_decrypt)
            .field("auto_encrypt", &self.auto_encrypt)
            .field("remember_channel_passwords", &self.remember_channel_passwords)
            .finish()
    }
}

pub struct Session {
    config: SessionConfig,
    channel_passwords: HashMap<String, Zeroizing<Vec<u8>>>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            channel_passwords: HashMap::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Remember `password` for `channel`.
    ///
    /// Returns false, storing nothing, when remembering is disabled or the
    /// password is empty.
    pub fn remember_password(&mut self, channel: &str, password: &[u8]) -> bool {
        if !self.config.remember_channel_passwords || password.is_empty() {
            return false;
        }
        self.channel_passwords
            .insert(channel.to_owned(), Zeroizing::new(password.to_vec()));
        debug!(channel, "remembered channel password");
        true
    }

    /// Forget the password remembered for `channel`, if any.
    pub fn forget_password(&mut self, channel: &str) -> bool {
        self.channel_passwords.remove(channel).is_some()
    }

    /// Drop every remembered channel password.
    pub fn clear(&mut self) {
        debug!(count = self.channel_passwords.len(), "clearing channel passwords");
        self.channel_passwords.clear();
    }

    /// Resolve the password to use in `channel`.
    ///
    /// A remembered channel password wins over the default one. Empty
    /// passwords count as absent.
    pub fn password_for(&self, channel: &str) -> Option<&[u8]> {
        let remembered = if self.config.remember_channel_passwords {
            self.channel_passwords.get(channel)
        } else {
            None
        };

        remembered
            .or(self.config.default_password.as_ref())
            .map(|p| p.as_slice())
            .filter(|p| !p.is_empty())
    }

    /// Auto-encrypt hook for an outgoing message.
    ///
    /// `Ok(None)` means "send the message unchanged". An error means the
    /// message could not be protected and must not be sent.
    pub fn prepare_outgoing(&self, channel: &str, content: &str) -> Result<Option<Token>> {
        let has_default = self
            .config
            .default_password
            .as_ref()
            .is_some_and(|p| !p.is_empty());
        if !self.config.auto_encrypt
            || !has_default
            || content.is_empty()
            || content.starts_with(TOKEN_PREFIX)
        {
            return Ok(None);
        }

        let Some(password) = self.password_for(channel) else {
            return Ok(None);
        };

        let token = codec::encrypt(content, password)
            .map_err(|e| e.with_context("auto-encrypt failed; message not sent"))?;
        debug!(channel, "auto-encrypted outgoing message");
        Ok(Some(token))
    }

    /// Auto-decrypt hook for an incoming message.
    pub fn try_auto_decrypt(&self, channel: &str, content: &str) -> Option<String> {
        if !self.config.auto_decrypt || !token::contains_token(content) {
            return None;
        }

        let Some(password) = self.password_for(channel) else {
            debug!(channel, "auto-decrypt skipped: no password for channel");
            return None;
        };

        codec::decrypt(content, password).ok()
    }

    /// Manual encryption with an explicitly supplied password.
    pub fn encrypt_with(
        &mut self,
        channel: &str,
        content: &str,
        password: &[u8],
        remember: bool,
    ) -> Result<Token> {
        let token = codec::encrypt(content, password)?;
        if remember {
            self.remember_password(channel, password);
        }
        Ok(token)
    }

    /// Manual decryption with an explicitly supplied password. The password
    /// is only remembered if it actually decrypted the message.
    pub fn decrypt_with(
        &mut self,
        channel: &str,
        content: &str,
        password: &[u8],
        remember: bool,
    ) -> std::result::Result<String, DecryptionFailure> {
        let plaintext = codec::decrypt(content, password)?;
        if remember {
            self.remember_password(channel, password);
        }
        Ok(plaintext)
    }
}
