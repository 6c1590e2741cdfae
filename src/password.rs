//! Password acquisition for command-line use

use crate::error::{E2eChatError, ErrorCategory, ErrorKind, Result};
use std::io::{self, IsTerminal, Read, Write};
use zeroize::Zeroizing;

/// Trait for reading passwords from various sources
pub trait PasswordReader {
    /// Read a password as arbitrary bytes (not necessarily UTF-8)
    ///
    /// Returns the password wrapped in `Zeroizing` so it is wiped from
    /// memory when dropped.
    fn read_password(&mut self) -> Result<Zeroizing<Vec<u8>>>;
}

/// Returns a fixed password (for testing and for embedding hosts that
/// already hold the password)
pub struct ConstantPasswordReader {
    password: Zeroizing<Vec<u8>>,
}

impl ConstantPasswordReader {
    pub fn new(password: Vec<u8>) -> Self {
        Self {
            password: Zeroizing::new(password),
        }
    }
}

impl PasswordReader for ConstantPasswordReader {
    fn read_password(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new((*self.password).clone()))
    }
}

/// Reads the password from any io::Read source, verbatim up to EOF
pub struct StreamPasswordReader {
    reader: Box<dyn Read>,
}

impl StreamPasswordReader {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { reader }
    }
}

impl PasswordReader for StreamPasswordReader {
    fn read_password(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let mut data = Zeroizing::new(Vec::new());
        self.reader.read_to_end(&mut data).map_err(|e| {
            E2eChatError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("error reading password: {}", e),
                e,
            )
        })?;
        Ok(data)
    }
}

/// Prompts on stderr and reads the password from the terminal with no echo
#[derive(Default)]
pub struct TerminalPasswordReader;

impl PasswordReader for TerminalPasswordReader {
    /// Terminal input is limited to UTF-8 by rpassword; use
    /// `--password-stdin` for anything else.
    fn read_password(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        if !io::stdin().is_terminal() {
            return Err(E2eChatError::with_kind(
                ErrorCategory::User,
                ErrorKind::PasswordUnavailable,
                "cannot read password from terminal - stdin is not a terminal",
            ));
        }

        let mut stderr = io::stderr();
        stderr
            .write_all(b"Password (e2echat): ")
            .and_then(|()| stderr.flush())
            .map_err(|e| {
                E2eChatError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    format!("failed to write prompt: {}", e),
                    e,
                )
            })?;

        let password = rpassword::read_password().map_err(|e| {
            E2eChatError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::PasswordUnavailable,
                format!("failure reading password: {}", e),
                e,
            )
        })?;

        Ok(Zeroizing::new(password.into_bytes()))
    }
}
