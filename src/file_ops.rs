//! File encryption/decryption operations
//!
//! High-level operations for the command-line tool: encrypt a text file
//! into a token, decrypt the first token found in a text file, and list
//! the token payloads embedded in a file.

use crate::codec;
use crate::error::{E2eChatError, ErrorCategory, ErrorKind, Result};
use crate::password::PasswordReader;
use crate::token;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::debug;

/// Encrypt a text file with a password
///
/// Reads UTF-8 text from `input_path`, encrypts it using a password from
/// `password_reader`, and writes the token to `output_path`.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn encrypt_file(
    input_path: &Path,
    output_path: &Path,
    password_reader: &mut dyn PasswordReader,
) -> Result<()> {
    let plaintext = read_text(input_path)?;
    let password = password_reader.read_password()?;
    let token = codec::encrypt(&plaintext, &password)
        .map_err(|e| e.with_context("encryption failed"))?;
    write_file_secure(output_path, token.as_str().as_bytes())
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    debug!(input = %input_path.display(), output = %output_path.display(), "encrypted file");
    Ok(())
}

/// Decrypt the first token in a text file
///
/// Reads text from `input_path`, decrypts the first `[E2E:...]` token in it
/// using a password from `password_reader`, and writes the plaintext to
/// `output_path`. Nothing is written if decryption fails.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn decrypt_file(
    input_path: &Path,
    output_path: &Path,
    password_reader: &mut dyn PasswordReader,
) -> Result<()> {
    let text = read_text(input_path)?;
    let password = password_reader.read_password()?;
    let plaintext = codec::decrypt(&text, &password).map_err(E2eChatError::from)?;
    write_file_secure(output_path, plaintext.as_bytes())
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    debug!(input = %input_path.display(), output = %output_path.display(), "decrypted file");
    Ok(())
}

/// Return the payload of every token embedded in a text file, in order.
///
/// No password is involved; this only recognises tokens.
pub fn scan_file(input_path: &Path) -> Result<Vec<String>> {
    let text = read_text(input_path)?;
    let payloads: Vec<String> = token::extract_all(&text).map(str::to_owned).collect();
    debug!(input = %input_path.display(), found = payloads.len(), "scanned file");
    Ok(payloads)
}

fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| read_error(path, e))?;
    String::from_utf8(bytes).map_err(|e| {
        E2eChatError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::InvalidUtf8,
            format!("{} is not valid UTF-8", path.display()),
            e,
        )
    })
}

/// Write file with secure permissions (0o600 on Unix)
fn write_file_secure(path: &Path, contents: &[u8]) -> Result<()> {
    #[cfg(unix)]
    {
        use std::fs::OpenOptions;
        use std::os::unix::fs::OpenOptionsExt;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .map_err(|e| {
                E2eChatError::with_kind_and_source(
                    ErrorCategory::User,
                    ErrorKind::Io,
                    format!("failed to open {}", path.display()),
                    e,
                )
            })?;

        file.write_all(contents).map_err(|e| {
            E2eChatError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to write {}", path.display()),
                e,
            )
        })?;
        Ok(())
    }

    #[cfg(not(unix))]
    {
        fs::write(path, contents).map_err(|e| {
            E2eChatError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::Io,
                format!("failed to write {}", path.display()),
                e,
            )
        })?;
        Ok(())
    }
}

fn read_error(path: &Path, err: io::Error) -> E2eChatError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    E2eChatError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}
