//! e2echat - password-based message encryption into `[E2E:...]` text tokens
//!
//! ```
//! let token = e2echat::encrypt("hello", b"secret")?;
//! assert_eq!(e2echat::decrypt(token.as_str(), b"secret").unwrap(), "hello");
//! assert!(e2echat::decrypt(token.as_str(), b"wrong").is_err());
//! # Ok::<(), e2echat::E2eChatError>(())
//! ```

#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod file_ops;
mod kdf;
pub mod password;
pub mod session;
pub mod token;

pub use codec::{decrypt, encrypt};
pub use error::{DecryptionFailure, E2eChatError, ErrorCategory, ErrorKind, Result};
pub use kdf::PBKDF2_ITERATIONS;
pub use session::{Session, SessionConfig};
pub use token::{Token, contains_token, extract, extract_all};
