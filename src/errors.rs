//! Error types for kdbx3-rs

pub use crate::binary::errors::{
    CryptoError, FormatError, IntegrityError, OpenError, UnlockError,
};
pub use crate::binary::FailedUnlock;
pub use crate::crypto::CredentialError;
pub use crate::xml::parse::Error as XmlError;
use thiserror::Error;

#[derive(Error, Debug)]
/// Wrapper error type for this library
///
/// Each variant is one failure category, whichever stage raised it.
pub enum Error {
    /// Reading the file or decompressing its body failed
    #[error("IO error - {0}")]
    Io(#[from] std::io::Error),
    /// The file is not a usable KDBX 3 database
    #[error("Invalid database - {0}")]
    Format(#[from] FormatError),
    /// A cipher could not be set up or run
    #[error("Decryption failed - {0}")]
    Crypto(#[from] CryptoError),
    /// Wrong credentials or corrupted data
    #[error("Integrity check failed - {0}")]
    Integrity(#[from] IntegrityError),
    /// The supplied credentials could not be used
    #[error("Invalid credentials - {0}")]
    Credential(#[from] CredentialError),
    /// An unexpected failure inside the library
    #[error("Internal error - {0}")]
    Internal(String),
}

impl From<OpenError> for Error {
    fn from(e: OpenError) -> Error {
        match e {
            OpenError::Format(e) => Error::Format(e),
            OpenError::Io(e) => Error::Io(e),
        }
    }
}

impl From<UnlockError> for Error {
    fn from(e: UnlockError) -> Error {
        match e {
            UnlockError::Credential(e) => Error::Credential(e),
            UnlockError::Crypto(e) => Error::Crypto(e),
            UnlockError::Integrity(e) => Error::Integrity(e),
            UnlockError::Format(e) => Error::Format(e),
            UnlockError::Io(e) => Error::Io(e),
        }
    }
}

impl From<FailedUnlock> for Error {
    fn from(e: FailedUnlock) -> Error {
        e.1.into()
    }
}

impl From<XmlError> for Error {
    fn from(e: XmlError) -> Error {
        Error::Format(e.into())
    }
}
