use super::header::OuterHeaderId;
use super::header_fields::InnerStreamCipherAlgorithm;
use crate::crypto;
use thiserror::Error;

#[derive(Error, Debug)]
/// Structural problems in the archive: header, block framing or XML
pub enum FormatError {
    /// Keepass database magic number missing
    #[error("Unsupported file type - not a keepass database")]
    NonKeepassFormat,
    /// Second header magic number is not that for kdbx (possibly kdb)
    #[error("Unsupported file type - not kdbx")]
    UnsupportedFileFormat,
    /// A supported field had an unexpected format
    #[error("Incompatible database - Malformed field of type {0:?}: {1}")]
    MalformedField(OuterHeaderId, String),
    /// The database cipher is not supported by this library.
    #[error("Incompatible database - Unknown cipher {0}")]
    UnknownCipher(uuid::Uuid),
    /// The protected value stream cipher is not supported by this library.
    #[error("Incompatible database - Unsupported inner stream cipher {0:?}")]
    UnknownInnerStream(InnerStreamCipherAlgorithm),
    /// The header did not finish with an end of header field
    #[error("Malformed header - no end of header field after {0} fields")]
    MissingHeaderTerminator(usize),
    /// The block stream did not finish with an empty terminating block
    #[error("Malformed body - no terminating block after {0} blocks")]
    MissingBlockTerminator(usize),
    /// A block declares more data than the body holds
    #[error("Malformed body - block {index} runs past the end of the data")]
    BlockOverrun {
        /// Position of the block in the body
        index: usize,
    },
    /// The decrypted body is not a usable database document
    #[error("Corrupt database. XML data is invalid - {0}")]
    InvalidXml(#[from] crate::xml::parse::Error),
}

#[derive(Error, Debug)]
/// Failures setting up or running a cipher
pub enum CryptoError {
    /// A key or IV had the wrong length for its cipher
    #[error("Invalid key or IV length for {0}")]
    InvalidLength(&'static str),
    /// A protected value could not be decoded
    #[error("Protected value is not valid base64 - {0}")]
    InvalidProtectedValue(#[from] base64::DecodeError),
    /// The protected value stream ran out of blocks
    #[error("Protected value keystream exhausted")]
    KeystreamExhausted,
}

#[derive(Error, Debug)]
/// Checks on decrypted data that did not pass
pub enum IntegrityError {
    /// The decrypted stream start bytes did not match the header
    #[error("Cannot verify MAC - wrong credentials or corrupt database")]
    MacMismatch,
    /// A body block does not match its SHA-256 checksum
    #[error("Body corrupted - block {index} failed hash verification")]
    BlockChecksum {
        /// Position of the block in the body
        index: usize,
    },
}

#[derive(Error, Debug)]
/// Errors encountered loading a database prior to decryption
pub enum OpenError {
    /// The file is not a supported database or its header is malformed
    #[error("Error reading database header - {0}")]
    Format(#[from] FormatError),
    /// Error encountered reading database
    #[error("IO error reading file - {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
/// Errors encountered unlocking a encrypted database
pub enum UnlockError {
    /// No usable credentials were supplied
    #[error("Could not compose key - {0}")]
    Credential(#[from] crypto::CredentialError),
    /// A cipher could not be initialised or run
    #[error("Decryption failed - {0}")]
    Crypto(#[from] CryptoError),
    /// A MAC or checksum did not match. This indicates an invalid key or corrupt DB
    #[error("Integrity check failed - {0}")]
    Integrity(#[from] IntegrityError),
    /// The decrypted body is structurally invalid
    #[error("Corrupt database - {0}")]
    Format(#[from] FormatError),
    /// Error encountered reading the encrypted data
    #[error("IO error during decryption - {0}")]
    Io(#[from] std::io::Error),
}
