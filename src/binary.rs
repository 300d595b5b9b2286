//! .kdbx files and the outer binary format

pub(crate) mod errors;
mod header;
mod header_fields;
mod read;
mod states;

pub use errors::{CryptoError, FormatError, IntegrityError, OpenError, UnlockError};
pub use header::{HeaderField, KdbxHeader, OuterHeaderId};
pub use header_fields::{
    Cipher, CompressionType, InnerStreamCipherAlgorithm, KDBX_MAGIC_NUMBER, KEEPASS_MAGIC_NUMBER,
};
pub use read::{from_reader, open};
pub use states::{FailedUnlock, Kdbx, Locked, Unlocked};
