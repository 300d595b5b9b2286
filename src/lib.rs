#![deny(missing_docs)]

//! Module to read KDBX 3.1 (Keepass 2) database files into a flat list of credentials.
//!
//! The main types in this crate are:
//!
//! * [`Kdbx`] which represents a database file, locked or unlocked
//! * [`CredentialRecord`] which represents one password entry
//!
//! # Reading credentials
//!
//! The shortest path from a file to its entries is [`read_credentials`]:
//!
//! ```no_run
//! # fn main() -> Result<(), kdbx3_rs::Error> {
//! use kdbx3_rs::CompositeKey;
//!
//! let key = CompositeKey::from_password("kdbxrs");
//! for record in kdbx3_rs::read_credentials("passwords.kdbx", &key)? {
//!     println!("{}", record);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Opening a database
//!
//! Databases can also be read with the [`kdbx3_rs::open`] function. This provides
//! access to header information. It can then be unlocked by providing a [`CompositeKey`]
//! to the [`Kdbx.unlock`] method to access any encrypted data. A failed unlock
//! hands the locked database back, so another key can be tried.
//!
//! ```no_run
//! # fn main() -> Result<(), kdbx3_rs::Error> {
//! use kdbx3_rs::CompositeKey;
//!
//! let kdbx = kdbx3_rs::open("passwords.kdbx")?;
//! println!("Version {}.{}", kdbx.major_version(), kdbx.minor_version());
//! let key = CompositeKey::from_password("kdbxrs").with_key_file("passwords.key")?;
//! let unlocked = kdbx.unlock(&key)?;
//! let found = unlocked.iter().filter(|record| record.matches("bank")).count();
//! println!("{} matching entries", found);
//! # Ok(())
//! # }
//! ```
//!
//! Alternatively, [`kdbx3_rs::from_reader`] can be used to open a database
//! from a non file source (such as in-memory or a network stream)
//!
//! [`CompositeKey`]: crate::CompositeKey
//! [`CredentialRecord`]: crate::CredentialRecord
//! [`read_credentials`]: crate::read_credentials
//! [`kdbx3_rs::from_reader`]: crate::from_reader
//! [`kdbx3_rs::open`]: crate::open
//! [`Kdbx`]: crate::Kdbx
//! [`Kdbx.unlock`]: crate::Kdbx#method.unlock

pub mod binary;
mod crypto;
pub mod errors;
mod stream;
mod types;
mod utils;
pub mod xml;

#[cfg(test)]
mod test_utils;

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

pub use binary::{from_reader, open, Kdbx};
pub use crypto::CompositeKey;
pub use errors::Error;
pub use stream::random::ProtectedStream;
pub use types::CredentialRecord;

/// Open, unlock and flatten the database at `path`
///
/// Any panic raised while processing the file is caught and reported as
/// [`Error::Internal`].
pub fn read_credentials<P: AsRef<Path>>(
    path: P,
    key: &CompositeKey,
) -> Result<Vec<CredentialRecord>, Error> {
    let path = path.as_ref();
    catch_panics(path, || {
        let kdbx = open(path)?;
        log::debug!("Opened {}", path.display());
        Ok(kdbx.unlock(key)?.into_credentials())
    })
}

fn catch_panics<T, F>(path: &Path, f: F) -> Result<T, Error>
where
    F: FnOnce() -> Result<T, Error>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("Panic while reading {}: {}", path.display(), message);
            Err(Error::Internal(message))
        }
    }
}
