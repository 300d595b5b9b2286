use crate::binary::errors::CryptoError;

use aes::{Aes128, Aes192, Aes256};
use cipher::consts::U16;
use cipher::generic_array::GenericArray;
use cipher::{BlockEncrypt, BlockSizeUser, KeyInit};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Length of every key produced from the user's credentials
pub const KEY_LENGTH: usize = 32;

#[derive(Debug, Error)]
/// Problems with the credentials supplied to unlock a database
pub enum CredentialError {
    /// Neither a password nor a key file was given
    #[error("No password or key file supplied")]
    NoCredentials,
    /// The key file could not be read
    #[error("Could not read key file {}: {source}", .path.display())]
    KeyFile {
        /// Location of the key file
        path: PathBuf,
        /// Underlying read error
        source: std::io::Error,
    },
}

/// Credentials needed to unlock the database
///
/// An empty password counts as no password. The key file is used
/// as raw bytes, whatever its contents.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct CompositeKey {
    pw: Option<String>,
    keyfile: Option<Vec<u8>>,
}

impl CompositeKey {
    /// Create a new composite key from an optional password and key file contents
    pub fn new(pw: Option<String>, keyfile: Option<Vec<u8>>) -> CompositeKey {
        CompositeKey { pw, keyfile }
    }

    /// Utility method for making a key with just a password
    pub fn from_password(pw: &str) -> CompositeKey {
        CompositeKey::new(Some(pw.into()), None)
    }

    /// Read a key file from disk and add it to this key
    pub fn with_key_file<P: AsRef<Path>>(
        mut self,
        path: P,
    ) -> Result<CompositeKey, CredentialError> {
        let path = path.as_ref();
        let contents = fs::read(path).map_err(|source| CredentialError::KeyFile {
            path: path.to_path_buf(),
            source,
        })?;
        self.keyfile = Some(contents);
        Ok(self)
    }

    /// Hash the password and key file into the seed for key transformation
    pub(crate) fn composed(&self) -> Result<ComposedKey, CredentialError> {
        let password = self.pw.as_deref().filter(|pw| !pw.is_empty());
        if password.is_none() && self.keyfile.is_none() {
            return Err(CredentialError::NoCredentials);
        }

        let mut hasher = Sha256::new();
        if let Some(pw) = password {
            hasher.update(Sha256::digest(pw.as_bytes()));
        }
        if let Some(ref keyfile) = self.keyfile {
            hasher.update(Sha256::digest(keyfile));
        }

        let mut composed = Zeroizing::new([0u8; KEY_LENGTH]);
        composed.copy_from_slice(&hasher.finalize());
        Ok(ComposedKey(composed))
    }
}

/// Hash of the user's credentials, before key transformation
pub(crate) struct ComposedKey(Zeroizing<[u8; KEY_LENGTH]>);

impl ComposedKey {
    /// Run the AES key transformation and derive the body cipher key
    ///
    /// Each round encrypts the second 16 byte half, then the first, with
    /// `transform_seed` as the AES key. The result is
    /// `sha256(master_seed || sha256(transformed))`.
    pub(crate) fn roll(
        &self,
        rounds: u64,
        transform_seed: &[u8],
        master_seed: &[u8],
    ) -> Result<CipherKey, CryptoError> {
        let mut transformed = self.0.clone();
        match transform_seed.len() {
            16 => transform::<Aes128>(transform_seed, &mut transformed, rounds)?,
            24 => transform::<Aes192>(transform_seed, &mut transformed, rounds)?,
            32 => transform::<Aes256>(transform_seed, &mut transformed, rounds)?,
            _ => return Err(CryptoError::InvalidLength("key transformation")),
        }
        log::debug!("Applied {} key transformation rounds", rounds);

        Ok(MasterKey(Zeroizing::new(sha256(&*transformed))).cipher_key(master_seed))
    }
}

fn transform<C>(key: &[u8], block: &mut [u8; KEY_LENGTH], rounds: u64) -> Result<(), CryptoError>
where
    C: BlockEncrypt + BlockSizeUser<BlockSize = U16> + KeyInit,
{
    let cipher =
        C::new_from_slice(key).map_err(|_| CryptoError::InvalidLength("key transformation"))?;
    let (head, tail) = block.split_at_mut(KEY_LENGTH / 2);
    for _ in 0..rounds {
        cipher.encrypt_block(GenericArray::from_mut_slice(tail));
        cipher.encrypt_block(GenericArray::from_mut_slice(head));
    }
    Ok(())
}

/// Transformed composite key
pub(crate) struct MasterKey(Zeroizing<[u8; KEY_LENGTH]>);

impl MasterKey {
    /// Obtain a key to initialise a cipher
    pub(crate) fn cipher_key(&self, seed: &[u8]) -> CipherKey {
        let mut hasher = Sha256::new();
        hasher.update(seed);
        hasher.update(&*self.0);

        let mut key = Zeroizing::new([0u8; KEY_LENGTH]);
        key.copy_from_slice(&hasher.finalize());
        CipherKey(key)
    }
}

/// Used to initialise the encryption/decryption cipher
pub(crate) struct CipherKey(pub(crate) Zeroizing<[u8; KEY_LENGTH]>);

/// Confirm the hash of a given block of data for data corruption detection
pub(crate) fn verify_sha256(data: &[u8], expected_sha: &[u8]) -> bool {
    expected_sha == sha256(data).as_slice()
}

pub(crate) fn sha256(data: &[u8]) -> [u8; KEY_LENGTH] {
    Sha256::digest(data).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composed(pw: Option<&str>, keyfile: Option<&[u8]>) -> [u8; KEY_LENGTH] {
        let key = CompositeKey::new(pw.map(String::from), keyfile.map(<[u8]>::to_vec));
        *key.composed().unwrap().0
    }

    #[test]
    fn password_only() {
        assert_eq!(
            composed(Some("kdbxrs"), None),
            sha256(&sha256(b"kdbxrs"))
        );
    }

    #[test]
    fn key_file_only() {
        assert_eq!(composed(None, Some(b"key-file")), sha256(&sha256(b"key-file")));
        assert_eq!(
            composed(Some(""), Some(b"key-file")),
            sha256(&sha256(b"key-file"))
        );
    }

    #[test]
    fn password_and_key_file() {
        let mut both = sha256(b"kdbxrs").to_vec();
        both.extend_from_slice(&sha256(b"key-file"));
        assert_eq!(composed(Some("kdbxrs"), Some(b"key-file")), sha256(&both));
    }

    #[test]
    fn no_credentials() {
        for key in [CompositeKey::new(None, None), CompositeKey::from_password("")] {
            assert!(matches!(key.composed(), Err(CredentialError::NoCredentials)));
        }
    }

    #[test]
    fn missing_key_file() {
        let err = CompositeKey::from_password("kdbxrs")
            .with_key_file("/nonexistent/kdbx3-rs/key-file")
            .err()
            .unwrap();
        assert!(matches!(err, CredentialError::KeyFile { .. }));
    }

    #[test]
    fn roll_matches_manual_transform() {
        use cipher::BlockEncrypt;

        let seed = [7u8; 32];
        let master_seed = [9u8; 32];
        let key = CompositeKey::from_password("kdbxrs").composed().unwrap();

        let mut expected = *key.0;
        let aes = Aes256::new_from_slice(&seed).unwrap();
        for _ in 0..3 {
            let (head, tail) = expected.split_at_mut(16);
            aes.encrypt_block(GenericArray::from_mut_slice(tail));
            aes.encrypt_block(GenericArray::from_mut_slice(head));
        }
        let mut final_input = master_seed.to_vec();
        final_input.extend_from_slice(&sha256(&expected));

        let rolled = key.roll(3, &seed, &master_seed).unwrap();
        assert_eq!(*rolled.0, sha256(&final_input));
    }

    #[test]
    fn roll_is_deterministic_and_round_sensitive() {
        let key = CompositeKey::from_password("kdbxrs").composed().unwrap();
        let seed = [1u8; 16];
        let first = key.roll(10, &seed, b"seed").unwrap();
        let again = key.roll(10, &seed, b"seed").unwrap();
        assert_eq!(*first.0, *again.0);

        for rounds in 0..10 {
            let other = key.roll(rounds, &seed, b"seed").unwrap();
            assert_ne!(*first.0, *other.0, "{} rounds collided with 10", rounds);
        }
    }

    #[test]
    fn roll_supports_all_aes_key_sizes() {
        let key = CompositeKey::from_password("kdbxrs").composed().unwrap();
        let a = key.roll(1, &[1u8; 16], b"").unwrap();
        let b = key.roll(1, &[1u8; 24], b"").unwrap();
        let c = key.roll(1, &[1u8; 32], b"").unwrap();
        assert_ne!(*a.0, *b.0);
        assert_ne!(*b.0, *c.0);
    }

    #[test]
    fn roll_rejects_bad_transform_key() {
        let key = CompositeKey::from_password("kdbxrs").composed().unwrap();
        assert!(matches!(
            key.roll(1, &[], b""),
            Err(CryptoError::InvalidLength(_))
        ));
        assert!(matches!(
            key.roll(1, &[0u8; 20], b""),
            Err(CryptoError::InvalidLength(_))
        ));
    }
}
