use super::errors::{FormatError, UnlockError};
use super::header;
use crate::stream::random::ProtectedStream;
use crate::types::CredentialRecord;
use crate::{crypto, stream};
use std::ops::Deref;

pub trait KdbxState: std::fmt::Debug {
    fn header(&self) -> &header::KdbxHeader;
    fn major_version(&self) -> u16;
    fn minor_version(&self) -> u16;
}

#[derive(Debug)]
/// A kdbx file
///
/// Most methods are available on a specific state
/// like Kdbx<Locked> or Kdbx<Unlocked>
pub struct Kdbx<S>
where
    S: KdbxState,
{
    pub(super) state: S,
}

impl<T: KdbxState> Kdbx<T> {
    /// Unencrypted database configuration and custom data
    pub fn header(&self) -> &header::KdbxHeader {
        self.state.header()
    }

    /// Major version of the database file format
    pub fn major_version(&self) -> u16 {
        self.state.major_version()
    }

    /// Minor version of the database file format
    pub fn minor_version(&self) -> u16 {
        self.state.minor_version()
    }
}

#[derive(Debug)]
/// An unlocked kdbx file, allowing access to stored credentials
pub struct Unlocked {
    /// Header data of the kdbx archive, includes unencrypted metadata
    pub(crate) header: header::KdbxHeader,
    /// Major version of the database file format
    pub(crate) major_version: u16,
    /// Minor version of the database file format
    pub(crate) minor_version: u16,
    /// Unencrypted unparsed XML data
    pub(crate) xml_data: Vec<u8>,
    /// Flattened password entries
    pub(crate) credentials: Vec<CredentialRecord>,
}

impl KdbxState for Unlocked {
    fn header(&self) -> &header::KdbxHeader {
        &self.header
    }

    fn major_version(&self) -> u16 {
        self.major_version
    }

    fn minor_version(&self) -> u16 {
        self.minor_version
    }
}

impl Kdbx<Unlocked> {
    /// Password entries of the database, in document order
    pub fn credentials(&self) -> &[CredentialRecord] {
        &self.state.credentials
    }

    /// Take ownership of the password entries
    pub fn into_credentials(self) -> Vec<CredentialRecord> {
        self.state.credentials
    }

    /// Raw decrypted XML data, to handle fields not extracted by this crate
    ///
    /// Protected values are still encrypted with the inner stream.
    pub fn raw_xml(&self) -> &[u8] {
        &self.state.xml_data
    }
}

impl Deref for Kdbx<Unlocked> {
    type Target = [CredentialRecord];

    fn deref(&self) -> &[CredentialRecord] {
        &self.state.credentials
    }
}

#[derive(Debug, PartialEq, Eq)]
/// A locked kdbx file, use unlock(composite_key) to unlock
pub struct Locked {
    /// Header data of the kdbx archive, includes unencrypted metadata
    pub(crate) header: header::KdbxHeader,
    /// Major version of the database file format
    pub(crate) major_version: u16,
    /// Minor version of the database file format
    pub(crate) minor_version: u16,
    /// Encrypted vault data
    pub(crate) encrypted_data: Vec<u8>,
}

impl KdbxState for Locked {
    fn header(&self) -> &header::KdbxHeader {
        &self.header
    }

    fn major_version(&self) -> u16 {
        self.major_version
    }

    fn minor_version(&self) -> u16 {
        self.minor_version
    }
}

#[derive(Debug)]
/// An unlock attempt that failed, holding the database so it can be retried
pub struct FailedUnlock(pub Kdbx<Locked>, pub UnlockError);

impl std::fmt::Display for FailedUnlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.1)
    }
}

impl std::error::Error for FailedUnlock {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.1)
    }
}

impl Kdbx<Locked> {
    fn decrypt(
        &self,
        key: &crypto::CompositeKey,
    ) -> Result<(Vec<u8>, Vec<CredentialRecord>), UnlockError> {
        let header = &self.state.header;
        let composed_key = key.composed()?;
        let cipher_key = composed_key.roll(
            header.transform_rounds,
            &header.transform_seed,
            &header.master_seed,
        )?;

        let xml_data = stream::kdbx3_read_stream(&self.state.encrypted_data, &cipher_key, header)?;
        let database = crate::xml::parse_xml(xml_data.as_slice()).map_err(FormatError::from)?;

        let mut protected_stream = ProtectedStream::new(&header.protected_stream_key);
        let credentials = crate::xml::flatten(&database, &mut protected_stream)?;
        Ok((xml_data, credentials))
    }

    /// Unlocks the kdbx file
    ///
    /// If unlock fails, returns the locked kdbx file along with the error
    pub fn unlock(self, key: &crypto::CompositeKey) -> Result<Kdbx<Unlocked>, FailedUnlock> {
        match self.decrypt(key) {
            Ok((xml_data, credentials)) => Ok(Kdbx {
                state: Unlocked {
                    header: self.state.header,
                    major_version: self.state.major_version,
                    minor_version: self.state.minor_version,
                    xml_data,
                    credentials,
                },
            }),
            Err(e) => Err(FailedUnlock(self, e)),
        }
    }
}
