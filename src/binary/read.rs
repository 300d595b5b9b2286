use super::{errors, header, Kdbx, Locked};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read a database from a input stream
///
/// The database starts locked, use [`Kdbx::unlock`] to unlock
///
/// [`Kdbx::unlock`]: crate::Kdbx#method.unlock
pub fn from_reader<R: Read>(mut input: R) -> Result<Kdbx<Locked>, errors::OpenError> {
    let mut buffer = [0u8; 4];
    input.read_exact(&mut buffer)?;

    if u32::from_le_bytes(buffer) != super::KEEPASS_MAGIC_NUMBER {
        return Err(errors::FormatError::NonKeepassFormat.into());
    }

    input.read_exact(&mut buffer)?;

    if u32::from_le_bytes(buffer) != super::KDBX_MAGIC_NUMBER {
        return Err(errors::FormatError::UnsupportedFileFormat.into());
    }

    input.read_exact(&mut buffer)?;

    let minor_version = u16::from_le_bytes([buffer[0], buffer[1]]);
    let major_version = u16::from_le_bytes([buffer[2], buffer[3]]);
    log::debug!("Archive version {}.{}", major_version, minor_version);

    let header = header::KdbxHeader::read(&mut input)?;
    let mut encrypted_data = Vec::new();
    input.read_to_end(&mut encrypted_data)?;

    let state = Locked {
        header,
        major_version,
        minor_version,
        encrypted_data,
    };

    Ok(Kdbx { state })
}

/// Read a database from a given path
///
/// The database starts locked, use [`Kdbx::unlock`] to unlock
///
/// [`Kdbx::unlock`]: crate::Kdbx#method.unlock
pub fn open<P: AsRef<Path>>(path: P) -> Result<Kdbx<Locked>, errors::OpenError> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    from_reader(&mut file)
}
