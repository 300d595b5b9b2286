use super::errors::{FormatError as Error, OpenError};
use super::header_fields::{Cipher, CompressionType, InnerStreamCipherAlgorithm};
use crate::utils;
use std::io::Read;
use uuid::Uuid;

type Result<T> = std::result::Result<T, OpenError>;

/// Upper bound on fields before the end of header marker must appear
pub const MAX_HEADER_FIELDS: usize = 99;

const AES_KEY_LENGTHS: [usize; 3] = [16, 24, 32];
const IV_LENGTH: usize = 16;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
/// Field types for unencrypted header
pub enum OuterHeaderId {
    /// Last header field
    EndOfHeader,
    /// Custom comment to describe the database
    Comment,
    /// UUID indicating the cipher for the database
    CipherId,
    /// Compression algorithm in use
    CompressionFlags,
    /// Seed hashed with the transformed key to produce the cipher key
    MasterSeed,
    /// AES key used to transform the composite key
    TransformSeed,
    /// Number of rounds of AES to use to generate keys
    TransformRounds,
    /// Initial value for encrypting/decrypting the stream
    EncryptionIv,
    /// Key used for decrypting protected values
    ProtectedStreamKey,
    /// Encrypted copy of the first bytes of the body, used to check the key
    StreamStartBytes,
    /// Cipher identifer for protected values
    InnerRandomStreamId,
    /// Some header field not supported by this library
    Unknown(u8),
}

impl From<u8> for OuterHeaderId {
    fn from(id: u8) -> OuterHeaderId {
        match id {
            0 => OuterHeaderId::EndOfHeader,
            0x1 => OuterHeaderId::Comment,
            0x2 => OuterHeaderId::CipherId,
            0x3 => OuterHeaderId::CompressionFlags,
            0x4 => OuterHeaderId::MasterSeed,
            0x5 => OuterHeaderId::TransformSeed,
            0x6 => OuterHeaderId::TransformRounds,
            0x7 => OuterHeaderId::EncryptionIv,
            0x8 => OuterHeaderId::ProtectedStreamKey,
            0x9 => OuterHeaderId::StreamStartBytes,
            0xA => OuterHeaderId::InnerRandomStreamId,
            x => OuterHeaderId::Unknown(x),
        }
    }
}

impl From<OuterHeaderId> for u8 {
    fn from(id: OuterHeaderId) -> u8 {
        match id {
            OuterHeaderId::EndOfHeader => 0,
            OuterHeaderId::Comment => 0x1,
            OuterHeaderId::CipherId => 0x2,
            OuterHeaderId::CompressionFlags => 0x3,
            OuterHeaderId::MasterSeed => 0x4,
            OuterHeaderId::TransformSeed => 0x5,
            OuterHeaderId::TransformRounds => 0x6,
            OuterHeaderId::EncryptionIv => 0x7,
            OuterHeaderId::ProtectedStreamKey => 0x8,
            OuterHeaderId::StreamStartBytes => 0x9,
            OuterHeaderId::InnerRandomStreamId => 0xA,
            OuterHeaderId::Unknown(x) => x,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// A raw header field as stored in the file
pub struct HeaderField {
    ty: OuterHeaderId,
    data: Vec<u8>,
}

impl HeaderField {
    pub(crate) fn new(ty: OuterHeaderId, data: Vec<u8>) -> HeaderField {
        HeaderField { ty, data }
    }

    /// Type tag of this field
    pub fn ty(&self) -> OuterHeaderId {
        self.ty
    }

    /// Uninterpreted payload of this field
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

pub struct HeaderParser<'a, R: Read + 'a> {
    reader: &'a mut R,
}

impl<'a, R> HeaderParser<'a, R>
where
    R: Read + 'a,
{
    pub(crate) fn new(reader: &'a mut R) -> HeaderParser<'a, R> {
        HeaderParser { reader }
    }

    pub(crate) fn read_one_header(&mut self) -> Result<HeaderField> {
        let mut ty_buffer = [0u8];
        self.reader.read_exact(&mut ty_buffer)?;
        let ty = OuterHeaderId::from(ty_buffer[0]);
        let mut len_buffer = [0u8; 2];
        self.reader.read_exact(&mut len_buffer)?;
        let len = u16::from_le_bytes(len_buffer);
        let mut header_buffer = utils::buffer(len as usize);
        self.reader.read_exact(&mut header_buffer)?;

        Ok(HeaderField::new(ty, header_buffer))
    }
}

#[derive(Default)]
pub struct KdbxHeaderBuilder {
    pub cipher: Option<Cipher>,
    pub inner_stream_cipher: Option<InnerStreamCipherAlgorithm>,
    pub compression_type: CompressionType,
    pub master_seed: Vec<u8>,
    pub transform_seed: Vec<u8>,
    pub transform_rounds: u64,
    pub encryption_iv: Vec<u8>,
    pub protected_stream_key: Vec<u8>,
    pub stream_start_bytes: Vec<u8>,
    pub other_headers: Vec<HeaderField>,
}

impl KdbxHeaderBuilder {
    fn add_header(&mut self, header: HeaderField) -> std::result::Result<(), Error> {
        log::trace!("Header field {:?} ({} bytes)", header.ty, header.data.len());
        match header.ty {
            OuterHeaderId::CipherId => {
                let cipher = Uuid::from_slice(&header.data)
                    .map(Cipher::from)
                    .map_err(|_e| {
                        Error::MalformedField(header.ty, "Cipher UUID not valid".into())
                    })?;
                if let Cipher::Unknown(uuid) = cipher {
                    return Err(Error::UnknownCipher(uuid));
                }
                self.cipher = Some(cipher);
            }
            OuterHeaderId::CompressionFlags => {
                let flags: [u8; 4] = header.data.as_slice().try_into().map_err(|_| {
                    Error::MalformedField(header.ty, "Wrong size for compression ID".into())
                })?;
                let compression_type = CompressionType::from(u32::from_le_bytes(flags));
                if let CompressionType::Unknown(flag) = compression_type {
                    log::warn!("Unrecognised compression flag {}, assuming gzip", flag);
                }
                self.compression_type = compression_type;
            }
            OuterHeaderId::MasterSeed => self.master_seed = header.data,
            OuterHeaderId::TransformSeed => {
                if !AES_KEY_LENGTHS.contains(&header.data.len()) {
                    return Err(Error::MalformedField(
                        header.ty,
                        format!("AES key must be 16, 24 or 32 bytes, got {}", header.data.len()),
                    ));
                }
                self.transform_seed = header.data;
            }
            OuterHeaderId::TransformRounds => {
                let rounds: [u8; 8] = header.data.as_slice().try_into().map_err(|_| {
                    Error::MalformedField(header.ty, "Transform rounds must be 8 bytes".into())
                })?;
                self.transform_rounds = u64::from_le_bytes(rounds);
            }
            OuterHeaderId::EncryptionIv => {
                if header.data.len() != IV_LENGTH {
                    return Err(Error::MalformedField(
                        header.ty,
                        format!("IV must be {} bytes, got {}", IV_LENGTH, header.data.len()),
                    ));
                }
                self.encryption_iv = header.data;
            }
            OuterHeaderId::ProtectedStreamKey => self.protected_stream_key = header.data,
            OuterHeaderId::StreamStartBytes => self.stream_start_bytes = header.data,
            OuterHeaderId::InnerRandomStreamId => {
                let id: [u8; 4] = header.data.as_slice().try_into().map_err(|_| {
                    Error::MalformedField(header.ty, "Wrong size for stream cipher ID".into())
                })?;
                let algorithm = InnerStreamCipherAlgorithm::from(u32::from_le_bytes(id));
                if algorithm != InnerStreamCipherAlgorithm::Salsa20 {
                    return Err(Error::UnknownInnerStream(algorithm));
                }
                self.inner_stream_cipher = Some(algorithm);
            }
            _ => self.other_headers.push(header),
        }

        Ok(())
    }

    fn build(self) -> KdbxHeader {
        KdbxHeader {
            cipher: self.cipher,
            inner_stream_cipher: self.inner_stream_cipher,
            compression_type: self.compression_type,
            master_seed: self.master_seed,
            transform_seed: self.transform_seed,
            transform_rounds: self.transform_rounds,
            encryption_iv: self.encryption_iv,
            protected_stream_key: self.protected_stream_key,
            stream_start_bytes: self.stream_start_bytes,
            other_headers: self.other_headers,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
/// Unencrypted database configuration and custom data
///
/// Fields the file did not provide are left empty; they are only
/// checked when the database is unlocked.
pub struct KdbxHeader {
    /// Encryption cipher used for decryption the database
    pub cipher: Option<Cipher>,
    /// Cipher used for protected values inside the database
    pub inner_stream_cipher: Option<InnerStreamCipherAlgorithm>,
    /// Compression applied prior to encryption
    pub compression_type: CompressionType,
    /// Seed hashed with the transformed key to make crypto keys DB specific
    pub master_seed: Vec<u8>,
    /// AES key used for the key transformation rounds
    pub transform_seed: Vec<u8>,
    /// Number of AES rounds applied to the composite key
    pub transform_rounds: u64,
    /// IV used for initializing crypto
    pub encryption_iv: Vec<u8>,
    /// Key for the protected value stream cipher
    pub protected_stream_key: Vec<u8>,
    /// Expected plaintext of the first encrypted bytes, empty if absent
    pub stream_start_bytes: Vec<u8>,
    /// Custom and unrecognized header types
    pub other_headers: Vec<HeaderField>,
}

impl KdbxHeader {
    /// Read fields up to and including the end of header marker
    ///
    /// Each field is validated as soon as it is read. The end marker's
    /// payload is consumed and dropped.
    pub(crate) fn read<R: Read>(reader: &mut R) -> Result<KdbxHeader> {
        let mut parser = HeaderParser::new(reader);
        let mut header_builder = KdbxHeaderBuilder::default();
        let mut terminated = false;
        for _ in 0..MAX_HEADER_FIELDS {
            let header = parser.read_one_header()?;
            if header.ty == OuterHeaderId::EndOfHeader {
                terminated = true;
                break;
            }
            header_builder.add_header(header)?;
        }
        if !terminated {
            return Err(Error::MissingHeaderTerminator(MAX_HEADER_FIELDS).into());
        }

        let header = header_builder.build();
        log::debug!(
            "Read header: cipher {:?}, compression {:?}, {} rounds, {} other fields",
            header.cipher,
            header.compression_type,
            header.transform_rounds,
            header.other_headers.len()
        );
        Ok(header)
    }
}
