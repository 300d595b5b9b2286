use crate::utils;

/// First four bytes of any keepass database
pub const KEEPASS_MAGIC_NUMBER: u32 = 0x9AA2_D903;
/// Second four bytes of a KDBX 2.x+ database
pub const KDBX_MAGIC_NUMBER: u32 = 0xB54B_FB67;

const AES256_UUID: &str = "31c1f2e6-bf71-4350-be58-05216afc5aff";
const COMPRESSION_TYPE_NONE: u32 = 0;
const COMPRESSION_TYPE_GZIP: u32 = 1;

#[derive(PartialEq, Eq, Debug, Copy, Clone)]
/// Encryption cipher used for decryption the main database data
pub enum Cipher {
    /// AES 256 in CBC mode
    Aes256,
    /// Cipher unknown to this library
    Unknown(uuid::Uuid),
}

const CIPHER_TABLE: [(&str, Cipher); 1] = [(AES256_UUID, Cipher::Aes256)];

impl From<uuid::Uuid> for Cipher {
    fn from(uuid: uuid::Uuid) -> Cipher {
        utils::value_from_uuid_table(&CIPHER_TABLE, uuid).unwrap_or(Cipher::Unknown(uuid))
    }
}

/// Inner stream cipher identifier used for encrypting protected fields
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum InnerStreamCipherAlgorithm {
    /// ArcFour algorithm
    ArcFour,
    /// Salsa20 stream cipher
    Salsa20,
    /// ChaCha20 stream cipher
    ChaCha20,
    /// Unknown stream cipher
    Unknown(u32),
}

impl From<u32> for InnerStreamCipherAlgorithm {
    fn from(id: u32) -> InnerStreamCipherAlgorithm {
        match id {
            1 => InnerStreamCipherAlgorithm::ArcFour,
            2 => InnerStreamCipherAlgorithm::Salsa20,
            3 => InnerStreamCipherAlgorithm::ChaCha20,
            x => InnerStreamCipherAlgorithm::Unknown(x),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
/// Compression method used prior to encryption
pub enum CompressionType {
    /// The encrypted data is uncompressed
    #[default]
    None,
    /// The encrypted data uses gzip compression
    Gzip,
    /// Some other non-zero flag, treated as gzip
    Unknown(u32),
}

impl CompressionType {
    /// Whether the body must be decompressed after decryption
    pub fn is_compressed(self) -> bool {
        self != CompressionType::None
    }
}

impl From<u32> for CompressionType {
    fn from(id: u32) -> CompressionType {
        match id {
            COMPRESSION_TYPE_NONE => CompressionType::None,
            COMPRESSION_TYPE_GZIP => CompressionType::Gzip,
            _ => CompressionType::Unknown(id),
        }
    }
}
