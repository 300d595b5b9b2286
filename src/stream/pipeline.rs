use crate::binary::errors::UnlockError;
use crate::binary::KdbxHeader;
use crate::crypto;

use aes::Aes256;

use super::{read_hashed_blocks, BlockCipherReader};

/// Decrypt, verify and reassemble a KDBX 3 body into its XML document
///
/// The outer cipher is always AES-256-CBC; other cipher ids are rejected
/// when the header is read.
pub(crate) fn kdbx3_read_stream(
    encrypted: &[u8],
    cipher_key: &crypto::CipherKey,
    header: &KdbxHeader,
) -> Result<Vec<u8>, UnlockError> {
    let mut decryptor =
        BlockCipherReader::<Aes256, _>::wrap(encrypted, cipher_key, &header.encryption_iv)?;
    decryptor.verify_start_bytes(&header.stream_start_bytes)?;
    let plaintext = decryptor.decrypt_to_end()?;
    log::debug!("Decrypted {} body bytes", plaintext.len());

    read_hashed_blocks(plaintext, header.compression_type.is_compressed())
}
