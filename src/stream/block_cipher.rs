use crate::binary::errors::{CryptoError, FormatError, IntegrityError, UnlockError};
use crate::binary::OuterHeaderId;
use crate::crypto;
use cipher::generic_array::GenericArray;
use cipher::{BlockCipher, BlockDecryptMut, BlockSizeUser, KeyInit, KeyIvInit};
use std::io;

/// CBC decryption of the database body
///
/// The chain runs across the stream start bytes and the body, so both
/// must be decrypted through the same reader, in file order.
pub(crate) struct BlockCipherReader<C, R>
where
    R: io::Read,
    C: BlockCipher + BlockDecryptMut,
{
    inner: R,
    cipher: cbc::Decryptor<C>,
}

impl<C, R> BlockCipherReader<C, R>
where
    R: io::Read,
    C: BlockCipher + BlockDecryptMut + KeyInit,
{
    pub(crate) fn wrap(
        inner: R,
        key: &crypto::CipherKey,
        iv: &[u8],
    ) -> Result<BlockCipherReader<C, R>, CryptoError> {
        Ok(BlockCipherReader {
            inner,
            cipher: cbc::Decryptor::new_from_slices(&*key.0, iv)
                .map_err(|_| CryptoError::InvalidLength("body cipher"))?,
        })
    }
}

impl<C, R> BlockCipherReader<C, R>
where
    R: io::Read,
    C: BlockCipher + BlockDecryptMut,
{
    /// Decrypt the block after the header and compare it with the expected start bytes
    ///
    /// Nothing past the start bytes is read when the check fails.
    pub(crate) fn verify_start_bytes(&mut self, expected: &[u8]) -> Result<(), UnlockError> {
        if expected.is_empty() {
            return Ok(());
        }
        if expected.len() % <cbc::Decryptor<C> as BlockSizeUser>::block_size() != 0 {
            return Err(FormatError::MalformedField(
                OuterHeaderId::StreamStartBytes,
                "Not a multiple of the cipher block size".into(),
            )
            .into());
        }

        let mut start_bytes = vec![0u8; expected.len()];
        self.inner.read_exact(&mut start_bytes)?;
        self.decrypt_in_place(&mut start_bytes)?;

        if start_bytes != expected {
            return Err(IntegrityError::MacMismatch.into());
        }
        Ok(())
    }

    /// Decrypt all remaining data without removing padding
    pub(crate) fn decrypt_to_end(mut self) -> io::Result<Vec<u8>> {
        let mut data = Vec::new();
        self.inner.read_to_end(&mut data)?;
        self.decrypt_in_place(&mut data)?;
        Ok(data)
    }

    fn decrypt_in_place(&mut self, data: &mut [u8]) -> io::Result<()> {
        let block_size = <cbc::Decryptor<C> as BlockSizeUser>::block_size();
        let extra = data.len() % block_size;
        if extra != 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "Data size not a multiple of block size, {} extra bytes",
                    extra
                ),
            ));
        }
        for block in data.chunks_exact_mut(block_size) {
            self.cipher
                .decrypt_block_mut(GenericArray::from_mut_slice(block));
        }
        Ok(())
    }
}
