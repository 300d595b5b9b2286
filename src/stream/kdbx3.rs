use crate::binary::errors::{FormatError, IntegrityError, UnlockError};
use crate::crypto;
use std::io::Read;

/// Bytes of block index before each block's checksum, unused
const BLOCK_ID_LEN: usize = 4;
const BLOCK_HASH_LEN: usize = 32;
const BLOCK_SIZE_LEN: usize = 4;
/// Upper bound on blocks before the terminating block must appear
pub(crate) const MAX_BLOCKS: usize = 9999;

/// Reassemble the hashed block stream of a decrypted KDBX 3 body
///
/// Each block is `[index: 4][sha256: 32][length: 4 LE][data]`, and the
/// stream ends with a block whose hash and length are all zero. Block
/// data is compacted towards the front of `body`, which is then
/// truncated and gunzipped if requested.
pub(crate) fn read_hashed_blocks(
    mut body: Vec<u8>,
    compressed: bool,
) -> Result<Vec<u8>, UnlockError> {
    let mut idx = 0;
    let mut dest = 0;

    for block_idx in 0..MAX_BLOCKS {
        let hash_start = idx + BLOCK_ID_LEN;
        let size_start = hash_start + BLOCK_HASH_LEN;
        let data_start = size_start + BLOCK_SIZE_LEN;
        if data_start > body.len() {
            return Err(FormatError::BlockOverrun { index: block_idx }.into());
        }

        if body[hash_start..data_start].iter().all(|b| *b == 0) {
            body.truncate(dest);
            log::debug!("Read {} hashed blocks, {} bytes", block_idx, dest);
            return if compressed {
                decompress(&body)
            } else {
                Ok(body)
            };
        }

        let mut size_buf = [0u8; BLOCK_SIZE_LEN];
        size_buf.copy_from_slice(&body[size_start..data_start]);
        let size = u32::from_le_bytes(size_buf) as usize;
        let data_end = data_start
            .checked_add(size)
            .filter(|end| *end <= body.len())
            .ok_or(FormatError::BlockOverrun { index: block_idx })?;

        if !crypto::verify_sha256(&body[data_start..data_end], &body[hash_start..size_start]) {
            return Err(IntegrityError::BlockChecksum { index: block_idx }.into());
        }

        // Every block carries a 40 byte prefix, so the write cursor
        // always trails the data being moved.
        assert!(dest < data_start);
        body.copy_within(data_start..data_end, dest);
        dest += size;
        idx = data_end;
    }

    Err(FormatError::MissingBlockTerminator(MAX_BLOCKS).into())
}

fn decompress(data: &[u8]) -> Result<Vec<u8>, UnlockError> {
    let mut decoder = libflate::gzip::Decoder::new(data)?;
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    log::debug!("Decompressed body to {} bytes", decompressed.len());
    Ok(decompressed)
}
