//! Builders for encrypted and framed test data

use crate::stream::random::ProtectedStream;
use aes::Aes256;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use cipher::generic_array::GenericArray;
use cipher::{BlockEncryptMut, KeyIvInit};
use sha2::{Digest, Sha256};
use std::io::Write;

/// AES-256-CBC encrypt, zero padding the input to a whole block
pub(crate) fn aes_cbc_encrypt(key: &[u8; 32], iv: &[u8; 16], plain: &[u8]) -> Vec<u8> {
    let mut data = plain.to_vec();
    let padded_len = (data.len() + 15) / 16 * 16;
    data.resize(padded_len, 0);

    let mut encryptor = cbc::Encryptor::<Aes256>::new_from_slices(key, iv).unwrap();
    for block in data.chunks_exact_mut(16) {
        encryptor.encrypt_block_mut(GenericArray::from_mut_slice(block));
    }
    data
}

/// Frame `blocks` as a hashed block stream, with the terminating block
pub(crate) fn hashed_blocks(blocks: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for (index, block) in blocks.iter().enumerate() {
        out.extend_from_slice(&(index as u32).to_le_bytes());
        out.extend_from_slice(&Sha256::digest(block));
        out.extend_from_slice(&(block.len() as u32).to_le_bytes());
        out.extend_from_slice(block);
    }
    out.extend_from_slice(&(blocks.len() as u32).to_le_bytes());
    out.extend_from_slice(&[0u8; 36]);
    out
}

pub(crate) fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = libflate::gzip::Encoder::new(Vec::new()).unwrap();
    encoder.write_all(data).unwrap();
    encoder.finish().into_result().unwrap()
}

/// Encrypt `plain` with the next keystream bytes and base64 encode it
pub(crate) fn protect(stream: &mut ProtectedStream, plain: &[u8]) -> String {
    let mut data = plain.to_vec();
    stream.apply_keystream(&mut data).unwrap();
    STANDARD.encode(data)
}
