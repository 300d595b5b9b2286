//! Builds KDBX 3.1 archives in memory for the integration tests

#![allow(dead_code)]

use aes::Aes256;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use cipher::generic_array::GenericArray;
use cipher::{BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit};
use kdbx3_rs::ProtectedStream;
use sha2::{Digest, Sha256};
use std::io::Write;

pub const AES256_UUID: [u8; 16] = [
    0x31, 0xc1, 0xf2, 0xe6, 0xbf, 0x71, 0x43, 0x50, 0xbe, 0x58, 0x05, 0x21, 0x6a, 0xfc, 0x5a, 0xff,
];

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Everything needed to write one archive
#[derive(Clone)]
pub struct Fixture {
    pub password: Option<String>,
    pub key_file: Option<Vec<u8>>,
    pub rounds: u64,
    pub transform_seed: [u8; 32],
    pub master_seed: [u8; 32],
    pub iv: [u8; 16],
    pub stream_start: Option<[u8; 32]>,
    pub protected_stream_key: [u8; 32],
    pub compressed: bool,
    /// Payload is split into blocks of at most this size
    pub block_size: usize,
}

impl Default for Fixture {
    fn default() -> Fixture {
        Fixture {
            password: Some("kdbxrs".to_string()),
            key_file: None,
            rounds: 1,
            transform_seed: [0x5e; 32],
            master_seed: [0x3a; 32],
            iv: [0x1f; 16],
            stream_start: Some([0xa5; 32]),
            protected_stream_key: [0x77; 32],
            compressed: false,
            block_size: 1024 * 1024,
        }
    }
}

impl Fixture {
    pub fn cipher_key(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        if let Some(pw) = self.password.as_ref().filter(|pw| !pw.is_empty()) {
            hasher.update(sha256(pw.as_bytes()));
        }
        if let Some(key_file) = &self.key_file {
            hasher.update(sha256(key_file));
        }
        let mut transformed: [u8; 32] = hasher.finalize().into();

        let aes = Aes256::new_from_slice(&self.transform_seed).unwrap();
        for _ in 0..self.rounds {
            aes.encrypt_block(GenericArray::from_mut_slice(&mut transformed[16..]));
            aes.encrypt_block(GenericArray::from_mut_slice(&mut transformed[..16]));
        }

        let mut hasher = Sha256::new();
        hasher.update(self.master_seed);
        hasher.update(sha256(&transformed));
        hasher.finalize().into()
    }

    pub fn header(&self) -> Vec<u8> {
        let mut out = vec![0x03, 0xD9, 0xA2, 0x9A, 0x67, 0xFB, 0x4B, 0xB5];
        out.extend_from_slice(&[1, 0, 3, 0]);
        let compression: u32 = if self.compressed { 1 } else { 0 };
        push_field(&mut out, 2, &AES256_UUID);
        push_field(&mut out, 3, &compression.to_le_bytes());
        push_field(&mut out, 4, &self.master_seed);
        push_field(&mut out, 5, &self.transform_seed);
        push_field(&mut out, 6, &self.rounds.to_le_bytes());
        push_field(&mut out, 7, &self.iv);
        push_field(&mut out, 8, &self.protected_stream_key);
        if let Some(start) = &self.stream_start {
            push_field(&mut out, 9, start);
        }
        push_field(&mut out, 10, &2u32.to_le_bytes());
        push_field(&mut out, 0, b"\r\n\r\n");
        out
    }

    /// The decrypted body: start bytes then the framed payload
    pub fn plain_body(&self, payload: &[u8]) -> Vec<u8> {
        let payload = if self.compressed {
            gzip(payload)
        } else {
            payload.to_vec()
        };
        let mut body = Vec::new();
        if let Some(start) = &self.stream_start {
            body.extend_from_slice(start);
        }
        let blocks: Vec<&[u8]> = payload.chunks(self.block_size).collect();
        body.extend(hashed_blocks(&blocks));
        body
    }

    pub fn build(&self, payload: &[u8]) -> Vec<u8> {
        let mut file = self.header();
        file.extend(aes_cbc_encrypt(
            &self.cipher_key(),
            &self.iv,
            &self.plain_body(payload),
        ));
        file
    }

    pub fn composite_key(&self) -> kdbx3_rs::CompositeKey {
        kdbx3_rs::CompositeKey::new(self.password.clone(), self.key_file.clone())
    }

    pub fn protected_stream(&self) -> ProtectedStream {
        ProtectedStream::new(&self.protected_stream_key)
    }
}

pub fn push_field(out: &mut Vec<u8>, tag: u8, data: &[u8]) {
    out.push(tag);
    out.extend_from_slice(&(data.len() as u16).to_le_bytes());
    out.extend_from_slice(data);
}

pub fn hashed_blocks(blocks: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for (index, block) in blocks.iter().enumerate() {
        out.extend_from_slice(&(index as u32).to_le_bytes());
        out.extend_from_slice(&sha256(block));
        out.extend_from_slice(&(block.len() as u32).to_le_bytes());
        out.extend_from_slice(block);
    }
    out.extend_from_slice(&(blocks.len() as u32).to_le_bytes());
    out.extend_from_slice(&[0u8; 36]);
    out
}

pub fn aes_cbc_encrypt(key: &[u8; 32], iv: &[u8; 16], plain: &[u8]) -> Vec<u8> {
    let mut data = plain.to_vec();
    data.resize((data.len() + 15) / 16 * 16, 0);
    let mut encryptor = cbc::Encryptor::<Aes256>::new_from_slices(key, iv).unwrap();
    for block in data.chunks_exact_mut(16) {
        encryptor.encrypt_block_mut(GenericArray::from_mut_slice(block));
    }
    data
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = libflate::gzip::Encoder::new(Vec::new()).unwrap();
    encoder.write_all(data).unwrap();
    encoder.finish().into_result().unwrap()
}

/// A field value in a generated document
pub enum Val<'a> {
    Plain(&'a str),
    Protected(&'a [u8]),
}

/// Write a `String` element, protecting the value with `stream` if requested
pub fn string_field(stream: &mut ProtectedStream, key: &str, value: Val<'_>) -> String {
    match value {
        Val::Plain(text) => format!("<String><Key>{}</Key><Value>{}</Value></String>", key, text),
        Val::Protected(secret) => {
            let mut data = secret.to_vec();
            stream.apply_keystream(&mut data).unwrap();
            format!(
                "<String><Key>{}</Key><Value Protected=\"True\">{}</Value></String>",
                key,
                STANDARD.encode(data)
            )
        }
    }
}

pub fn document(groups: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\" standalone=\"yes\"?>\
         <KeePassFile><Meta><Generator>kdbx3-rs tests</Generator></Meta>\
         <Root>{}</Root></KeePassFile>",
        groups
    )
}
