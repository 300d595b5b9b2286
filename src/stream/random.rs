//! Salsa20 keystream for protected values
//!
//! Protected values in the XML are XORed with one continuous Salsa20
//! keystream, in the order they appear in the document. The stream is
//! keyed with `sha256(protected_stream_key)` and always uses the same
//! fixed nonce, so the keystream only depends on the header key.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::binary::errors::CryptoError;
use crate::crypto;

/// Fixed Salsa20 nonce used by KeePass for protected values
pub const SALSA20_IV: [u8; 8] = [0xe8, 0x30, 0x09, 0x4b, 0x97, 0x20, 0x5d, 0x2a];

const BLOCK_LEN: usize = 64;
const DOUBLE_ROUNDS: usize = 10;
// "expand 32-byte k"
const SIGMA: [u32; 4] = [0x6170_7865, 0x3320_646e, 0x7962_2d32, 0x6b20_6574];
const COUNTER_LOW: usize = 8;
const COUNTER_HIGH: usize = 9;

/// Stateful keystream shared by every protected value of one document
///
/// Not `Clone`: a copy would replay keystream already consumed and
/// silently desynchronise from the document.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ProtectedStream {
    state: [u32; 16],
    block: [u8; BLOCK_LEN],
    /// Offset of the first unused byte in `block`
    pos: usize,
    exhausted: bool,
}

impl ProtectedStream {
    /// Create the keystream for the given header key
    pub fn new(key: &[u8]) -> ProtectedStream {
        let key = zeroize::Zeroizing::new(crypto::sha256(key));
        let word = |bytes: &[u8]| u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);

        let mut state = [0u32; 16];
        state[0] = SIGMA[0];
        for i in 0..4 {
            state[1 + i] = word(&key[i * 4..]);
            state[11 + i] = word(&key[16 + i * 4..]);
        }
        state[5] = SIGMA[1];
        state[6] = word(&SALSA20_IV[0..]);
        state[7] = word(&SALSA20_IV[4..]);
        state[COUNTER_LOW] = 0;
        state[COUNTER_HIGH] = 0;
        state[10] = SIGMA[2];
        state[15] = SIGMA[3];

        ProtectedStream {
            state,
            block: [0; BLOCK_LEN],
            pos: BLOCK_LEN,
            exhausted: false,
        }
    }

    /// Decode a base64 protected value and decrypt it with the next keystream bytes
    ///
    /// An empty value consumes no keystream.
    pub fn unpack(&mut self, payload: &str) -> Result<Vec<u8>, CryptoError> {
        if payload.is_empty() {
            return Ok(Vec::new());
        }
        let mut data = STANDARD.decode(payload)?;
        self.apply_keystream(&mut data)?;
        Ok(data)
    }

    /// XOR `data` with the next `data.len()` keystream bytes
    ///
    /// Leftover bytes from the previous call are used first, so the
    /// output does not depend on how a byte range is split across calls.
    pub fn apply_keystream(&mut self, data: &mut [u8]) -> Result<(), CryptoError> {
        let mut offset = 0;
        while offset < data.len() {
            if self.pos == BLOCK_LEN {
                self.next_block()?;
            }
            let take = usize::min(BLOCK_LEN - self.pos, data.len() - offset);
            let keystream = &self.block[self.pos..self.pos + take];
            for (byte, key) in data[offset..offset + take].iter_mut().zip(keystream) {
                *byte ^= key;
            }
            self.pos += take;
            offset += take;
        }
        Ok(())
    }

    fn next_block(&mut self) -> Result<(), CryptoError> {
        if self.exhausted {
            return Err(CryptoError::KeystreamExhausted);
        }
        let mixed = salsa20_core(&self.state);
        for (chunk, word) in self.block.chunks_exact_mut(4).zip(mixed.iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        self.pos = 0;

        self.state[COUNTER_LOW] = self.state[COUNTER_LOW].wrapping_add(1);
        if self.state[COUNTER_LOW] == 0 {
            self.state[COUNTER_HIGH] = self.state[COUNTER_HIGH].wrapping_add(1);
            // All 2^64 counter values used; the current block is still valid.
            self.exhausted = self.state[COUNTER_HIGH] == 0;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ProtectedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtectedStream")
            .field("block_counter", &self.counter())
            .field("leftover", &(BLOCK_LEN - self.pos))
            .finish()
    }
}

impl ProtectedStream {
    fn counter(&self) -> u64 {
        u64::from(self.state[COUNTER_HIGH]) << 32 | u64::from(self.state[COUNTER_LOW])
    }
}

#[inline(always)]
fn quarter_round(x: &mut [u32; 16], a: usize, b: usize, c: usize, d: usize) {
    x[b] ^= x[a].wrapping_add(x[d]).rotate_left(7);
    x[c] ^= x[b].wrapping_add(x[a]).rotate_left(9);
    x[d] ^= x[c].wrapping_add(x[b]).rotate_left(13);
    x[a] ^= x[d].wrapping_add(x[c]).rotate_left(18);
}

/// Salsa20/20 block function: 10 double rounds, then add the input state
fn salsa20_core(input: &[u32; 16]) -> [u32; 16] {
    let mut x = *input;
    for _ in 0..DOUBLE_ROUNDS {
        // columns
        quarter_round(&mut x, 0, 4, 8, 12);
        quarter_round(&mut x, 5, 9, 13, 1);
        quarter_round(&mut x, 10, 14, 2, 6);
        quarter_round(&mut x, 15, 3, 7, 11);
        // rows
        quarter_round(&mut x, 0, 1, 2, 3);
        quarter_round(&mut x, 5, 6, 7, 4);
        quarter_round(&mut x, 10, 11, 8, 9);
        quarter_round(&mut x, 15, 12, 13, 14);
    }
    for (out, original) in x.iter_mut().zip(input.iter()) {
        *out = out.wrapping_add(*original);
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use rand::{Rng, RngCore, SeedableRng};
    use salsa20::cipher::{KeyIvInit, StreamCipher};

    const KEY: &[u8] = b"protected stream key from header";

    fn reference_keystream(len: usize) -> Vec<u8> {
        let key = crypto::sha256(KEY);
        let mut cipher = salsa20::Salsa20::new(&key.into(), &SALSA20_IV.into());
        let mut keystream = vec![0u8; len];
        cipher.apply_keystream(&mut keystream);
        keystream
    }

    fn keystream(stream: &mut ProtectedStream, len: usize) -> Vec<u8> {
        let mut data = vec![0u8; len];
        stream.apply_keystream(&mut data).unwrap();
        data
    }

    #[test]
    fn matches_reference_salsa20() {
        let mut stream = ProtectedStream::new(KEY);
        assert_eq!(keystream(&mut stream, 1000), reference_keystream(1000));
    }

    #[test]
    fn split_calls_are_equivalent() {
        let whole = reference_keystream(300);
        for split in 0..=300 {
            let mut stream = ProtectedStream::new(KEY);
            let mut parts = keystream(&mut stream, split);
            parts.extend(keystream(&mut stream, 300 - split));
            assert_eq!(parts, whole, "split at {}", split);
        }
    }

    #[test]
    fn random_call_sizes() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x5a15a);
        let mut plain = vec![0u8; 4096];
        rng.fill_bytes(&mut plain);
        let keystream = reference_keystream(plain.len());

        let mut stream = ProtectedStream::new(KEY);
        let mut offset = 0;
        while offset < plain.len() {
            let len = usize::min(rng.gen_range(1..150), plain.len() - offset);
            let encoded = STANDARD.encode(&plain[offset..offset + len]);
            let decoded = stream.unpack(&encoded).unwrap();
            for (i, byte) in decoded.iter().enumerate() {
                assert_eq!(*byte, plain[offset + i] ^ keystream[offset + i]);
            }
            offset += len;
        }
    }

    #[test]
    fn empty_value_consumes_nothing() {
        let mut stream = ProtectedStream::new(KEY);
        assert!(stream.unpack("").unwrap().is_empty());
        assert_eq!(keystream(&mut stream, 64), reference_keystream(64));
    }

    #[test]
    fn invalid_base64() {
        let mut stream = ProtectedStream::new(KEY);
        assert!(matches!(
            stream.unpack("not base64!"),
            Err(CryptoError::InvalidProtectedValue(_))
        ));
    }

    #[test]
    fn counter_carries_into_high_word() {
        let mut stream = ProtectedStream::new(KEY);
        stream.state[COUNTER_LOW] = u32::MAX;
        keystream(&mut stream, 64);
        assert_eq!(stream.counter(), 1 << 32);
    }

    #[test]
    fn exhausted_after_last_counter() {
        let mut stream = ProtectedStream::new(KEY);
        stream.state[COUNTER_LOW] = u32::MAX;
        stream.state[COUNTER_HIGH] = u32::MAX;
        // The final block is still usable
        keystream(&mut stream, 64);
        let mut data = [0u8; 1];
        assert!(matches!(
            stream.apply_keystream(&mut data),
            Err(CryptoError::KeystreamExhausted)
        ));
    }
}
