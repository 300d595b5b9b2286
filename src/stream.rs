mod block_cipher;
mod kdbx3;
mod pipeline;
pub(crate) mod random;

pub(crate) use block_cipher::BlockCipherReader;
pub(crate) use kdbx3::read_hashed_blocks;
pub(crate) use pipeline::kdbx3_read_stream;
