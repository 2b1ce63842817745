//! gzinflate - a from-scratch DEFLATE and gzip decoder
//!
//! Decoding works on fully materialized buffers: the input is a byte slice
//! (typically a memory-mapped `.gz` file) and the output is a caller-sized
//! slice that never grows.
//!
//! ```no_run
//! let data = std::fs::read("hello.txt.gz")?;
//! let member = gzinflate::GzipMember::parse(&data)?;
//! let mut out = vec![0u8; member.declared_len()];
//! member.decompress_into(&mut out)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#[cfg(test)]
#[macro_use]
mod test_utils;

pub mod bit_reader;
pub mod cli;
pub mod crc32;
pub mod decompression;
pub mod error;
pub mod gzip;
pub mod huffman;
pub mod inflate;
pub mod utils;


pub use crc32::{crc32, Crc32};
pub use error::{InflateError, InflateResult, ERROR_STRINGS};
pub use gzip::{gunzip, GzipFlags, GzipHeader, GzipMember, GzipTrailer};
pub use huffman::HuffmanTree;
pub use inflate::{inflate, inflate_exact, Inflated};
