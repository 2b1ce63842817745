//! DEFLATE decoder (RFC 1951) into a fixed-capacity output buffer
//!
//! # Architecture
//!
//! - `DecodeStream`: bit reader, write offset and running CRC for one pass
//! - Block decoders: stored, fixed Huffman, dynamic Huffman
//! - `inflate` / `inflate_exact`: drive blocks until the final one
//!
//! The output slice is supplied by the caller and never grows. Writing past
//! its end is `Overflow`; nothing is truncated silently.

use crate::bit_reader::BitReader;
use crate::crc32::Crc32;
use crate::error::{InflateError, InflateResult};
use crate::huffman::HuffmanTree;

/// End of block symbol
const END_OF_BLOCK: u16 = 256;

/// Most literal/length codes a dynamic block may declare
const MAX_LITLEN_CODES: usize = 286;

/// Most distance codes a dynamic block may declare
const MAX_DIST_CODES: usize = 30;

/// Symbols in the code length alphabet
const NUM_CODELEN_CODES: usize = 19;

/// Extra bits for length codes 257..=285
static LENGTH_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/// Base lengths for length codes 257..=285
static LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258,
];

/// Extra bits for distance codes 0..=29
static DISTANCE_EXTRA_BITS: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Base distances for distance codes 0..=29
static DISTANCE_BASE: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

/// Code length alphabet order for dynamic Huffman
static CODELEN_ORDER: [usize; NUM_CODELEN_CODES] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// BTYPE field of a block header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Stored,
    FixedHuffman,
    DynamicHuffman,
    Reserved,
}

impl BlockType {
    fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0 => BlockType::Stored,
            1 => BlockType::FixedHuffman,
            2 => BlockType::DynamicHuffman,
            _ => BlockType::Reserved,
        }
    }
}

/// Result of a successful decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inflated {
    /// Bytes written to the output buffer
    pub len: usize,
    /// CRC-32 of those bytes
    pub crc: u32,
    /// Input bytes consumed, including the partial last byte
    pub consumed: usize,
}

/// Decoding state threaded through the block decoders
struct DecodeStream<'a, 'o> {
    reader: BitReader<'a>,
    out: &'o mut [u8],
    pos: usize,
    crc: Crc32,
}

impl<'a, 'o> DecodeStream<'a, 'o> {
    fn new(input: &'a [u8], out: &'o mut [u8]) -> Self {
        Self {
            reader: BitReader::new(input),
            out,
            pos: 0,
            crc: Crc32::new(),
        }
    }

    /// Decode blocks until the one flagged final has been processed
    fn run(&mut self) -> InflateResult<()> {
        loop {
            let is_final = self.reader.read_bit()? == 1;
            let block_type = BlockType::from_bits(self.reader.read_bits(2)?);

            tracing::debug!(
                ?block_type,
                is_final,
                bit_offset = self.reader.bit_position() - 3,
                written = self.pos,
                "deflate block"
            );

            match block_type {
                BlockType::Stored => self.decode_stored_block()?,
                BlockType::FixedHuffman => self.decode_fixed_block()?,
                BlockType::DynamicHuffman => self.decode_dynamic_block()?,
                BlockType::Reserved => return Err(InflateError::TypeInvalid),
            }

            if is_final {
                return Ok(());
            }
        }
    }

    fn finish(self) -> Inflated {
        Inflated {
            len: self.pos,
            crc: self.crc.finish(),
            consumed: self.reader.bit_position().div_ceil(8),
        }
    }

    #[inline]
    fn write_byte(&mut self, byte: u8) -> InflateResult<()> {
        let slot = self.out.get_mut(self.pos).ok_or(InflateError::Overflow)?;
        *slot = byte;
        self.pos += 1;
        self.crc.update_byte(byte);
        Ok(())
    }

    fn write_slice(&mut self, bytes: &[u8]) -> InflateResult<()> {
        let end = self.pos + bytes.len();
        if end > self.out.len() {
            return Err(InflateError::Overflow);
        }
        self.out[self.pos..end].copy_from_slice(bytes);
        self.crc.update(bytes);
        self.pos = end;
        Ok(())
    }

    /// Copy a back-reference byte by byte; source and destination may
    /// overlap when `distance < length`.
    #[inline]
    fn copy_match(&mut self, distance: usize, length: usize) -> InflateResult<()> {
        if distance > self.pos {
            return Err(InflateError::DistInvalid);
        }
        if length > self.out.len() - self.pos {
            return Err(InflateError::Overflow);
        }

        let mut src = self.pos - distance;
        for _ in 0..length {
            let byte = self.out[src];
            self.out[self.pos] = byte;
            self.crc.update_byte(byte);
            self.pos += 1;
            src += 1;
        }
        Ok(())
    }

    /// Decode a stored block (BTYPE=00)
    fn decode_stored_block(&mut self) -> InflateResult<()> {
        let len = self.reader.read_u16_le()?;
        let nlen = self.reader.read_u16_le()?;

        if len != !nlen {
            return Err(InflateError::LenMismatch);
        }

        let bytes = self.reader.align_and_read_bytes(len as usize)?;
        self.write_slice(bytes)
    }

    /// Decode a block with fixed Huffman codes (BTYPE=01)
    fn decode_fixed_block(&mut self) -> InflateResult<()> {
        self.decode_huffman_block(HuffmanTree::fixed_literal(), HuffmanTree::fixed_distance())
    }

    /// Decode a block with dynamic Huffman codes (BTYPE=10)
    fn decode_dynamic_block(&mut self) -> InflateResult<()> {
        let hlit = self.reader.read_bits(5)? as usize + 257;
        let hdist = self.reader.read_bits(5)? as usize + 1;
        let hclen = self.reader.read_bits(4)? as usize + 4;

        tracing::trace!(hlit, hdist, hclen, "dynamic block header");

        if hlit > MAX_LITLEN_CODES || hdist > MAX_DIST_CODES {
            return Err(InflateError::TreeInvalid);
        }

        // Read code length code lengths
        let mut codelen_lengths = [0u8; NUM_CODELEN_CODES];
        for &symbol in &CODELEN_ORDER[..hclen] {
            codelen_lengths[symbol] = self.reader.read_bits(3)? as u8;
        }
        let codelen_tree = HuffmanTree::build(&codelen_lengths)?;

        // Literal/length and distance lengths form one run-length coded sequence
        let mut lengths = [0u8; MAX_LITLEN_CODES + MAX_DIST_CODES];
        let total = hlit + hdist;
        let mut i = 0;

        while i < total {
            let symbol = codelen_tree.decode_symbol(&mut self.reader)?;

            let (value, repeat) = match symbol {
                0..=15 => (symbol as u8, 1),
                16 => {
                    if i == 0 {
                        return Err(InflateError::TreeInvalid);
                    }
                    (lengths[i - 1], self.reader.read_bits(2)? as usize + 3)
                }
                17 => (0, self.reader.read_bits(3)? as usize + 3),
                18 => (0, self.reader.read_bits(7)? as usize + 11),
                _ => return Err(InflateError::TreeInvalid),
            };

            if i + repeat > total {
                return Err(InflateError::TreeInvalid);
            }
            lengths[i..i + repeat].fill(value);
            i += repeat;
        }

        let litlen_tree = HuffmanTree::build(&lengths[..hlit])?;
        let dist_tree = HuffmanTree::build(&lengths[hlit..total])?;

        self.decode_huffman_block(&litlen_tree, &dist_tree)
    }

    /// Expand literals and length/distance pairs until end of block
    fn decode_huffman_block(
        &mut self,
        litlen_tree: &HuffmanTree,
        dist_tree: &HuffmanTree,
    ) -> InflateResult<()> {
        loop {
            let symbol = litlen_tree.decode_symbol(&mut self.reader)?;

            if symbol < END_OF_BLOCK {
                self.write_byte(symbol as u8)?;
                continue;
            }
            if symbol == END_OF_BLOCK {
                return Ok(());
            }

            let length_code = (symbol - 257) as usize;
            if length_code >= LENGTH_BASE.len() {
                return Err(InflateError::CodeInvalid);
            }
            let length = LENGTH_BASE[length_code] as usize
                + self.reader.read_bits(LENGTH_EXTRA_BITS[length_code])? as usize;

            let dist_code = dist_tree.decode_symbol(&mut self.reader)? as usize;
            if dist_code >= DISTANCE_BASE.len() {
                return Err(InflateError::CodeInvalid);
            }
            let distance = DISTANCE_BASE[dist_code] as usize
                + self.reader.read_bits(DISTANCE_EXTRA_BITS[dist_code])? as usize;

            self.copy_match(distance, length)?;
        }
    }
}

/// Decode a raw DEFLATE stream into `out`.
///
/// Succeeds as soon as the final block is decoded; `out` may have room to
/// spare. Input after the final block is ignored.
pub fn inflate(input: &[u8], out: &mut [u8]) -> InflateResult<Inflated> {
    let mut stream = DecodeStream::new(input, out);
    stream.run()?;
    Ok(stream.finish())
}

/// Decode a raw DEFLATE stream that must fill `out` exactly and match
/// `expected_crc`.
///
/// A stream that ends short of `out.len()` bytes is `EndOfFile`; a checksum
/// disagreement is `CrcMismatch`.
pub fn inflate_exact(input: &[u8], out: &mut [u8], expected_crc: u32) -> InflateResult<Inflated> {
    let capacity = out.len();
    let inflated = inflate(input, out)?;

    if inflated.len != capacity {
        return Err(InflateError::EndOfFile);
    }
    if inflated.crc != expected_crc {
        return Err(InflateError::CrcMismatch);
    }

    Ok(inflated)
}
