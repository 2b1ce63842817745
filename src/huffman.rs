//! Canonical Huffman trees (RFC 1951 section 3.2.2)
//!
//! Trees are stored as a flat arena of nodes addressed by index. Decoding
//! walks one bit per step from the root, which matches the bit order DEFLATE
//! uses for Huffman codes (most significant code bit first in the stream).

use std::sync::OnceLock;

use crate::bit_reader::BitReader;
use crate::error::{InflateError, InflateResult};

/// Longest code length DEFLATE allows
pub const MAX_CODE_LENGTH: usize = 15;

/// Symbols in the fixed literal/length alphabet (286 and 287 never occur)
pub const FIXED_LITLEN_SYMBOLS: usize = 288;

/// Symbols in the fixed distance alphabet (30 and 31 never occur)
pub const FIXED_DIST_SYMBOLS: usize = 32;

const ROOT: usize = 0;

#[derive(Debug, Clone, Copy, Default)]
struct Node {
    children: [Option<u16>; 2],
    symbol: Option<u16>,
}

impl Node {
    fn is_leaf(&self) -> bool {
        self.symbol.is_some()
    }
}

/// A prefix code built from per-symbol code lengths
#[derive(Debug, Clone)]
pub struct HuffmanTree {
    nodes: Vec<Node>,
    num_symbols: usize,
}

impl HuffmanTree {
    /// Build the canonical tree for `lengths`, where `lengths[s]` is the code
    /// length of symbol `s` and 0 marks an unused symbol.
    pub fn build(lengths: &[u8]) -> InflateResult<Self> {
        let num_symbols = lengths.len();
        if num_symbols > u16::MAX as usize / 2 {
            return Err(InflateError::TreeInvalid);
        }

        // Count codes of each length
        let mut bl_count = [0u16; MAX_CODE_LENGTH + 1];
        for &len in lengths {
            if len as usize > MAX_CODE_LENGTH {
                return Err(InflateError::TreeInvalid);
            }
            bl_count[len as usize] += 1;
        }
        bl_count[0] = 0;

        // First code of each length
        let mut next_code = [0u32; MAX_CODE_LENGTH + 1];
        for bits in 1..=MAX_CODE_LENGTH {
            next_code[bits] = (next_code[bits - 1] + bl_count[bits - 1] as u32) << 1;
        }

        // A full binary tree with n leaves has 2n - 1 nodes. One-symbol
        // alphabets still get a one-bit code, so they need room for two.
        let max_nodes = 2 * num_symbols.max(2) - 1;
        let mut nodes = Vec::with_capacity(max_nodes);
        nodes.push(Node::default());

        for (symbol, &len) in lengths.iter().enumerate() {
            if len == 0 {
                continue;
            }

            let code = next_code[len as usize];
            next_code[len as usize] += 1;
            if code >> len != 0 {
                // More codes of this length than the length can address
                return Err(InflateError::TreeInvalid);
            }

            let mut index = ROOT;
            for shift in (0..len).rev() {
                if nodes[index].is_leaf() {
                    return Err(InflateError::TreeInvalid);
                }
                let bit = ((code >> shift) & 1) as usize;
                index = match nodes[index].children[bit] {
                    Some(child) => child as usize,
                    None => {
                        if nodes.len() >= max_nodes {
                            return Err(InflateError::TreeInvalid);
                        }
                        let child = nodes.len();
                        nodes.push(Node::default());
                        nodes[index].children[bit] = Some(child as u16);
                        child
                    }
                };
            }

            let leaf = &mut nodes[index];
            if leaf.is_leaf() || leaf.children.iter().any(Option::is_some) {
                return Err(InflateError::TreeInvalid);
            }
            leaf.symbol = Some(symbol as u16);
        }

        Ok(Self { nodes, num_symbols })
    }

    /// Decode one symbol, consuming one bit per tree level.
    pub fn decode_symbol(&self, reader: &mut BitReader<'_>) -> InflateResult<u16> {
        let mut node = &self.nodes[ROOT];
        loop {
            let bit = reader.read_bit()?;
            let child = node.children[bit as usize].ok_or(InflateError::CodeInvalid)?;
            node = &self.nodes[child as usize];

            if let Some(symbol) = node.symbol {
                if symbol as usize >= self.num_symbols {
                    return Err(InflateError::CodeInvalid);
                }
                return Ok(symbol);
            }
        }
    }

    /// Fixed literal/length tree (BTYPE=01), built once per process
    pub fn fixed_literal() -> &'static HuffmanTree {
        static FIXED_LIT_LEN: OnceLock<HuffmanTree> = OnceLock::new();
        FIXED_LIT_LEN.get_or_init(|| {
            HuffmanTree::build(&fixed_litlen_lengths())
                .expect("fixed literal/length code is complete")
        })
    }

    /// Fixed distance tree (BTYPE=01), built once per process
    pub fn fixed_distance() -> &'static HuffmanTree {
        static FIXED_DIST: OnceLock<HuffmanTree> = OnceLock::new();
        FIXED_DIST.get_or_init(|| {
            HuffmanTree::build(&[5u8; FIXED_DIST_SYMBOLS])
                .expect("fixed distance code is complete")
        })
    }
}

/// Code lengths of the fixed literal/length alphabet (RFC 1951 section 3.2.6)
pub fn fixed_litlen_lengths() -> [u8; FIXED_LITLEN_SYMBOLS] {
    let mut lengths = [0u8; FIXED_LITLEN_SYMBOLS];
    lengths[..144].fill(8);
    lengths[144..256].fill(9);
    lengths[256..280].fill(7);
    lengths[280..].fill(8);
    lengths
}
