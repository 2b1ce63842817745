//! Fixtures shared by the unit tests: a bit writer for hand-built DEFLATE
//! streams, reference-encoder wrappers and a gzip header builder.

use std::io::Write;

use flate2::write::{DeflateEncoder, GzEncoder};
use flate2::Compression;

use crate::crc32::crc32;

#[macro_export]
macro_rules! assert_slices_eq {
    ($left:expr, $right:expr) => {
        $crate::assert_slices_eq!($left, $right, "byte slices differ")
    };
    ($left:expr, $right:expr, $msg:expr) => {
        let left = &$left[..];
        let right = &$right[..];
        if left != right {
            if left.len() != right.len() {
                panic!(
                    "assertion failed: `(left == right)`: {}\n  left len: {},\n right len: {}",
                    $msg,
                    left.len(),
                    right.len()
                );
            }
            let i = left
                .iter()
                .zip(right.iter())
                .position(|(a, b)| a != b)
                .unwrap_or(0);
            let start = i.saturating_sub(16);
            let end = (i + 16).min(left.len());
            panic!(
                "assertion failed: `(left == right)`: {}\n first difference at index {}\n left:  {:02X?}\n right: {:02X?}",
                $msg,
                i,
                &left[start..end],
                &right[start..end]
            );
        }
    };
}

/// LSB-first bit writer, the mirror image of `BitReader`
#[derive(Debug, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_count: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `count` bits of `value`, least significant first
    pub fn write_bits(&mut self, value: u32, count: u8) {
        for i in 0..count {
            self.push_bit((value >> i) & 1 == 1);
        }
    }

    /// Append a Huffman code, most significant bit first
    pub fn write_code(&mut self, code: u32, len: u8) {
        for i in (0..len).rev() {
            self.push_bit((code >> i) & 1 == 1);
        }
    }

    pub fn align(&mut self) {
        self.bit_count = self.bytes.len() * 8;
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.align();
        self.bytes.extend_from_slice(bytes);
        self.bit_count = self.bytes.len() * 8;
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }

    fn push_bit(&mut self, bit: bool) {
        if self.bit_count % 8 == 0 {
            self.bytes.push(0);
        }
        if bit {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 1 << (self.bit_count % 8);
        }
        self.bit_count += 1;
    }
}

/// Raw DEFLATE stream from the reference encoder
pub fn deflate_bytes(data: &[u8], level: Compression) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), level);
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Complete gzip file from the reference encoder
pub fn gzip_bytes(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Hand-assembled gzip member, for header fields the reference encoder
/// cannot produce (such as FHCRC)
#[derive(Debug, Default)]
pub struct GzipFixture {
    pub mtime: u32,
    pub os: u8,
    pub text: bool,
    pub extra: Option<Vec<u8>>,
    pub name: Option<Vec<u8>>,
    pub comment: Option<Vec<u8>>,
    pub header_crc: bool,
}

impl GzipFixture {
    pub fn header(&self) -> Vec<u8> {
        let mut flags = 0u8;
        if self.text {
            flags |= 0x01;
        }
        if self.header_crc {
            flags |= 0x02;
        }
        if self.extra.is_some() {
            flags |= 0x04;
        }
        if self.name.is_some() {
            flags |= 0x08;
        }
        if self.comment.is_some() {
            flags |= 0x10;
        }

        let mut header = vec![0x1f, 0x8b, 0x08, flags];
        header.extend_from_slice(&self.mtime.to_le_bytes());
        header.push(0x00);
        header.push(self.os);
        if let Some(extra) = &self.extra {
            header.extend_from_slice(&(extra.len() as u16).to_le_bytes());
            header.extend_from_slice(extra);
        }
        if let Some(name) = &self.name {
            header.extend_from_slice(name);
            header.push(0);
        }
        if let Some(comment) = &self.comment {
            header.extend_from_slice(comment);
            header.push(0);
        }
        if self.header_crc {
            let crc16 = (crc32(&header) & 0xffff) as u16;
            header.extend_from_slice(&crc16.to_le_bytes());
        }
        header
    }

    /// Header, reference-encoded payload and trailer
    pub fn build(&self, data: &[u8]) -> Vec<u8> {
        let mut file = self.header();
        file.extend_from_slice(&deflate_bytes(data, Compression::default()));
        file.extend_from_slice(&crc32(data).to_le_bytes());
        file.extend_from_slice(&(data.len() as u32).to_le_bytes());
        file
    }
}

#[test]
fn test_bit_writer_matches_reader() {
    let mut writer = BitWriter::new();
    writer.write_bits(0b101, 3);
    writer.write_code(0b1100, 4);
    writer.write_bytes(&[0xAB]);
    let bytes = writer.finish();

    let mut reader = crate::bit_reader::BitReader::new(&bytes);
    assert_eq!(reader.read_bits(3).unwrap(), 0b101);
    assert_eq!(reader.read_bits(4).unwrap(), 0b0011);
    assert_eq!(reader.align_and_read_bytes(1).unwrap(), &[0xAB]);
}
