//! LSB-first bit reader over an in-memory DEFLATE stream
//!
//! DEFLATE packs data elements starting at the least significant bit of each
//! byte, bytes in increasing order. Huffman codes are handled by walking
//! single bits (see `huffman`); everything else goes through `read_bits`.

use crate::error::{InflateError, InflateResult};

/// Bit-level cursor over a borrowed byte slice
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    byte_pos: usize,
    bit_pos: u8, // 0-7, bit position within current byte
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    /// Current bit position in stream
    #[inline]
    pub fn bit_position(&self) -> usize {
        self.byte_pos * 8 + self.bit_pos as usize
    }

    /// Index of the byte holding the next unread bit
    #[inline]
    pub fn byte_position(&self) -> usize {
        self.byte_pos
    }

    #[inline]
    pub fn remaining_bits(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.bit_position())
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.byte_pos >= self.data.len()
    }

    /// Read a single bit (LSB first, RFC 1951 §3.1.1)
    #[inline]
    pub fn read_bit(&mut self) -> InflateResult<u8> {
        let byte = *self.data.get(self.byte_pos).ok_or(InflateError::EndOfFile)?;
        let bit = (byte >> self.bit_pos) & 1;

        self.bit_pos += 1;
        if self.bit_pos == 8 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }

        Ok(bit)
    }

    /// Read `count` bits (at most 24), first bit read lands in bit 0.
    ///
    /// Either all bits are consumed or none are.
    #[inline]
    pub fn read_bits(&mut self, count: u8) -> InflateResult<u32> {
        debug_assert!(count <= 24);

        if (count as usize) > self.remaining_bits() {
            return Err(InflateError::EndOfFile);
        }

        let mut value = 0u32;
        let mut filled = 0u8;
        while filled < count {
            let available = 8 - self.bit_pos;
            let take = available.min(count - filled);
            let mask = (1u32 << take) - 1;
            let chunk = (self.data[self.byte_pos] >> self.bit_pos) as u32 & mask;
            value |= chunk << filled;

            filled += take;
            self.bit_pos += take;
            if self.bit_pos == 8 {
                self.bit_pos = 0;
                self.byte_pos += 1;
            }
        }

        Ok(value)
    }

    /// Discard the partial byte, then borrow the next `count` whole bytes.
    ///
    /// The cursor does not move when fewer than `count` bytes remain.
    pub fn align_and_read_bytes(&mut self, count: usize) -> InflateResult<&'a [u8]> {
        let start = if self.bit_pos != 0 {
            self.byte_pos + 1
        } else {
            self.byte_pos
        };
        let end = start.checked_add(count).ok_or(InflateError::EndOfFile)?;
        if end > self.data.len() {
            return Err(InflateError::EndOfFile);
        }

        self.byte_pos = end;
        self.bit_pos = 0;
        Ok(&self.data[start..end])
    }

    /// Read a 16-bit little-endian value at the next byte boundary
    #[inline]
    pub fn read_u16_le(&mut self) -> InflateResult<u16> {
        let bytes = self.align_and_read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_reader() {
        let data = [0b10110100, 0b11001010];
        let mut reader = BitReader::new(&data);

        assert_eq!(reader.read_bit().unwrap(), 0);
        assert_eq!(reader.read_bit().unwrap(), 0);
        assert_eq!(reader.read_bit().unwrap(), 1);
        assert_eq!(reader.bit_position(), 3);
    }

    #[test]
    fn test_empty_input_is_exhausted() {
        let mut reader = BitReader::new(&[]);
        assert!(reader.is_eof());
        assert_eq!(reader.read_bit(), Err(InflateError::EndOfFile));
        assert_eq!(reader.read_bits(1), Err(InflateError::EndOfFile));
        assert_eq!(reader.read_bits(0), Ok(0));
        assert_eq!(reader.align_and_read_bytes(0), Ok(&[][..]));
    }

    #[test]
    fn test_read_bits_lsb_first_across_bytes() {
        let data = [0b1010_1100, 0b0000_0111];
        let mut reader = BitReader::new(&data);

        assert_eq!(reader.read_bits(2).unwrap(), 0b00);
        assert_eq!(reader.read_bits(3).unwrap(), 0b011);
        // Straddles the byte boundary: 3 bits of byte 0, then 4 of byte 1
        assert_eq!(reader.read_bits(7).unwrap(), 0b0111_101);
        assert_eq!(reader.remaining_bits(), 4);
    }

    #[test]
    fn test_failed_read_does_not_advance() {
        let data = [0xff];
        let mut reader = BitReader::new(&data);

        reader.read_bits(5).unwrap();
        assert_eq!(reader.read_bits(4), Err(InflateError::EndOfFile));
        assert_eq!(reader.bit_position(), 5);
        assert_eq!(reader.read_bits(3).unwrap(), 0b111);
    }

    #[test]
    fn test_align_and_read_bytes() {
        let data = [0x01, 0xAA, 0xBB, 0xCC];
        let mut reader = BitReader::new(&data);

        reader.read_bit().unwrap();
        assert_eq!(reader.align_and_read_bytes(2).unwrap(), &[0xAA, 0xBB]);
        assert_eq!(reader.byte_position(), 3);

        assert_eq!(reader.align_and_read_bytes(2), Err(InflateError::EndOfFile));
        assert_eq!(reader.byte_position(), 3);
        assert_eq!(reader.align_and_read_bytes(1).unwrap(), &[0xCC]);
        assert!(reader.is_eof());
    }

    #[test]
    fn test_read_u16_le() {
        let data = [0xff, 0x34, 0x12];
        let mut reader = BitReader::new(&data);

        reader.read_bits(3).unwrap();
        assert_eq!(reader.read_u16_le().unwrap(), 0x1234);
    }
}
