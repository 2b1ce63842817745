//! CRC-32 as used by gzip (reflected, polynomial 0xEDB88320)

const POLYNOMIAL: u32 = 0xEDB8_8320;

/// Byte-at-a-time lookup table, computed at compile time
static TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut c = i as u32;
        let mut bit = 0;
        while bit < 8 {
            c = if c & 1 != 0 { (c >> 1) ^ POLYNOMIAL } else { c >> 1 };
            bit += 1;
        }
        table[i] = c;
        i += 1;
    }
    table
}

/// Running CRC-32.
///
/// Holds the complemented register; `finish` undoes the complement, so an
/// accumulator over no bytes reports 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc32 {
    state: u32,
}

impl Crc32 {
    pub fn new() -> Self {
        Self { state: !0 }
    }

    #[inline]
    pub fn update_byte(&mut self, byte: u8) {
        let index = (self.state ^ byte as u32) & 0xff;
        self.state = (self.state >> 8) ^ TABLE[index as usize];
    }

    pub fn update(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.update_byte(byte);
        }
    }

    #[inline]
    pub fn finish(&self) -> u32 {
        !self.state
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

/// CRC-32 of a whole buffer
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(bytes);
    crc.finish()
}
