//! gzip container parsing (RFC 1952)
//!
//! A member is a header, a raw DEFLATE payload and an 8-byte trailer holding
//! the CRC-32 and the length (mod 2^32) of the uncompressed data. Parsing
//! borrows from the caller's buffer; nothing is copied until decoding.

use std::borrow::Cow;
use std::fmt;

use crate::crc32::crc32;
use crate::error::{InflateError, InflateResult};
use crate::inflate::{inflate_exact, Inflated};

/// gzip magic bytes, 0x1f 0x8b, read as a little-endian u16
pub const GZIP_ID: u16 = 0x8b1f;

/// Compression method 8 (deflate), the only one RFC 1952 defines
pub const METHOD_DEFLATE: u8 = 8;

/// Length of the fixed part of the header
const FIXED_HEADER_LEN: usize = 10;

const TRAILER_LEN: usize = 8;

/// A DEFLATE stream never produces more than 1032 bytes per input byte
/// (a 258-byte match coded in two bits).
const MAX_EXPANSION: usize = 1032;

/// FLG byte of a gzip header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GzipFlags(pub u8);

impl GzipFlags {
    pub const TEXT: u8 = 1 << 0;
    pub const HCRC: u8 = 1 << 1;
    pub const EXTRA: u8 = 1 << 2;
    pub const NAME: u8 = 1 << 3;
    pub const COMMENT: u8 = 1 << 4;

    #[inline]
    pub fn contains(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    pub fn is_text(self) -> bool {
        self.contains(Self::TEXT)
    }
}

/// Operating system byte of a gzip header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingSystem {
    Fat,
    Amiga,
    Vms,
    Unix,
    VmCms,
    AtariTos,
    Hpfs,
    Macintosh,
    ZSystem,
    CpM,
    Tops20,
    Ntfs,
    Qdos,
    AcornRiscos,
    Unknown(u8),
}

impl From<u8> for OperatingSystem {
    fn from(byte: u8) -> Self {
        match byte {
            0 => OperatingSystem::Fat,
            1 => OperatingSystem::Amiga,
            2 => OperatingSystem::Vms,
            3 => OperatingSystem::Unix,
            4 => OperatingSystem::VmCms,
            5 => OperatingSystem::AtariTos,
            6 => OperatingSystem::Hpfs,
            7 => OperatingSystem::Macintosh,
            8 => OperatingSystem::ZSystem,
            9 => OperatingSystem::CpM,
            10 => OperatingSystem::Tops20,
            11 => OperatingSystem::Ntfs,
            12 => OperatingSystem::Qdos,
            13 => OperatingSystem::AcornRiscos,
            other => OperatingSystem::Unknown(other),
        }
    }
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatingSystem::Fat => write!(f, "FAT"),
            OperatingSystem::Amiga => write!(f, "Amiga"),
            OperatingSystem::Vms => write!(f, "VMS"),
            OperatingSystem::Unix => write!(f, "Unix"),
            OperatingSystem::VmCms => write!(f, "VM/CMS"),
            OperatingSystem::AtariTos => write!(f, "Atari TOS"),
            OperatingSystem::Hpfs => write!(f, "HPFS"),
            OperatingSystem::Macintosh => write!(f, "Macintosh"),
            OperatingSystem::ZSystem => write!(f, "Z-System"),
            OperatingSystem::CpM => write!(f, "CP/M"),
            OperatingSystem::Tops20 => write!(f, "TOPS-20"),
            OperatingSystem::Ntfs => write!(f, "NTFS"),
            OperatingSystem::Qdos => write!(f, "QDOS"),
            OperatingSystem::AcornRiscos => write!(f, "Acorn RISCOS"),
            OperatingSystem::Unknown(byte) => write!(f, "unknown ({})", byte),
        }
    }
}

/// Parsed gzip header. String fields borrow the input, without their NUL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GzipHeader<'a> {
    pub id: u16,
    pub method: u8,
    pub flags: GzipFlags,
    pub mtime: u32,
    pub extra_flags: u8,
    pub os: u8,
    pub extra: Option<&'a [u8]>,
    pub name: Option<&'a [u8]>,
    pub comment: Option<&'a [u8]>,
    /// CRC16 stored in the header, present only with FHCRC
    pub header_crc: Option<u16>,
    /// Header length in bytes, including the optional fields
    pub len: usize,
}

impl<'a> GzipHeader<'a> {
    pub fn name_lossy(&self) -> Option<Cow<'a, str>> {
        self.name.map(String::from_utf8_lossy)
    }

    pub fn comment_lossy(&self) -> Option<Cow<'a, str>> {
        self.comment.map(String::from_utf8_lossy)
    }

    pub fn operating_system(&self) -> OperatingSystem {
        OperatingSystem::from(self.os)
    }
}

/// The 8 bytes after the DEFLATE payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GzipTrailer {
    /// CRC-32 of the uncompressed data
    pub crc32: u32,
    /// Uncompressed length modulo 2^32
    pub isize: u32,
}

/// One gzip member split into header, payload and trailer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GzipMember<'a> {
    pub header: GzipHeader<'a>,
    pub payload: &'a [u8],
    pub trailer: GzipTrailer,
}

/// Forward cursor over the header bytes
struct HeaderReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> HeaderReader<'a> {
    fn take(&mut self, count: usize) -> InflateResult<&'a [u8]> {
        let end = self.pos.checked_add(count).ok_or(InflateError::EndOfFile)?;
        let bytes = self.data.get(self.pos..end).ok_or(InflateError::EndOfFile)?;
        self.pos = end;
        Ok(bytes)
    }

    fn u8(&mut self) -> InflateResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16_le(&mut self) -> InflateResult<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u32_le(&mut self) -> InflateResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// NUL-terminated field; the terminator is consumed but not returned
    fn zero_terminated(&mut self) -> InflateResult<&'a [u8]> {
        let rest = &self.data[self.pos..];
        let len = memchr::memchr(0, rest).ok_or(InflateError::EndOfFile)?;
        let field = &rest[..len];
        self.pos += len + 1;
        Ok(field)
    }

    fn consumed(&self) -> &'a [u8] {
        &self.data[..self.pos]
    }
}

impl<'a> GzipMember<'a> {
    /// Parse a complete gzip file held in memory.
    ///
    /// Only the header is validated here (magic and FHCRC); the payload is
    /// not touched until `decompress_into`.
    pub fn parse(data: &'a [u8]) -> InflateResult<Self> {
        let mut reader = HeaderReader { data, pos: 0 };

        let id = reader.u16_le()?;
        if id != GZIP_ID {
            return Err(InflateError::IdMismatch);
        }
        let method = reader.u8()?;
        let flags = GzipFlags(reader.u8()?);
        let mtime = reader.u32_le()?;
        let extra_flags = reader.u8()?;
        let os = reader.u8()?;
        debug_assert_eq!(reader.pos, FIXED_HEADER_LEN);

        let extra = if flags.contains(GzipFlags::EXTRA) {
            let xlen = reader.u16_le()? as usize;
            Some(reader.take(xlen)?)
        } else {
            None
        };

        let name = if flags.contains(GzipFlags::NAME) {
            Some(reader.zero_terminated()?)
        } else {
            None
        };

        let comment = if flags.contains(GzipFlags::COMMENT) {
            Some(reader.zero_terminated()?)
        } else {
            None
        };

        let header_crc = if flags.contains(GzipFlags::HCRC) {
            let computed = (crc32(reader.consumed()) & 0xffff) as u16;
            let stored = reader.u16_le()?;
            if stored != computed {
                return Err(InflateError::CrcMismatch);
            }
            Some(stored)
        } else {
            None
        };

        let header_len = reader.pos;
        let body = &data[header_len..];
        if body.len() < TRAILER_LEN {
            return Err(InflateError::EndOfFile);
        }
        let (payload, trailer_bytes) = body.split_at(body.len() - TRAILER_LEN);
        let mut trailer_reader = HeaderReader {
            data: trailer_bytes,
            pos: 0,
        };
        let trailer = GzipTrailer {
            crc32: trailer_reader.u32_le()?,
            isize: trailer_reader.u32_le()?,
        };

        tracing::debug!(
            method,
            flags = flags.0,
            mtime,
            header_len,
            payload_len = payload.len(),
            isize = trailer.isize,
            crc32 = trailer.crc32,
            "gzip header"
        );

        Ok(Self {
            header: GzipHeader {
                id,
                method,
                flags,
                mtime,
                extra_flags,
                os,
                extra,
                name,
                comment,
                header_crc,
                len: header_len,
            },
            payload,
            trailer,
        })
    }

    /// Uncompressed size declared by the trailer
    pub fn declared_len(&self) -> usize {
        self.trailer.isize as usize
    }

    /// Decode the payload into `out`, which must hold at least
    /// `declared_len()` bytes; only that prefix is written.
    ///
    /// Fails unless the stream produces exactly the declared length with the
    /// declared CRC-32.
    pub fn decompress_into(&self, out: &mut [u8]) -> InflateResult<Inflated> {
        let out = out
            .get_mut(..self.declared_len())
            .ok_or(InflateError::Overflow)?;
        inflate_exact(self.payload, out, self.trailer.crc32)
    }

    /// Allocate the output buffer and decode into it.
    ///
    /// A declared length the payload cannot possibly expand to is reported
    /// as `EndOfFile` before anything is allocated.
    pub fn decompress(&self) -> InflateResult<Vec<u8>> {
        let declared = self.declared_len();
        if declared > self.payload.len().saturating_mul(MAX_EXPANSION) {
            return Err(InflateError::EndOfFile);
        }

        let mut out = vec![0u8; declared];
        self.decompress_into(&mut out)?;
        Ok(out)
    }
}

/// Decompress a whole gzip file held in memory
pub fn gunzip(data: &[u8]) -> InflateResult<Vec<u8>> {
    GzipMember::parse(data)?.decompress()
}
