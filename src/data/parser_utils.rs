//! Shared winnow-based parsing utilities used by the model, archive and texture parsers.
//!
//! Every parser in this crate walks a fully-loaded byte slice through a
//! [`ByteCursor`]. The cursor carries the endianness detected for the file, so
//! once a model has been identified as big-endian every later multi-byte read
//! follows suit without each call site having to care.

use thiserror::Error;
use winnow::Parser;
use winnow::error::{ContextError, ErrMode};

/// Common result type for winnow parsers.
pub type WResult<T> = Result<T, ErrMode<ContextError>>;

type Input<'a> = &'a [u8];
type PErr = ErrMode<ContextError>;

/// Byte order of a file's multi-byte fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

impl Endianness {
    /// Serialize a word in this byte order.
    pub fn u32_bytes(self, value: u32) -> [u8; 4] {
        match self {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        }
    }

    pub fn u32_from_bytes(self, bytes: [u8; 4]) -> u32 {
        match self {
            Endianness::Little => u32::from_le_bytes(bytes),
            Endianness::Big => u32::from_be_bytes(bytes),
        }
    }
}

impl From<Endianness> for winnow::binary::Endianness {
    fn from(value: Endianness) -> Self {
        match value {
            Endianness::Little => winnow::binary::Endianness::Little,
            Endianness::Big => winnow::binary::Endianness::Big,
        }
    }
}

/// Errors that can occur during shared parsing operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected end of data at 0x{offset:X} (need {need} bytes, have {have})")]
    UnexpectedEof {
        offset: usize,
        need: usize,
        have: usize,
    },
    #[error("seek to 0x{offset:X} is beyond the end of the data (length 0x{len:X})")]
    SeekOutOfBounds { offset: usize, len: usize },
}

/// Resolve a relative pointer: base_offset + rel_value = absolute file offset.
///
/// Returns `None` if the result would be negative.
pub fn resolve_relptr(base_offset: usize, rel_value: i64) -> Option<usize> {
    usize::try_from(base_offset as i64 + rel_value).ok()
}

/// Read-only cursor over a byte slice with a fixed (but switchable) byte order.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    endian: Endianness,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8], endian: Endianness) -> Self {
        Self {
            data,
            pos: 0,
            endian,
        }
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left between the cursor and the end of the data.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn endianness(&self) -> Endianness {
        self.endian
    }

    pub fn set_endianness(&mut self, endian: Endianness) {
        self.endian = endian;
    }

    pub fn seek(&mut self, offset: usize) -> Result<(), ParseError> {
        if offset > self.data.len() {
            return Err(ParseError::SeekOutOfBounds {
                offset,
                len: self.data.len(),
            });
        }
        self.pos = offset;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> Result<(), ParseError> {
        self.seek(self.pos.saturating_add(count))
    }

    pub fn rewind(&mut self, count: usize) {
        self.pos = self.pos.saturating_sub(count);
    }

    /// Run `parser` at the cursor, requiring `need` bytes to be available.
    fn parse<T>(
        &mut self,
        need: usize,
        mut parser: impl Parser<Input<'a>, T, PErr>,
    ) -> Result<T, ParseError> {
        let offset = self.pos;
        let mut input: Input<'a> = self.data.get(offset..).unwrap_or_default();
        let eof = ParseError::UnexpectedEof {
            offset,
            need,
            have: input.len(),
        };
        if input.len() < need {
            return Err(eof);
        }
        let value = parser.parse_next(&mut input).map_err(|_| eof)?;
        self.pos = self.data.len() - input.len();
        Ok(value)
    }

    pub fn u8(&mut self) -> Result<u8, ParseError> {
        self.parse(1, winnow::binary::u8::<Input<'a>, PErr>)
    }

    pub fn u16(&mut self) -> Result<u16, ParseError> {
        let endian = self.endian.into();
        self.parse(2, winnow::binary::u16::<Input<'a>, PErr>(endian))
    }

    pub fn u32(&mut self) -> Result<u32, ParseError> {
        let endian = self.endian.into();
        self.parse(4, winnow::binary::u32::<Input<'a>, PErr>(endian))
    }

    pub fn i32(&mut self) -> Result<i32, ParseError> {
        let endian = self.endian.into();
        self.parse(4, winnow::binary::i32::<Input<'a>, PErr>(endian))
    }

    pub fn f32(&mut self) -> Result<f32, ParseError> {
        let endian = self.endian.into();
        self.parse(4, winnow::binary::f32::<Input<'a>, PErr>(endian))
    }

    pub fn vec3(&mut self) -> Result<[f32; 3], ParseError> {
        Ok([self.f32()?, self.f32()?, self.f32()?])
    }

    /// Read a u32 without moving the cursor.
    pub fn peek_u32(&self) -> Result<u32, ParseError> {
        self.clone().u32()
    }

    pub fn take(&mut self, count: usize) -> Result<&'a [u8], ParseError> {
        self.parse(count, winnow::token::take::<usize, Input<'a>, PErr>(count))
    }
}

/// Find the first occurrence of `needle` in `haystack`.
pub fn find_tag(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
