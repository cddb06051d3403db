//! Multi-model archives: a table of end offsets followed by concatenated,
//! big- or little-endian model payloads.
//!
//! ```text
//! 0x00  header_length          (u32)
//! 0x04  first child start      (u32)
//! 0x08  end offset of child 0  (u32)
//! ...   one end offset per child; child n+1 starts where child n ends
//! ```

use rootcause::Report;
use thiserror::Error;
use tracing::{debug, warn};

use crate::data::parser_utils::{ByteCursor, Endianness, ParseError};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive table is truncated: {0}")]
    Truncated(#[from] ParseError),
    #[error("archive child {index} has an invalid range 0x{start:X}..0x{end:X} (archive is 0x{len:X} bytes)")]
    MalformedArchiveTable {
        index: usize,
        start: usize,
        end: usize,
        len: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArchiveEntry {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    /// The table held a zero end offset that was replaced by a fallback read.
    pub recovered: bool,
}

impl ArchiveEntry {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveTable<'a> {
    data: &'a [u8],
    pub endianness: Endianness,
    pub header_length: u32,
    pub entries: Vec<ArchiveEntry>,
}

impl<'a> ArchiveTable<'a> {
    /// Payload of `entry`, or `MalformedArchiveTable` if its range does not
    /// fit the archive. Other entries are unaffected.
    pub fn child(&self, entry: &ArchiveEntry) -> Result<&'a [u8], Report<ArchiveError>> {
        if entry.start > entry.end || entry.end > self.data.len() {
            return Err(Report::new(ArchiveError::MalformedArchiveTable {
                index: entry.index,
                start: entry.start,
                end: entry.end,
                len: self.data.len(),
            }));
        }
        Ok(&self.data[entry.start..entry.end])
    }

    /// Every child payload in table order.
    pub fn children(
        &self,
    ) -> impl Iterator<Item = (ArchiveEntry, Result<&'a [u8], Report<ArchiveError>>)> + '_ {
        self.entries.iter().map(|entry| (*entry, self.child(entry)))
    }
}

/// Detect the byte order of an archive.
///
/// An archive is big-endian when its first two bytes are zero and the
/// little-endian u16 that follows is above 1000, i.e. the header length's low
/// bytes sit at the end of the word.
pub fn archive_endianness(data: &[u8]) -> Endianness {
    match data {
        [0, 0, lo, hi, ..] if u16::from_le_bytes([*lo, *hi]) > 1000 => Endianness::Big,
        _ => Endianness::Little,
    }
}

fn read_table(data: &[u8]) -> Result<ArchiveTable<'_>, ArchiveError> {
    let endianness = archive_endianness(data);
    let mut cursor = ByteCursor::new(data, endianness);
    let header_length = cursor.u32()?;
    let count = (header_length.saturating_sub(8) / 4) as usize;
    let mut start = cursor.u32()? as usize;

    let fallback = |at: u32| -> Result<u32, ParseError> {
        let mut probe = ByteCursor::new(data, endianness);
        probe.seek(at as usize)?;
        probe.u32()
    };

    let mut entries = Vec::with_capacity(count.min(data.len() / 4));
    for index in 0..count {
        let mut end = cursor.u32()?;
        let recovered = end == 0;
        if recovered {
            end = fallback(header_length.saturating_add(8))?;
            if (end as usize) < start {
                end = fallback(header_length.saturating_add(4))?;
            }
            warn!(index, end, "archive child has a zero end offset, recovered from the header");
        }
        let end = end as usize;
        entries.push(ArchiveEntry {
            index,
            start,
            end,
            recovered,
        });
        start = end;
    }

    debug!(?endianness, header_length, children = entries.len(), "read archive table");
    Ok(ArchiveTable {
        data,
        endianness,
        header_length,
        entries,
    })
}

/// Parse the child table of a multi-model archive.
pub fn read_archive_table(data: &[u8]) -> Result<ArchiveTable<'_>, Report<ArchiveError>> {
    read_table(data).map_err(Report::new)
}

/// Reverse the byte order of every complete 4-byte word; a trailing partial
/// word is left as is.
pub fn swap_words(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    for word in out.chunks_exact_mut(4) {
        word.reverse();
    }
    out
}
