//! Parser for `.pvp` palette files.
//!
//! Layout: magic `PVPL` at 0x00, the entry pixel mode at 0x08, the entry
//! count (u16) at 0x0E and the entries themselves from 0x10.

use rootcause::Report;
use tracing::debug;

use crate::data::parser_utils::{ByteCursor, Endianness};

use super::TextureError;
use super::raster::Palette;

pub const PVP_MAGIC: &[u8; 4] = b"PVPL";
const HEADER_LEN: usize = 0x10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteMode {
    Rgb555,
    Rgb565,
    Argb4444,
    Argb8888,
}

impl PaletteMode {
    fn from_byte(value: u8) -> Self {
        match value {
            1 => PaletteMode::Rgb565,
            2 => PaletteMode::Argb4444,
            6 => PaletteMode::Argb8888,
            _ => PaletteMode::Rgb555,
        }
    }

    fn entry_size(self) -> usize {
        match self {
            PaletteMode::Argb8888 => 4,
            _ => 2,
        }
    }

    fn convert(self, c: u32) -> [u8; 3] {
        let field = |shift: u32, mask: u32| ((c >> shift) & mask) as u8;
        match self {
            PaletteMode::Rgb555 => [field(10, 0x1F) << 3, field(5, 0x1F) << 3, field(0, 0x1F) << 3],
            PaletteMode::Rgb565 => [field(11, 0x1F) << 3, field(5, 0x3F) << 2, field(0, 0x1F) << 3],
            PaletteMode::Argb4444 => [field(8, 0xF) << 4, field(4, 0xF) << 4, field(0, 0xF) << 4],
            PaletteMode::Argb8888 => [field(16, 0xFF), field(8, 0xFF), field(0, 0xFF)],
        }
    }
}

fn read_palette(data: &[u8]) -> Result<Palette, TextureError> {
    if data.len() <= HEADER_LEN {
        return Err(TextureError::InvalidPalette(format!(
            "file is only {} bytes",
            data.len()
        )));
    }
    if &data[..4] != PVP_MAGIC {
        return Err(TextureError::InvalidPalette("missing PVPL magic".into()));
    }

    let mut cursor = ByteCursor::new(data, Endianness::Little);
    cursor.seek(0x08)?;
    let mode = PaletteMode::from_byte(cursor.u8()?);
    cursor.seek(0x0E)?;
    let entries = usize::from(cursor.u16()?);

    let needed = entries * mode.entry_size();
    if needed > data.len() - HEADER_LEN {
        return Err(TextureError::InvalidPalette(format!(
            "{entries} entries need {needed} bytes, only {} present",
            data.len() - HEADER_LEN
        )));
    }

    let mut colors = Vec::with_capacity(entries);
    for _ in 0..entries {
        let raw = match mode {
            PaletteMode::Argb8888 => cursor.u32()?,
            _ => u32::from(cursor.u16()?),
        };
        colors.push(mode.convert(raw));
    }
    debug!(?mode, entries, "parsed PVP palette");
    Ok(Palette { colors })
}

/// Parse a `.pvp` palette file into RGB entries.
pub fn parse_pvp(data: &[u8]) -> Result<Palette, Report<TextureError>> {
    read_palette(data).map_err(Report::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pvp(mode: u8, entries: u16, body: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(PVP_MAGIC);
        data.extend_from_slice(&[0; 4]);
        data.push(mode);
        data.extend_from_slice(&[0; 5]);
        data.extend_from_slice(&entries.to_le_bytes());
        data.extend_from_slice(body);
        data
    }

    #[test]
    fn test_rgb565_entries() {
        let body = [0x1F, 0x00, 0xE0, 0x07];
        let palette = parse_pvp(&pvp(1, 2, &body)).unwrap();
        assert_eq!(palette.colors, vec![[0, 0, 248], [0, 252, 0]]);
    }

    #[test]
    fn test_argb8888_entries() {
        let body = 0xFF102030u32.to_le_bytes();
        let palette = parse_pvp(&pvp(6, 1, &body)).unwrap();
        assert_eq!(palette.colors, vec![[0x10, 0x20, 0x30]]);
    }

    #[test]
    fn test_rgb555_is_the_default_mode() {
        let body = 0x7C00u16.to_le_bytes();
        let palette = parse_pvp(&pvp(9, 1, &body)).unwrap();
        assert_eq!(palette.colors, vec![[248, 0, 0]]);
    }

    #[test]
    fn test_bad_magic() {
        let mut data = pvp(1, 1, &[0, 0]);
        data[0] = b'X';
        let err = parse_pvp(&data).unwrap_err();
        assert!(matches!(
            err.current_context(),
            TextureError::InvalidPalette(_)
        ));
    }

    #[test]
    fn test_entries_must_fit() {
        let err = parse_pvp(&pvp(6, 4, &[0; 8])).unwrap_err();
        assert!(matches!(
            err.current_context(),
            TextureError::InvalidPalette(_)
        ));
    }

    #[test]
    fn test_header_only_is_rejected() {
        assert!(parse_pvp(&pvp(1, 0, &[])).is_err());
    }
}
