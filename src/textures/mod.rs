//! PVR texture and PVP palette decoding.
//!
//! A `.pvr` file carries an optional `GBIX` chunk (global index) and a `PVRT`
//! chunk holding the pixel data in one of several layouts: twiddled (a Z-order
//! permutation of the pixels), rectangular/stride, VQ compressed (2x2 blocks
//! replaced by indices into a codebook) or paletted (4/8-bit indices). The
//! matching `.pvp` file provides the palette for paletted textures.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::data::parser_utils::ParseError;

pub mod pixel;
pub mod pvp;
pub mod pvr;
pub mod raster;
pub mod twiddle;

pub use pixel::PixelFormat;
pub use pvp::parse_pvp;
pub use pvr::{PvrHeader, PvrTexture, TextureFormat, decode_pvr, parse_pvr_header};
pub use raster::{ACT_LEN, Palette, Raster, RasterPixels, Rgba};
pub use twiddle::detwiddle;

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("unsupported pixel format {0}")]
    UnsupportedPixelFormat(u8),
    #[error("unsupported texture format {0}")]
    UnsupportedTextureFormat(u8),
    #[error("'{0}' chunk not found")]
    MissingChunk(&'static str),
    #[error("texture data truncated: {0}")]
    Truncated(#[from] ParseError),
    #[error("invalid dimensions {width}x{height}: {reason}")]
    InvalidDimensions {
        width: u16,
        height: u16,
        reason: &'static str,
    },
    #[error("VQ index {index} is past the end of a {entries}-entry codebook")]
    CodebookIndexOutOfRange { index: u8, entries: usize },
    #[error("invalid palette: {0}")]
    InvalidPalette(String),
}

/// Path of the texture a model refers to by id: `<model dir>/Textures/TexID_NNN.<ext>`.
///
/// Negative ids mean "untextured" and resolve to nothing.
pub fn texture_path(model_path: &Path, texture_id: i32, extension: &str) -> Option<PathBuf> {
    if texture_id < 0 {
        return None;
    }
    let dir = model_path.parent().unwrap_or_else(|| Path::new(""));
    Some(
        dir.join("Textures")
            .join(format!("TexID_{texture_id:03}.{extension}")),
    )
}

/// The `.pvp` palette that sits next to a `.pvr`, if there is one.
pub fn companion_palette(pvr_path: &Path) -> Option<PathBuf> {
    ["pvp", "PVP"]
        .iter()
        .map(|ext| pvr_path.with_extension(ext))
        .find(|candidate| candidate.is_file())
}
