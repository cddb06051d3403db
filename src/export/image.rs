//! Raster output: PNG, BMP and TGA images plus `.act` colour tables.

use std::path::Path;

use ::image::codecs::bmp::BmpEncoder;
use ::image::codecs::png::PngEncoder;
use ::image::codecs::tga::TgaEncoder;
use ::image::{ExtendedColorType, ImageEncoder};
use rootcause::Report;
use thiserror::Error;
use tracing::debug;

use crate::textures::{Palette, Raster};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported image extension '{0}' (expected png, bmp or tga)")]
    UnsupportedExtension(String),
    #[error("failed to encode {format:?}: {reason}")]
    Encode { format: ImageFormat, reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageFormat {
    #[default]
    Png,
    Bmp,
    Tga,
}

impl ImageFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "bmp" => Some(ImageFormat::Bmp),
            "tga" => Some(ImageFormat::Tga),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Tga => "tga",
        }
    }
}

/// Encode `raster` as RGBA8 in `format`. Paletted rasters are expanded.
pub fn encode_raster(raster: &Raster, format: ImageFormat) -> Result<Vec<u8>, Report<ExportError>> {
    let rgba: Vec<u8> = raster.to_rgba().into_iter().flatten().collect();
    let (w, h) = (raster.width, raster.height);
    let mut buf = Vec::new();
    let result = match format {
        ImageFormat::Png => {
            PngEncoder::new(&mut buf).write_image(&rgba, w, h, ExtendedColorType::Rgba8)
        }
        ImageFormat::Bmp => {
            BmpEncoder::new(&mut buf).write_image(&rgba, w, h, ExtendedColorType::Rgba8)
        }
        ImageFormat::Tga => {
            TgaEncoder::new(&mut buf).write_image(&rgba, w, h, ExtendedColorType::Rgba8)
        }
    };
    result.map_err(|e| {
        Report::new(ExportError::Encode {
            format,
            reason: e.to_string(),
        })
    })?;
    Ok(buf)
}

/// Write `raster` to `path`, picking the encoder from the file extension.
pub fn save_raster(path: &Path, raster: &Raster) -> Result<(), Report<ExportError>> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    let format = ImageFormat::from_extension(&ext)
        .ok_or_else(|| Report::new(ExportError::UnsupportedExtension(ext)))?;
    let bytes = encode_raster(raster, format)?;
    std::fs::write(path, &bytes).map_err(|e| Report::new(ExportError::Io(e)))?;
    debug!(path = %path.display(), ?format, bytes = bytes.len(), "saved raster");
    Ok(())
}

/// Write a palette as a 768-byte Adobe colour table.
pub fn save_act(path: &Path, palette: &Palette) -> Result<(), Report<ExportError>> {
    std::fs::write(path, palette.to_act_bytes()).map_err(|e| Report::new(ExportError::Io(e)))
}
