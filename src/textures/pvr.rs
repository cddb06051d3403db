//! Parser and decoder for `.pvr` textures.

use rootcause::Report;
use tracing::{debug, warn};

use crate::data::parser_utils::{ByteCursor, Endianness, ParseError, find_tag};
use crate::recognized::Recognized;

use super::TextureError;
use super::pixel::{self, PixelFormat};
use super::raster::{Palette, Raster, RasterPixels, Rgba};
use super::twiddle::detwiddle;

pub const GBIX_TAG: &[u8; 4] = b"GBIX";
pub const PVRT_TAG: &[u8; 4] = b"PVRT";

/// Widths a mipmapped texture may have, smallest first.
const PVR_DIMENSIONS: [u16; 9] = [4, 8, 16, 32, 64, 128, 256, 512, 1024];
/// Bytes taken by each mip level of a 16bpp twiddled texture, before the fixed tail.
const MIP_SIZES: [usize; 8] = [
    0x20, 0x80, 0x200, 0x800, 0x2000, 0x8000, 0x20000, 0x80000,
];
/// Index bytes taken by each VQ mip level.
const VQ_MIP_SIZES: [usize; 8] = [
    0x10, 0x40, 0x100, 0x400, 0x1000, 0x4000, 0x10000, 0x40000,
];
/// Size of the smallest VQ mip levels, which are stored with a fixed size.
const VQ_MIP_TAIL: usize = 6;

/// Texture (layout) format byte of a `PVRT` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TextureFormat {
    Twiddled,
    TwiddledMips,
    Vq,
    VqMips,
    Pal4,
    Pal4Mips,
    Pal8,
    Pal8Mips,
    Rectangle,
    RectangleMips,
    Stride,
    StrideMips,
    TwiddledRectangle,
    Bmp,
    BmpMips,
    SmallVq,
    SmallVqMips,
    TwiddledAliasMips,
}

impl TextureFormat {
    const ALL: [TextureFormat; 18] = [
        TextureFormat::Twiddled,
        TextureFormat::TwiddledMips,
        TextureFormat::Vq,
        TextureFormat::VqMips,
        TextureFormat::Pal4,
        TextureFormat::Pal4Mips,
        TextureFormat::Pal8,
        TextureFormat::Pal8Mips,
        TextureFormat::Rectangle,
        TextureFormat::RectangleMips,
        TextureFormat::Stride,
        TextureFormat::StrideMips,
        TextureFormat::TwiddledRectangle,
        TextureFormat::Bmp,
        TextureFormat::BmpMips,
        TextureFormat::SmallVq,
        TextureFormat::SmallVqMips,
        TextureFormat::TwiddledAliasMips,
    ];

    /// Format codes start at 1.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(usize::from(value).checked_sub(1)?).copied()
    }

    pub fn code(self) -> u8 {
        self as u8 + 1
    }

    /// Whether pixel data is stored in twiddled order.
    pub fn is_twiddled(self) -> bool {
        !matches!(
            self,
            TextureFormat::Rectangle
                | TextureFormat::RectangleMips
                | TextureFormat::Stride
                | TextureFormat::StrideMips
                | TextureFormat::Bmp
                | TextureFormat::BmpMips
        )
    }

    pub fn is_vq(self) -> bool {
        matches!(
            self,
            TextureFormat::Vq
                | TextureFormat::VqMips
                | TextureFormat::SmallVq
                | TextureFormat::SmallVqMips
        )
    }

    pub fn has_mipmaps(self) -> bool {
        matches!(
            self,
            TextureFormat::TwiddledMips
                | TextureFormat::VqMips
                | TextureFormat::Pal4Mips
                | TextureFormat::Pal8Mips
                | TextureFormat::RectangleMips
                | TextureFormat::StrideMips
                | TextureFormat::BmpMips
                | TextureFormat::SmallVqMips
                | TextureFormat::TwiddledAliasMips
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            TextureFormat::Twiddled => "Twiddled",
            TextureFormat::TwiddledMips => "Twiddled + Mips",
            TextureFormat::Vq => "VQ",
            TextureFormat::VqMips => "VQ + Mips",
            TextureFormat::Pal4 => "Palette 4bpp",
            TextureFormat::Pal4Mips => "Palette 4bpp + Mips",
            TextureFormat::Pal8 => "Palette 8bpp",
            TextureFormat::Pal8Mips => "Palette 8bpp + Mips",
            TextureFormat::Rectangle => "Rectangle",
            TextureFormat::RectangleMips => "Rectangle + Mips",
            TextureFormat::Stride => "Stride",
            TextureFormat::StrideMips => "Stride + Mips",
            TextureFormat::TwiddledRectangle => "Twiddled Rectangle",
            TextureFormat::Bmp => "BMP",
            TextureFormat::BmpMips => "BMP + Mips",
            TextureFormat::SmallVq => "Small VQ",
            TextureFormat::SmallVqMips => "Small VQ + Mips",
            TextureFormat::TwiddledAliasMips => "Twiddled Alias + Mips",
        }
    }

    /// `(size multiplier, fixed tail)` of the mip chain preceding the full-size
    /// image, for the non-VQ mipmapped layouts that store one.
    fn mip_layout(self) -> Option<(usize, usize)> {
        match self {
            TextureFormat::TwiddledMips => Some((4, 0x2C)),
            TextureFormat::Pal4Mips => Some((1, 0x0C)),
            TextureFormat::Pal8Mips => Some((2, 0x18)),
            TextureFormat::RectangleMips => Some((4, 0x2C)),
            TextureFormat::BmpMips => Some((8, 0x54)),
            TextureFormat::TwiddledAliasMips => Some((4, 0x30)),
            _ => None,
        }
    }

    fn codebook_entries(self, width: u16) -> usize {
        match (self, width) {
            (TextureFormat::SmallVq, ..=16) => 16,
            (TextureFormat::SmallVq, 32) => 32,
            (TextureFormat::SmallVq, 64) => 128,
            (TextureFormat::SmallVqMips, ..=16) => 16,
            (TextureFormat::SmallVqMips, 32) => 64,
            _ => 256,
        }
    }
}

impl std::fmt::Display for TextureFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Contents of a `GBIX` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlobalIndex {
    pub primary: u32,
    pub secondary: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PvrHeader {
    pub global_index: Option<GlobalIndex>,
    pub pixel_format: Recognized<PixelFormat, u8>,
    pub texture_format: Recognized<TextureFormat, u8>,
    pub width: u16,
    pub height: u16,
    /// Offset of the first byte after the `PVRT` chunk header.
    pub data_offset: usize,
}

impl PvrHeader {
    fn invalid_dimensions(&self, reason: &'static str) -> TextureError {
        TextureError::InvalidDimensions {
            width: self.width,
            height: self.height,
            reason,
        }
    }

    /// Index of the full-size level in the mip tables.
    fn mip_level(&self) -> Result<usize, TextureError> {
        PVR_DIMENSIONS
            .iter()
            .position(|&d| d == self.width)
            .and_then(|i| i.checked_sub(1))
            .ok_or_else(|| self.invalid_dimensions("no mip chain layout for this width"))
    }

    /// Offset of the full-size image, past any smaller mip levels stored first.
    pub fn image_offset(&self) -> Result<usize, TextureError> {
        let Recognized::Known(format) = self.texture_format else {
            return Ok(self.data_offset);
        };
        let Some((multiplier, tail)) = format.mip_layout() else {
            return Ok(self.data_offset);
        };
        let level = self.mip_level()?;
        Ok(self.data_offset + MIP_SIZES[..level].iter().sum::<usize>() * multiplier + tail)
    }
}

/// A decoded texture.
#[derive(Debug, Clone)]
pub struct PvrTexture {
    pub header: PvrHeader,
    pub raster: Raster,
}

fn read_global_index(data: &[u8]) -> Result<Option<GlobalIndex>, TextureError> {
    let Some(offset) = find_tag(data, GBIX_TAG) else {
        return Ok(None);
    };
    let mut cursor = ByteCursor::new(data, Endianness::Little);
    cursor.seek(offset + 4)?;
    match cursor.u32()? {
        8 => Ok(Some(GlobalIndex {
            primary: cursor.u32()?,
            secondary: Some(cursor.u32()?),
        })),
        4 => Ok(Some(GlobalIndex {
            primary: cursor.u32()?,
            secondary: None,
        })),
        size => {
            warn!(size, "unsupported GBIX chunk size, ignoring global index");
            Ok(None)
        }
    }
}

fn read_header(data: &[u8]) -> Result<PvrHeader, TextureError> {
    let global_index = read_global_index(data)?;
    let offset = find_tag(data, PVRT_TAG).ok_or(TextureError::MissingChunk("PVRT"))?;

    let mut cursor = ByteCursor::new(data, Endianness::Little);
    cursor.seek(offset + 8)?;
    let pixel = cursor.u8()?;
    let texture = cursor.u8()?;
    cursor.skip(2)?;
    let width = cursor.u16()?;
    let height = cursor.u16()?;

    Ok(PvrHeader {
        global_index,
        pixel_format: Recognized::from_raw(pixel, PixelFormat::from_u8),
        texture_format: Recognized::from_raw(texture, TextureFormat::from_u8),
        width,
        height,
        data_offset: cursor.position(),
    })
}

/// Parse the `GBIX`/`PVRT` headers without decoding pixel data.
pub fn parse_pvr_header(data: &[u8]) -> Result<PvrHeader, Report<TextureError>> {
    read_header(data).map_err(Report::new)
}

/// Decode a `.pvr` file. `palette` is applied to paletted textures; without it
/// an identity grayscale ramp is attached instead.
pub fn decode_pvr(data: &[u8], palette: Option<&Palette>) -> Result<PvrTexture, Report<TextureError>> {
    let header = read_header(data).map_err(Report::new)?;
    let raster = decode_raster(data, &header, palette).map_err(Report::new)?;
    Ok(PvrTexture { header, raster })
}

fn decode_raster(
    data: &[u8],
    header: &PvrHeader,
    palette: Option<&Palette>,
) -> Result<Raster, TextureError> {
    let texture_format = header
        .texture_format
        .known_or_else(TextureError::UnsupportedTextureFormat)?;
    let pixel_format = header.pixel_format;
    let (width, height) = (header.width, header.height);
    let (w, h) = (usize::from(width), usize::from(height));

    let mut cursor = ByteCursor::new(data, Endianness::Little);
    cursor.seek(header.image_offset()?)?;

    debug!(
        width,
        height,
        texture_format = %texture_format,
        pixel_format = %pixel_format,
        "decoding PVR texture"
    );

    let need = body_len(texture_format, pixel_format, header.width, w * h);
    if cursor.remaining() < need {
        return Err(ParseError::UnexpectedEof {
            offset: cursor.position(),
            need,
            have: cursor.remaining(),
        }
        .into());
    }

    let order = if texture_format.is_twiddled() {
        detwiddle(w, h)
    } else {
        (0..(w * h) as u32).collect()
    };

    let pixels = match texture_format {
        TextureFormat::Pal4 | TextureFormat::Pal4Mips => {
            let packed = cursor.take(w * h / 2)?;
            let linear: Vec<u8> = packed.iter().flat_map(|&b| [b & 0x0F, b >> 4]).collect();
            return Ok(indexed_raster(header, &linear, &order, palette, 16));
        }
        TextureFormat::Pal8 | TextureFormat::Pal8Mips => {
            let linear = cursor.take(w * h)?;
            return Ok(indexed_raster(header, linear, &order, palette, 256));
        }
        format if format.is_vq() => decode_vq(&mut cursor, header, format, known_pixel(pixel_format)?)?,
        TextureFormat::Bmp | TextureFormat::BmpMips => (0..w * h)
            .map(|_| cursor.u32().map(pixel::rgba8888))
            .collect::<Result<Vec<_>, _>>()?,
        _ => match known_pixel(pixel_format)? {
            PixelFormat::Yuv420 => pixel::yuv420_to_rgb(&mut cursor, width, height)?,
            PixelFormat::Yuv422 => {
                let words = read_words(&mut cursor, w * h, 2)?;
                let mut out = Vec::with_capacity(w * h);
                for pair in order.chunks(2) {
                    let first = words_at(&words, pair[0]);
                    let second = pair.get(1).map_or(0, |&i| words_at(&words, i));
                    out.extend(pixel::yuv422_pair(first as u16, second as u16));
                }
                out.truncate(w * h);
                out
            }
            format @ (PixelFormat::Argb1555
            | PixelFormat::Rgb565
            | PixelFormat::Argb4444
            | PixelFormat::Rgb555
            | PixelFormat::Bump
            | PixelFormat::Argb8888) => {
                let size = if format == PixelFormat::Argb8888 { 4 } else { 2 };
                let words = read_words(&mut cursor, w * h, size)?;
                order
                    .iter()
                    .map(|&i| pixel::decode_pixel(format, words_at(&words, i)))
                    .collect::<Result<Vec<_>, _>>()?
            }
            other => return Err(TextureError::UnsupportedPixelFormat(other.code())),
        },
    };

    Ok(Raster::rgba(u32::from(width), u32::from(height), pixels))
}

/// Minimum number of image bytes a texture of `pixels` pixels occupies after its
/// mip levels. Checked before any per-pixel buffer is allocated.
fn body_len(
    texture_format: TextureFormat,
    pixel_format: Recognized<PixelFormat, u8>,
    width: u16,
    pixels: usize,
) -> usize {
    match texture_format {
        TextureFormat::Pal4 | TextureFormat::Pal4Mips => pixels / 2,
        TextureFormat::Pal8 | TextureFormat::Pal8Mips => pixels,
        format if format.is_vq() => format.codebook_entries(width) * 8 + pixels / 4,
        TextureFormat::Bmp | TextureFormat::BmpMips => pixels * 4,
        _ => match pixel_format {
            Recognized::Known(PixelFormat::Argb8888) => pixels * 4,
            Recognized::Known(PixelFormat::Yuv420) => pixels * 3 / 2,
            Recognized::Known(_) => pixels * 2,
            Recognized::Unknown(_) => 0,
        },
    }
}

fn known_pixel(format: Recognized<PixelFormat, u8>) -> Result<PixelFormat, TextureError> {
    format.known_or_else(TextureError::UnsupportedPixelFormat)
}

fn read_words(cursor: &mut ByteCursor<'_>, count: usize, size: usize) -> Result<Vec<u32>, TextureError> {
    (0..count)
        .map(|_| match size {
            4 => cursor.u32(),
            _ => cursor.u16().map(u32::from),
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(TextureError::from)
}

fn words_at(words: &[u32], index: u32) -> u32 {
    words.get(index as usize).copied().unwrap_or(0)
}

fn indexed_raster(
    header: &PvrHeader,
    linear: &[u8],
    order: &[u32],
    palette: Option<&Palette>,
    entries: usize,
) -> Raster {
    let indices = order
        .iter()
        .map(|&i| linear.get(i as usize).copied().unwrap_or(0))
        .collect();
    let palette = palette.cloned().unwrap_or_else(|| Palette::grayscale(entries));
    Raster {
        width: u32::from(header.width),
        height: u32::from(header.height),
        pixels: RasterPixels::Indexed { indices, palette },
    }
}

/// One codebook entry: colours at (x0,y0), (x0,y1), (x1,y0), (x1,y1).
type Codeword = [Rgba; 4];

fn read_codebook(
    cursor: &mut ByteCursor<'_>,
    entries: usize,
    format: PixelFormat,
) -> Result<Vec<Codeword>, TextureError> {
    let mut codebook = Vec::with_capacity(entries);
    for _ in 0..entries {
        let words = [cursor.u16()?, cursor.u16()?, cursor.u16()?, cursor.u16()?];
        let entry = match format {
            PixelFormat::Yuv422 => {
                // Words 0/3 and 1/2 form the two YUV pairs.
                let [p0, p1] = pixel::yuv422_pair(words[0], words[3]);
                let [p2, p3] = pixel::yuv422_pair(words[1], words[2]);
                [p0, p2, p3, p1]
            }
            PixelFormat::Argb1555
            | PixelFormat::Rgb565
            | PixelFormat::Argb4444
            | PixelFormat::Rgb555
            | PixelFormat::Bump => words.map(|w| match format {
                PixelFormat::Argb1555 => pixel::argb1555(w),
                PixelFormat::Rgb565 => pixel::rgb565(w),
                PixelFormat::Argb4444 => pixel::argb4444(w),
                PixelFormat::Rgb555 => pixel::rgb555(w),
                _ => pixel::bump(w),
            }),
            other => return Err(TextureError::UnsupportedPixelFormat(other.code())),
        };
        codebook.push(entry);
    }
    Ok(codebook)
}

fn decode_vq(
    cursor: &mut ByteCursor<'_>,
    header: &PvrHeader,
    format: TextureFormat,
    pixel_format: PixelFormat,
) -> Result<Vec<Rgba>, TextureError> {
    let (w, h) = (usize::from(header.width), usize::from(header.height));
    let codebook = read_codebook(cursor, format.codebook_entries(header.width), pixel_format)?;

    if format.has_mipmaps() {
        let level = header.mip_level()?;
        cursor.skip(VQ_MIP_SIZES[..level].iter().sum::<usize>() + VQ_MIP_TAIL)?;
    }

    let (bw, bh) = (w / 2, h / 2);
    let indices = cursor.take(bw * bh)?;
    let order = detwiddle(bw, bh);

    let mut pixels = vec![[0u8; 4]; w * h];
    for by in 0..bh {
        for bx in 0..bw {
            let index = indices
                .get(order[by * bw + bx] as usize)
                .copied()
                .unwrap_or(0);
            let entry = codebook.get(usize::from(index)).ok_or(
                TextureError::CodebookIndexOutOfRange {
                    index,
                    entries: codebook.len(),
                },
            )?;
            let (x, y) = (bx * 2, by * 2);
            pixels[y * w + x] = entry[0];
            pixels[(y + 1) * w + x] = entry[1];
            pixels[y * w + x + 1] = entry[2];
            pixels[(y + 1) * w + x + 1] = entry[3];
        }
    }
    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pvr(pixel: u8, texture: u8, width: u16, height: u16, body: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(PVRT_TAG);
        data.extend_from_slice(&((body.len() + 8) as u32).to_le_bytes());
        data.push(pixel);
        data.push(texture);
        data.extend_from_slice(&[0, 0]);
        data.extend_from_slice(&width.to_le_bytes());
        data.extend_from_slice(&height.to_le_bytes());
        data.extend_from_slice(body);
        data
    }

    #[test]
    fn test_header_with_gbix() {
        let mut data = Vec::new();
        data.extend_from_slice(GBIX_TAG);
        data.extend_from_slice(&8u32.to_le_bytes());
        data.extend_from_slice(&0x1234u32.to_le_bytes());
        data.extend_from_slice(&0x5678u32.to_le_bytes());
        data.extend(pvr(1, 9, 4, 2, &[0; 16]));
        let header = parse_pvr_header(&data).unwrap();
        assert_eq!(
            header.global_index,
            Some(GlobalIndex {
                primary: 0x1234,
                secondary: Some(0x5678)
            })
        );
        assert_eq!(header.pixel_format, Recognized::Known(PixelFormat::Rgb565));
        assert_eq!(header.texture_format, Recognized::Known(TextureFormat::Rectangle));
        assert_eq!((header.width, header.height), (4, 2));
        assert_eq!(header.data_offset, 0x20);
    }

    #[test]
    fn test_missing_pvrt() {
        let err = decode_pvr(b"GBIX\x04\0\0\0\0\0\0\0", None).unwrap_err();
        assert!(matches!(
            err.current_context(),
            TextureError::MissingChunk("PVRT")
        ));
    }

    #[test]
    fn test_pal4_identity_palette() {
        let (w, h) = (16usize, 16usize);
        let body: Vec<u8> = (0..w * h / 2).map(|i| (i * 37 % 251) as u8).collect();
        let texture = decode_pvr(&pvr(8, 5, 16, 16, &body), None).unwrap();

        let linear: Vec<u8> = body.iter().flat_map(|&b| [b & 0xF, b >> 4]).collect();
        let order = detwiddle(w, h);
        let palette = Palette::grayscale(16);
        let rgba = texture.raster.to_rgba();
        for p in 0..w * h {
            assert_eq!(rgba[p], palette.color(linear[order[p] as usize]));
        }
        assert_eq!(texture.raster.palette().map(Palette::len), Some(16));
    }

    #[test]
    fn test_pal8_with_palette() {
        let body: Vec<u8> = (0..16).collect();
        let palette = Palette {
            colors: (0..=255u8).map(|i| [i, 255 - i, 0]).collect(),
        };
        let texture = decode_pvr(&pvr(9, 7, 4, 4, &body), Some(&palette)).unwrap();
        // (1,0) is stored at twiddled index 2.
        assert_eq!(texture.raster.pixel(1, 0), Some([2, 253, 0, 255]));
    }

    #[test]
    fn test_vq_32x32() {
        let (w, h) = (32usize, 32usize);
        let mut body = Vec::new();
        for entry in 0..256u32 {
            for corner in 0..4u32 {
                // ARGB4444 with a distinct blue nibble per corner and red/green from the entry.
                let word = 0xF000 | ((entry & 0xFF) << 4) | corner;
                body.extend_from_slice(&(word as u16).to_le_bytes());
            }
        }
        let indices: Vec<u8> = (0..(w / 2) * (h / 2)).map(|i| (i * 7 % 256) as u8).collect();
        body.extend_from_slice(&indices);

        let texture = decode_pvr(&pvr(2, 3, 32, 32, &body), None).unwrap();
        let rgba = texture.raster.to_rgba();
        assert_eq!(rgba.len(), w * h);

        let order = detwiddle(w / 2, h / 2);
        for y in 0..h {
            for x in 0..w {
                let entry = u32::from(indices[order[(y / 2) * (w / 2) + x / 2] as usize]);
                let corner = match (x % 2, y % 2) {
                    (0, 0) => 0,
                    (0, 1) => 1,
                    (1, 0) => 2,
                    _ => 3,
                };
                let expected = pixel::argb4444((0xF000 | (entry << 4) | corner) as u16);
                assert_eq!(rgba[y * w + x], expected, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_small_vq_index_past_codebook() {
        // SmallVQ at 8x8 has a 16-entry codebook; index 16 is out of range.
        let mut body = vec![0u8; 16 * 8];
        body.extend_from_slice(&[0, 1, 2, 16, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let err = decode_pvr(&pvr(1, 16, 8, 8, &body), None).unwrap_err();
        assert!(matches!(
            err.current_context(),
            TextureError::CodebookIndexOutOfRange {
                index: 16,
                entries: 16
            }
        ));
    }

    #[test]
    fn test_huge_dimensions_fail_before_allocating() {
        let err = decode_pvr(&pvr(1, 1, 32768, 32768, &[0; 16]), None).unwrap_err();
        assert!(matches!(
            err.current_context(),
            TextureError::Truncated(ParseError::UnexpectedEof { need, have: 16, .. })
                if *need == 32768 * 32768 * 2
        ));

        let err = decode_pvr(&pvr(2, 3, 32768, 32768, &[0; 64]), None).unwrap_err();
        assert!(matches!(
            err.current_context(),
            TextureError::Truncated(_)
        ));
    }

    #[test]
    fn test_small_vq_codebook_sizes() {
        assert_eq!(TextureFormat::SmallVq.codebook_entries(8), 16);
        assert_eq!(TextureFormat::SmallVq.codebook_entries(64), 128);
        assert_eq!(TextureFormat::SmallVqMips.codebook_entries(32), 64);
        assert_eq!(TextureFormat::SmallVqMips.codebook_entries(128), 256);
        assert_eq!(TextureFormat::Vq.codebook_entries(8), 256);
    }

    #[test]
    fn test_twiddled_argb1555() {
        let words: [u16; 4] = [0x8000, 0xFC00, 0x83E0, 0x801F];
        let body: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        let texture = decode_pvr(&pvr(0, 1, 2, 2, &body), None).unwrap();
        // Storage order [0, 2, 1, 3]: row 0 holds words 0 and 2.
        assert_eq!(
            texture.raster.to_rgba(),
            vec![
                [0, 0, 0, 255],
                [0, 255, 0, 255],
                [255, 0, 0, 255],
                [0, 0, 255, 255],
            ]
        );
    }

    #[test]
    fn test_rectangle_is_not_reordered() {
        let words: [u16; 4] = [0xF000, 0xF00F, 0xF0F0, 0xFF00];
        let body: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        let texture = decode_pvr(&pvr(2, 9, 4, 1, &body), None).unwrap();
        let rgba = texture.raster.to_rgba();
        assert_eq!(rgba[1], [0, 0, 255, 255]);
        assert_eq!(rgba[3], [255, 0, 0, 255]);
    }

    #[test]
    fn test_bmp_rgba8888() {
        let body: Vec<u8> = [0x11223344u32, 0xAABBCCDD]
            .iter()
            .flat_map(|w| w.to_le_bytes())
            .collect();
        let texture = decode_pvr(&pvr(7, 14, 2, 1, &body), None).unwrap();
        assert_eq!(
            texture.raster.to_rgba(),
            vec![[0x11, 0x22, 0x33, 0x44], [0xAA, 0xBB, 0xCC, 0xDD]]
        );
    }

    #[test]
    fn test_mip_offsets() {
        let header = |texture: TextureFormat, width: u16| PvrHeader {
            global_index: None,
            pixel_format: Recognized::Known(PixelFormat::Rgb565),
            texture_format: Recognized::Known(texture),
            width,
            height: width,
            data_offset: 0x10,
        };
        assert_eq!(header(TextureFormat::Twiddled, 64).image_offset().unwrap(), 0x10);
        assert_eq!(
            header(TextureFormat::TwiddledMips, 64).image_offset().unwrap(),
            0x10 + (0x20 + 0x80 + 0x200) * 4 + 0x2C
        );
        assert_eq!(
            header(TextureFormat::Pal4Mips, 8).image_offset().unwrap(),
            0x10 + 0x0C
        );
        assert!(matches!(
            header(TextureFormat::Pal8Mips, 4).image_offset(),
            Err(TextureError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_yuv422_twiddled_pairs() {
        let words: [u16; 4] = [0x8080, 0x1080, 0x8080, 0x1080];
        let body: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        let texture = decode_pvr(&pvr(3, 9, 4, 1, &body), None).unwrap();
        let rgba = texture.raster.to_rgba();
        assert_eq!(rgba[0], [130, 130, 130, 255]);
        assert_eq!(rgba[1], [0, 0, 0, 255]);
    }

    #[test]
    fn test_unsupported_formats() {
        let err = decode_pvr(&pvr(1, 0, 2, 2, &[0; 8]), None).unwrap_err();
        assert!(matches!(
            err.current_context(),
            TextureError::UnsupportedTextureFormat(0)
        ));
        let err = decode_pvr(&pvr(8, 1, 2, 2, &[0; 8]), None).unwrap_err();
        assert!(matches!(
            err.current_context(),
            TextureError::UnsupportedPixelFormat(8)
        ));
        let err = decode_pvr(&pvr(42, 9, 2, 2, &[0; 8]), None).unwrap_err();
        assert!(matches!(
            err.current_context(),
            TextureError::UnsupportedPixelFormat(42)
        ));
    }

    #[test]
    fn test_truncated_data() {
        let err = decode_pvr(&pvr(1, 1, 4, 4, &[0; 6]), None).unwrap_err();
        assert!(matches!(err.current_context(), TextureError::Truncated(_)));
    }
}
