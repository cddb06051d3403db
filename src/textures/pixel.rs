//! Pixel format conversions to RGBA8.

use std::f64::consts::{FRAC_PI_2, TAU};

use crate::data::parser_utils::ByteCursor;

use super::TextureError;
use super::raster::Rgba;

/// Pixel format byte of a `PVRT` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PixelFormat {
    Argb1555,
    Rgb565,
    Argb4444,
    Yuv422,
    Bump,
    Rgb555,
    Yuv420,
    Argb8888,
    Pal4,
    Pal8,
    Auto,
}

impl PixelFormat {
    const ALL: [PixelFormat; 11] = [
        PixelFormat::Argb1555,
        PixelFormat::Rgb565,
        PixelFormat::Argb4444,
        PixelFormat::Yuv422,
        PixelFormat::Bump,
        PixelFormat::Rgb555,
        PixelFormat::Yuv420,
        PixelFormat::Argb8888,
        PixelFormat::Pal4,
        PixelFormat::Pal8,
        PixelFormat::Auto,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            PixelFormat::Argb1555 => "ARGB1555",
            PixelFormat::Rgb565 => "RGB565",
            PixelFormat::Argb4444 => "ARGB4444",
            PixelFormat::Yuv422 => "YUV422",
            PixelFormat::Bump => "BUMP",
            PixelFormat::Rgb555 => "RGB555",
            PixelFormat::Yuv420 => "YUV420",
            PixelFormat::Argb8888 => "ARGB8888",
            PixelFormat::Pal4 => "PAL4",
            PixelFormat::Pal8 => "PAL8",
            PixelFormat::Auto => "AUTO",
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Scale an `n`-bit channel to 0..=255, truncating.
fn expand(value: u16, max: u16) -> u8 {
    (u32::from(value) * 255 / u32::from(max)) as u8
}

pub fn argb1555(c: u16) -> Rgba {
    [
        expand((c >> 10) & 0x1F, 0x1F),
        expand((c >> 5) & 0x1F, 0x1F),
        expand(c & 0x1F, 0x1F),
        if c & 0x8000 != 0 { 0xFF } else { 0 },
    ]
}

pub fn rgb565(c: u16) -> Rgba {
    [
        expand((c >> 11) & 0x1F, 0x1F),
        expand((c >> 5) & 0x3F, 0x3F),
        expand(c & 0x1F, 0x1F),
        0xFF,
    ]
}

pub fn argb4444(c: u16) -> Rgba {
    let nibble = |shift: u16| ((c >> shift) & 0xF) as u8 * 0x11;
    [nibble(8), nibble(4), nibble(0), nibble(12)]
}

pub fn rgb555(c: u16) -> Rgba {
    let [r, g, b, _] = argb1555(c);
    [r, g, b, 0xFF]
}

pub fn argb8888(c: u32) -> Rgba {
    let [b, g, r, a] = c.to_le_bytes();
    [r, g, b, a]
}

/// Word layout used by the BMP texture formats.
pub fn rgba8888(c: u32) -> Rgba {
    c.to_be_bytes()
}

/// Bump maps store a unit normal in spherical form: elevation `S` in the
/// high byte and azimuth `R` in the low byte.
pub fn bump(c: u16) -> Rgba {
    let s = (1.0 - f64::from(c >> 8) / 255.0) * FRAC_PI_2;
    let r = f64::from(c & 0xFF) / 255.0 * TAU;
    let to_byte = |v: f64| ((v + 1.0) * 0.5 * 255.0) as u8;
    [
        to_byte(s.sin() * r.cos()),
        to_byte(s.sin() * r.sin()),
        to_byte(s.cos()),
        0xFF,
    ]
}

/// Two horizontally adjacent YUV422 pixels. The first word carries `Y0`/`U`,
/// the second `Y1`/`V`.
pub fn yuv422_pair(first: u16, second: u16) -> [Rgba; 2] {
    let d = i32::from(first & 0xFF) - 128;
    let e = i32::from(second & 0xFF) - 128;
    let convert = |y: u16| {
        let c = i32::from(y) - 16;
        let clamp = |v: i32| v.clamp(0, 255) as u8;
        [
            clamp((298 * c + 409 * e + 128) >> 8),
            clamp((298 * c - 100 * d - 208 * e + 128) >> 8),
            clamp((298 * c + 516 * d + 128) >> 8),
            0xFF,
        ]
    };
    [convert(first >> 8), convert(second >> 8)]
}

/// Decode a single 16-bit (or, for ARGB8888, 32-bit) pixel value.
pub fn decode_pixel(format: PixelFormat, raw: u32) -> Result<Rgba, TextureError> {
    let half = raw as u16;
    Ok(match format {
        PixelFormat::Argb1555 => argb1555(half),
        PixelFormat::Rgb565 => rgb565(half),
        PixelFormat::Argb4444 => argb4444(half),
        PixelFormat::Rgb555 => rgb555(half),
        PixelFormat::Bump => bump(half),
        PixelFormat::Argb8888 => argb8888(raw),
        other => return Err(TextureError::UnsupportedPixelFormat(other.code())),
    })
}

const MACROBLOCK: usize = 16;
const MACROBLOCK_BYTES: usize = 64 * 6;

/// Decode planar YUV420 macroblocks into a row-major RGB raster.
///
/// Each 16x16 macroblock (in row-major order) holds an 8x8 U block, an 8x8 V
/// block and four 8x8 Y blocks (top-left, top-right, bottom-left,
/// bottom-right). Chroma covers 2x2 luma pixels.
pub fn yuv420_to_rgb(
    cursor: &mut ByteCursor<'_>,
    width: u16,
    height: u16,
) -> Result<Vec<Rgba>, TextureError> {
    let (w, h) = (usize::from(width), usize::from(height));
    if w % MACROBLOCK != 0 || h % MACROBLOCK != 0 {
        return Err(TextureError::InvalidDimensions {
            width,
            height,
            reason: "YUV420 needs dimensions divisible by 16",
        });
    }
    let columns = w / MACROBLOCK;
    let blocks = cursor.take(columns * (h / MACROBLOCK) * MACROBLOCK_BYTES)?;

    let mut pixels = Vec::with_capacity(w * h);
    for y in 0..h {
        for x in 0..w {
            let block = &blocks[((y / 16) * columns + x / 16) * MACROBLOCK_BYTES..];
            let (lx, ly) = (x % 16, y % 16);
            let chroma = (ly / 2) * 8 + lx / 2;
            let u = f64::from(block[chroma]) - 128.0;
            let v = f64::from(block[64 + chroma]) - 128.0;
            let quadrant = (ly / 8) * 2 + lx / 8;
            let luma = f64::from(block[128 + quadrant * 64 + (ly % 8) * 8 + lx % 8]);

            let clamp = |c: f64| c.round().clamp(0.0, 255.0) as u8;
            pixels.push([
                clamp(luma + 1.402 * v),
                clamp(luma - 0.344136 * u - 0.714136 * v),
                clamp(luma + 1.772 * u),
                0xFF,
            ]);
        }
    }
    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parser_utils::Endianness;

    #[test]
    fn test_argb1555() {
        assert_eq!(argb1555(0xFFFF), [255, 255, 255, 255]);
        assert_eq!(argb1555(0x7C00), [255, 0, 0, 0]);
        assert_eq!(argb1555(0x8010), [0, 0, 131, 255]);
    }

    #[test]
    fn test_rgb565() {
        assert_eq!(rgb565(0x07E0), [0, 255, 0, 255]);
        assert_eq!(rgb565(0x0020), [0, 4, 0, 255]);
    }

    #[test]
    fn test_argb4444() {
        assert_eq!(argb4444(0xF84C), [0x88, 0x44, 0xCC, 0xFF]);
    }

    #[test]
    fn test_argb8888_and_rgba8888() {
        assert_eq!(argb8888(0x80112233), [0x11, 0x22, 0x33, 0x80]);
        assert_eq!(rgba8888(0x11223380), [0x11, 0x22, 0x33, 0x80]);
    }

    #[test]
    fn test_bump_straight_up() {
        assert_eq!(bump(0xFF00), [127, 127, 255, 255]);
    }

    #[test]
    fn test_yuv422_gray() {
        let [a, b] = yuv422_pair(0x8080, 0x8080);
        assert_eq!(a, [130, 130, 130, 255]);
        assert_eq!(b, a);
        let [black, _] = yuv422_pair(0x1080, 0x1080);
        assert_eq!(black, [0, 0, 0, 255]);
    }

    #[test]
    fn test_decode_pixel_rejects_planar() {
        assert!(matches!(
            decode_pixel(PixelFormat::Yuv420, 0),
            Err(TextureError::UnsupportedPixelFormat(6))
        ));
    }

    #[test]
    fn test_yuv420_quadrants() {
        let mut block = vec![128u8; MACROBLOCK_BYTES];
        // Y blocks: TL=10, TR=20, BL=30, BR=40
        for (quadrant, luma) in [10u8, 20, 30, 40].into_iter().enumerate() {
            block[128 + quadrant * 64..192 + quadrant * 64].fill(luma);
        }
        let mut cursor = ByteCursor::new(&block, Endianness::Little);
        let pixels = yuv420_to_rgb(&mut cursor, 16, 16).unwrap();
        assert_eq!(pixels.len(), 256);
        assert_eq!(pixels[0], [10, 10, 10, 255]);
        assert_eq!(pixels[15], [20, 20, 20, 255]);
        assert_eq!(pixels[8 * 16], [30, 30, 30, 255]);
        assert_eq!(pixels[255], [40, 40, 40, 255]);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_yuv420_bad_dimensions() {
        let mut cursor = ByteCursor::new(&[], Endianness::Little);
        assert!(matches!(
            yuv420_to_rgb(&mut cursor, 8, 16),
            Err(TextureError::InvalidDimensions { .. })
        ));
    }
}
