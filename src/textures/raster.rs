/// An RGBA8 pixel.
pub type Rgba = [u8; 4];

/// Palette of RGB colours (alpha is not stored in PVP palettes).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Palette {
    pub colors: Vec<[u8; 3]>,
}

/// Size of an Adobe colour table: 256 RGB triples.
pub const ACT_LEN: usize = 768;

impl Palette {
    /// Identity grayscale ramp used when no palette file is supplied.
    pub fn grayscale(entries: usize) -> Self {
        let step = if entries <= 16 { 17 } else { 1 };
        Self {
            colors: (0..entries)
                .map(|i| {
                    let v = (i * step).min(255) as u8;
                    [v, v, v]
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Colour for `index`; indices past the end of the palette read as black.
    pub fn color(&self, index: u8) -> Rgba {
        match self.colors.get(index as usize) {
            Some(&[r, g, b]) => [r, g, b, 0xFF],
            None => [0, 0, 0, 0xFF],
        }
    }

    /// Serialize as a 768-byte `.act` colour table, zero padded.
    pub fn to_act_bytes(&self) -> Vec<u8> {
        let mut out: Vec<u8> = self.colors.iter().flatten().copied().collect();
        out.resize(ACT_LEN, 0);
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RasterPixels {
    Rgba(Vec<Rgba>),
    /// One palette index per pixel (4bpp textures are widened to a byte per pixel).
    Indexed { indices: Vec<u8>, palette: Palette },
}

/// A decoded, row-major image.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub pixels: RasterPixels,
}

impl Raster {
    pub fn rgba(width: u32, height: u32, pixels: Vec<Rgba>) -> Self {
        Self {
            width,
            height,
            pixels: RasterPixels::Rgba(pixels),
        }
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self.pixels, RasterPixels::Indexed { .. })
    }

    pub fn palette(&self) -> Option<&Palette> {
        match &self.pixels {
            RasterPixels::Indexed { palette, .. } => Some(palette),
            RasterPixels::Rgba(_) => None,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) as usize;
        match &self.pixels {
            RasterPixels::Rgba(pixels) => pixels.get(i).copied(),
            RasterPixels::Indexed { indices, palette } => {
                indices.get(i).map(|&idx| palette.color(idx))
            }
        }
    }

    /// Expand to RGBA8, resolving palette indices.
    pub fn to_rgba(&self) -> Vec<Rgba> {
        match &self.pixels {
            RasterPixels::Rgba(pixels) => pixels.clone(),
            RasterPixels::Indexed { indices, palette } => {
                indices.iter().map(|&idx| palette.color(idx)).collect()
            }
        }
    }

    pub fn flip_vertical(&mut self) {
        let width = self.width as usize;
        match &mut self.pixels {
            RasterPixels::Rgba(pixels) => flip_rows(pixels, width),
            RasterPixels::Indexed { indices, .. } => flip_rows(indices, width),
        }
    }

    pub fn flip_horizontal(&mut self) {
        let width = self.width as usize;
        match &mut self.pixels {
            RasterPixels::Rgba(pixels) => mirror_rows(pixels, width),
            RasterPixels::Indexed { indices, .. } => mirror_rows(indices, width),
        }
    }
}

fn flip_rows<T>(data: &mut [T], width: usize) {
    if width == 0 {
        return;
    }
    let rows = data.len() / width;
    for row in 0..rows / 2 {
        let (top, bottom) = data.split_at_mut((rows - 1 - row) * width);
        top[row * width..(row + 1) * width].swap_with_slice(&mut bottom[..width]);
    }
}

fn mirror_rows<T>(data: &mut [T], width: usize) {
    if width == 0 {
        return;
    }
    for row in data.chunks_mut(width) {
        row.reverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(v: u8) -> Rgba {
        [v, v, v, 255]
    }

    #[test]
    fn test_grayscale_palettes() {
        let p16 = Palette::grayscale(16);
        assert_eq!(p16.colors[15], [255, 255, 255]);
        assert_eq!(p16.colors[1], [17, 17, 17]);
        let p256 = Palette::grayscale(256);
        assert_eq!(p256.colors[200], [200, 200, 200]);
    }

    #[test]
    fn test_act_padding() {
        let act = Palette::grayscale(16).to_act_bytes();
        assert_eq!(act.len(), ACT_LEN);
        assert_eq!(&act[3..6], &[17, 17, 17]);
        assert!(act[48..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_flips() {
        let mut raster = Raster::rgba(2, 3, (0..6).map(gray).collect());
        raster.flip_vertical();
        assert_eq!(
            raster.to_rgba(),
            vec![gray(4), gray(5), gray(2), gray(3), gray(0), gray(1)]
        );
        raster.flip_horizontal();
        assert_eq!(raster.pixel(0, 0), Some(gray(5)));
        assert_eq!(raster.pixel(1, 2), Some(gray(0)));
        assert_eq!(raster.pixel(2, 0), None);
    }

    #[test]
    fn test_indexed_resolves_through_palette() {
        let raster = Raster {
            width: 2,
            height: 1,
            pixels: RasterPixels::Indexed {
                indices: vec![1, 0],
                palette: Palette {
                    colors: vec![[1, 2, 3], [4, 5, 6]],
                },
            },
        };
        assert_eq!(raster.to_rgba(), vec![[4, 5, 6, 255], [1, 2, 3, 255]]);
    }
}
