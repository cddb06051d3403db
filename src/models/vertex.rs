//! Inline vertex payloads and back-reference detection.

use crate::data::parser_utils::{ByteCursor, ParseError};

use super::header::VertexLayout;

/// Lowest word that marks a back-reference instead of an inline position.
pub const BACK_REFERENCE_MIN: u32 = 0x5FF0_0000;
pub const BACK_REFERENCE_MAX: u32 = 0x5FFF_FFFF;

/// True if `word` (the first word of a vertex slot) introduces a back-reference.
pub fn is_back_reference(word: u32) -> bool {
    (BACK_REFERENCE_MIN..=BACK_REFERENCE_MAX).contains(&word)
}

/// Convert a packed signed normal component to -1.0..=1.0.
pub fn sint8_to_float(v: i8) -> f32 {
    if v < 0 {
        f32::from(v) / 128.0
    } else {
        f32::from(v) / 127.0
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VertexAttributes {
    Lit {
        normal: [f32; 3],
    },
    /// Colours are stored in the file as little-endian B, G, R, A bytes and
    /// kept here as RGBA.
    Colored {
        normal: [i8; 3],
        pad: u8,
        base_color: [u8; 4],
        offset_color: [u8; 4],
    },
    Bumped {
        normal: [f32; 3],
        bump: [[f32; 3]; 2],
    },
}

impl VertexAttributes {
    pub fn layout(&self) -> VertexLayout {
        match self {
            VertexAttributes::Lit { .. } => VertexLayout::Lit,
            VertexAttributes::Colored { .. } => VertexLayout::Colored,
            VertexAttributes::Bumped { .. } => VertexLayout::Bumped,
        }
    }

    /// Unit-range normal regardless of how it is stored.
    pub fn normal(&self) -> [f32; 3] {
        match self {
            VertexAttributes::Lit { normal } | VertexAttributes::Bumped { normal, .. } => *normal,
            VertexAttributes::Colored { normal, .. } => normal.map(sint8_to_float),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vertex {
    pub position: [f32; 3],
    pub attributes: VertexAttributes,
    pub uv: [f32; 2],
}

/// Byte offsets of the editable fields within an inline vertex.
pub(crate) fn color_offsets(layout: VertexLayout) -> Option<[usize; 2]> {
    matches!(layout, VertexLayout::Colored).then_some([16, 20])
}

pub(crate) fn uv_offset(layout: VertexLayout) -> usize {
    layout.stride() - 8
}

fn bgra_to_rgba(word: u32) -> [u8; 4] {
    let [b, g, r, a] = word.to_le_bytes();
    [r, g, b, a]
}

pub(crate) fn rgba_to_bgra(rgba: [u8; 4]) -> u32 {
    let [r, g, b, a] = rgba;
    u32::from_le_bytes([b, g, r, a])
}

/// Read an inline vertex of `layout` at the cursor.
pub fn read_vertex(cursor: &mut ByteCursor<'_>, layout: VertexLayout) -> Result<Vertex, ParseError> {
    let position = cursor.vec3()?;
    let attributes = match layout {
        VertexLayout::Lit => VertexAttributes::Lit {
            normal: cursor.vec3()?,
        },
        VertexLayout::Colored => {
            let [nx, ny, nz, pad] = cursor.u32()?.to_le_bytes();
            VertexAttributes::Colored {
                normal: [nx as i8, ny as i8, nz as i8],
                pad,
                base_color: bgra_to_rgba(cursor.u32()?),
                offset_color: bgra_to_rgba(cursor.u32()?),
            }
        }
        VertexLayout::Bumped => VertexAttributes::Bumped {
            normal: cursor.vec3()?,
            bump: [cursor.vec3()?, cursor.vec3()?],
        },
    };
    let uv = [cursor.f32()?, cursor.f32()?];
    Ok(Vertex {
        position,
        attributes,
        uv,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parser_utils::Endianness;

    #[test]
    fn test_back_reference_range() {
        assert!(is_back_reference(0x5FF0_0000));
        assert!(is_back_reference(0x5FFF_FFFF));
        assert!(!is_back_reference(0x5FEF_FFFF));
        assert!(!is_back_reference(0x6000_0000));
        assert!(!is_back_reference(1.0f32.to_bits()));
    }

    #[test]
    fn test_sint8_to_float() {
        assert_eq!(sint8_to_float(-128), -1.0);
        assert_eq!(sint8_to_float(127), 1.0);
        assert_eq!(sint8_to_float(0), 0.0);
        assert_eq!(sint8_to_float(-64), -0.5);
    }

    #[test]
    fn test_colored_payload() {
        let mut data = Vec::new();
        for v in [1.0f32, 2.0, 3.0] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&[0x7F, 0x80, 0x00, 0xAA]);
        data.extend_from_slice(&[0x30, 0x20, 0x10, 0xFF]);
        data.extend_from_slice(&[0x03, 0x02, 0x01, 0x80]);
        for v in [0.25f32, 0.75] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(data.len(), VertexLayout::Colored.stride());

        let mut cursor = ByteCursor::new(&data, Endianness::Little);
        let vertex = read_vertex(&mut cursor, VertexLayout::Colored).unwrap();
        assert_eq!(vertex.position, [1.0, 2.0, 3.0]);
        assert_eq!(vertex.uv, [0.25, 0.75]);
        assert_eq!(
            vertex.attributes,
            VertexAttributes::Colored {
                normal: [127, -128, 0],
                pad: 0xAA,
                base_color: [0x10, 0x20, 0x30, 0xFF],
                offset_color: [0x01, 0x02, 0x03, 0x80],
            }
        );
        assert_eq!(vertex.attributes.normal(), [1.0, -1.0, 0.0]);
        assert_eq!(rgba_to_bgra([0x10, 0x20, 0x30, 0xFF]), 0xFF10_2030);
    }

    #[test]
    fn test_strides_match_payloads() {
        for layout in [VertexLayout::Lit, VertexLayout::Colored, VertexLayout::Bumped] {
            let data = vec![0u8; layout.stride()];
            let mut cursor = ByteCursor::new(&data, Endianness::Big);
            let vertex = read_vertex(&mut cursor, layout).unwrap();
            assert_eq!(cursor.remaining(), 0);
            assert_eq!(vertex.attributes.layout(), layout);
            assert_eq!(uv_offset(layout) + 8, layout.stride());
        }
    }
}
