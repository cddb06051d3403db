//! Face strips and their triangulation.

use itertools::Itertools;

use crate::data::bitfield::{extract, flag};

field_enum! {
    /// Culling bits of a strip word.
    StripCulling: 2 {
        Unused => "Unused",
        DoubleSided => "Double Sided",
        Clockwise => "Clockwise",
        CounterClockwise => "Counter Clockwise",
    }
}

/// The strip control word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StripFlags {
    pub culling: StripCulling,
    pub quad: bool,
    pub triangle_list: bool,
    pub strip: bool,
    pub super_index: bool,
    pub gouraud: bool,
    pub suppress_global_params: bool,
    pub env_mapping: bool,
}

impl StripFlags {
    pub fn from_word(w: u32) -> Self {
        Self {
            culling: StripCulling::from_bits(extract(w, 0, 2)),
            quad: flag(w, 2),
            triangle_list: flag(w, 3),
            strip: flag(w, 4),
            super_index: flag(w, 5),
            gouraud: flag(w, 6),
            suppress_global_params: flag(w, 7),
            env_mapping: flag(w, 8),
        }
    }

    /// Number of vertex slots that follow a strip with `face_count` faces.
    pub fn vertex_count(&self, face_count: u32) -> usize {
        let faces = face_count as usize;
        if self.triangle_list { faces * 3 } else { faces }
    }

    /// Culling modes 2 and 3 hide back faces.
    pub fn culls_backfaces(&self) -> bool {
        matches!(
            self.culling,
            StripCulling::Clockwise | StripCulling::CounterClockwise
        )
    }
}

/// One vertex slot of a strip, as an index into the mesh's inline vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VertexRef {
    Inline(u32),
    /// `target` is the absolute file offset the reference resolved to.
    BackReference { index: u32, target: usize },
}

impl VertexRef {
    pub fn index(self) -> u32 {
        match self {
            VertexRef::Inline(index) | VertexRef::BackReference { index, .. } => index,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FaceStrip {
    pub flags: StripFlags,
    pub face_count: u32,
    pub vertices: Vec<VertexRef>,
}

impl FaceStrip {
    /// Triangles of this strip with winding normalized for its culling mode.
    ///
    /// Triangle lists take vertices three at a time. Strips emit one triangle
    /// per vertex after the second, alternating winding; fewer than three
    /// vertices yield nothing.
    pub fn triangles(&self) -> Vec<[u32; 3]> {
        let clockwise = self.flags.culling == StripCulling::Clockwise;
        let indices = self.vertices.iter().map(|v| v.index());
        if self.flags.triangle_list {
            indices
                .tuples()
                .map(|(a, b, c)| if clockwise { [b, a, c] } else { [a, b, c] })
                .collect()
        } else {
            indices
                .tuple_windows()
                .enumerate()
                .map(|(j, (a, b, c))| {
                    if (j % 2 == 0) == clockwise {
                        [b, a, c]
                    } else {
                        [a, b, c]
                    }
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(word: u32, indices: &[u32]) -> FaceStrip {
        FaceStrip {
            flags: StripFlags::from_word(word),
            face_count: indices.len() as u32,
            vertices: indices.iter().map(|&i| VertexRef::Inline(i)).collect(),
        }
    }

    #[test]
    fn test_flag_bits() {
        let flags = StripFlags::from_word(0x1_5A);
        assert_eq!(flags.culling, StripCulling::Clockwise);
        assert!(flags.triangle_list);
        assert!(flags.strip);
        assert!(flags.gouraud);
        assert!(flags.env_mapping);
        assert!(!flags.quad);
        assert!(!flags.super_index);
        assert!(!flags.suppress_global_params);
        assert_eq!(flags.vertex_count(2), 6);
        assert_eq!(StripFlags::from_word(0x10).vertex_count(5), 5);
    }

    #[test]
    fn test_clockwise_triangle_list() {
        let s = strip(0x0A, &[0, 1, 2]);
        assert_eq!(s.triangles(), vec![[1, 0, 2]]);
        let s = strip(0x0B, &[0, 1, 2, 3, 4, 5]);
        assert_eq!(s.triangles(), vec![[0, 1, 2], [3, 4, 5]]);
    }

    #[test]
    fn test_strip_alternates_winding() {
        let ccw = strip(0x13, &[0, 1, 2, 3, 4]);
        assert_eq!(ccw.triangles(), vec![[0, 1, 2], [2, 1, 3], [2, 3, 4]]);
        let cw = strip(0x12, &[0, 1, 2, 3]);
        assert_eq!(cw.triangles(), vec![[1, 0, 2], [1, 2, 3]]);
    }

    #[test]
    fn test_short_strip_is_empty() {
        assert!(strip(0x10, &[0, 1]).triangles().is_empty());
        assert!(strip(0x10, &[]).triangles().is_empty());
    }

    #[test]
    fn test_back_references_triangulate_by_index() {
        let mut s = strip(0x10, &[0, 1]);
        s.vertices.push(VertexRef::BackReference {
            index: 0,
            target: 0x68,
        });
        assert_eq!(s.triangles(), vec![[0, 1, 0]]);
    }

    #[test]
    fn test_backface_modes() {
        assert!(StripFlags::from_word(2).culls_backfaces());
        assert!(StripFlags::from_word(3).culls_backfaces());
        assert!(!StripFlags::from_word(1).culls_backfaces());
    }
}
