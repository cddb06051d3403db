//! Single pass over a model's byte stream.
//!
//! Decoding and re-encoding both need to visit the same headers, strips and
//! inline vertices at the same offsets. [`walk_model`] performs that traversal
//! once and reports every element with its absolute offset to a
//! [`ModelVisitor`], so the two directions can never disagree about where a
//! field lives.

use std::collections::HashMap;

use tracing::{trace, warn};

use crate::data::parser_utils::{ByteCursor, Endianness, ParseError, resolve_relptr};

use super::ModelError;
use super::header::{
    Argb, GlobalFlags, IndexMode, IspTsp, MeshHeader, MeshParam, ModelHeader, ShadingMode,
    TexCtrl, Tsp,
};
use super::strip::{FaceStrip, StripFlags, VertexRef};
use super::vertex::{Vertex, is_back_reference, read_vertex};

/// Receives the elements of a model in stream order.
pub trait ModelVisitor {
    type Error: From<ModelError>;

    fn model_header(
        &mut self,
        header: &ModelHeader,
        endianness: Endianness,
    ) -> Result<(), Self::Error>;

    /// `offset` is where the 0x50-byte mesh header starts.
    fn begin_mesh(
        &mut self,
        mesh: usize,
        header: &MeshHeader,
        offset: usize,
    ) -> Result<(), Self::Error>;

    /// Called for every inline vertex with its index within the mesh and the
    /// offset of its position.
    fn inline_vertex(
        &mut self,
        mesh: usize,
        index: u32,
        offset: usize,
        vertex: Vertex,
    ) -> Result<(), Self::Error>;

    fn strip(&mut self, mesh: usize, strip: FaceStrip) -> Result<(), Self::Error>;

    fn end_mesh(&mut self, mesh: usize) -> Result<(), Self::Error>;
}

/// Read and validate the two magic words at the start of a model.
///
/// The words are tried little-endian first, then big-endian. On success the
/// cursor's endianness is set to the matching order. An unrecognized pair
/// leaves the cursor just past the 8 bytes it examined.
pub fn read_magic(
    cursor: &mut ByteCursor<'_>,
) -> Result<(IndexMode, u32, Endianness), ModelError> {
    let raw = cursor.take(8)?;
    let word = |endian: Endianness, at: usize| {
        endian.u32_from_bytes([raw[at], raw[at + 1], raw[at + 2], raw[at + 3]])
    };

    for endian in [Endianness::Little, Endianness::Big] {
        let (mode, flags) = (word(endian, 0), word(endian, 4));
        if let Some(index_mode) = IndexMode::from_word(mode)
            && GlobalFlags::KNOWN_WORDS.contains(&flags)
        {
            cursor.set_endianness(endian);
            return Ok((index_mode, flags, endian));
        }
    }

    Err(ModelError::UnsupportedModelFormat {
        magic: [word(Endianness::Little, 0), word(Endianness::Little, 4)],
    })
}

fn read_mesh_header(cursor: &mut ByteCursor<'_>) -> Result<MeshHeader, ParseError> {
    let param = MeshParam::from_word(cursor.u32()?);
    let isp_tsp = IspTsp::from_word(cursor.u32()?);
    let tsp = Tsp::from_word(cursor.u32()?);
    let tex_ctrl = TexCtrl::from_word(cursor.u32()?);
    let centroid = cursor.vec3()?;
    let bound_radius = cursor.f32()?;
    let texture_id = cursor.i32()?;
    let shading = ShadingMode::from_raw(cursor.i32()?);
    let ambient = cursor.f32()?;
    let mut color = || -> Result<Argb, ParseError> {
        Ok(Argb::from_array([
            cursor.f32()?,
            cursor.f32()?,
            cursor.f32()?,
            cursor.f32()?,
        ]))
    };
    let base_color = color()?;
    let offset_color = color()?;
    Ok(MeshHeader {
        param,
        isp_tsp,
        tsp,
        tex_ctrl,
        centroid,
        bound_radius,
        texture_id,
        shading,
        ambient,
        base_color,
        offset_color,
        mesh_size: cursor.u32()?,
    })
}

/// Walk `data` as a model, feeding every element to `visitor`.
///
/// Values are reported exactly as stored; no axis transform is applied.
/// Returns the detected byte order.
pub fn walk_model<V: ModelVisitor>(data: &[u8], visitor: &mut V) -> Result<Endianness, V::Error> {
    let mut cursor = ByteCursor::new(data, Endianness::Little);
    let (index_mode, flags_word, endianness) = read_magic(&mut cursor)?;
    let header = ModelHeader {
        index_mode,
        flags: GlobalFlags::from_word(flags_word),
        object_centroid: cursor.vec3().map_err(ModelError::from)?,
        object_bound_radius: cursor.f32().map_err(ModelError::from)?,
    };
    visitor.model_header(&header, endianness)?;

    let mut mesh = 0;
    loop {
        if cursor.remaining() < 4 {
            warn!(
                offset = cursor.position(),
                meshes = mesh,
                "model ends without a terminator word"
            );
            break;
        }
        if cursor.peek_u32().map_err(ModelError::from)? == 0 {
            break;
        }

        let header_offset = cursor.position();
        let header = read_mesh_header(&mut cursor).map_err(ModelError::from)?;
        let mesh_end = cursor.position().saturating_add(header.mesh_size as usize);
        trace!(
            mesh,
            offset = header_offset,
            size = header.mesh_size,
            shading = header.shading.raw(),
            "mesh header"
        );
        visitor.begin_mesh(mesh, &header, header_offset)?;

        let layout = header.shading.layout();
        let mut inline_at: HashMap<usize, u32> = HashMap::new();
        while cursor.position() < mesh_end {
            let flags = StripFlags::from_word(cursor.u32().map_err(ModelError::from)?);
            let face_count = cursor.u32().map_err(ModelError::from)?;
            let count = flags.vertex_count(face_count);
            let mut vertices = Vec::with_capacity(count.min(cursor.remaining() / 8));

            for _ in 0..count {
                let offset = cursor.position();
                if is_back_reference(cursor.peek_u32().map_err(ModelError::from)?) {
                    cursor.skip(4).map_err(ModelError::from)?;
                    let rel = cursor.i32().map_err(ModelError::from)?;
                    let target = resolve_relptr(cursor.position(), i64::from(rel));
                    let resolved = target.and_then(|t| Some((t, *inline_at.get(&t)?)));
                    let Some((target, index)) = resolved else {
                        return Err(ModelError::DanglingBackReference {
                            mesh,
                            offset,
                            target: cursor.position() as i64 + i64::from(rel),
                        }
                        .into());
                    };
                    vertices.push(VertexRef::BackReference { index, target });
                } else {
                    let vertex = read_vertex(&mut cursor, layout).map_err(ModelError::from)?;
                    let index = inline_at.len() as u32;
                    inline_at.insert(offset, index);
                    visitor.inline_vertex(mesh, index, offset, vertex)?;
                    vertices.push(VertexRef::Inline(index));
                }
            }

            visitor.strip(
                mesh,
                FaceStrip {
                    flags,
                    face_count,
                    vertices,
                },
            )?;
        }
        visitor.end_mesh(mesh)?;
        mesh += 1;
    }

    Ok(endianness)
}
