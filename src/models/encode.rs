//! Write edited model values back over the original file bytes.
//!
//! Encoding never changes the layout of a model: no mesh, strip or vertex is
//! added or removed, mesh size fields are left alone and the output is always
//! exactly as long as the input. The original stream is walked again and every
//! editable field is patched at the offset it was read from.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rootcause::Report;
use thiserror::Error;
use tracing::{debug, info};

use crate::data::parser_utils::Endianness;
use crate::data::provenance::{Provenance, crc32_bytes, file_name_of};

use super::ModelError;
use super::decode::{DecodeOptions, NaomiModel};
use super::header::{GlobalFlags, MeshHeader, ModelHeader};
use super::strip::FaceStrip;
use super::transform::AxisTransform;
use super::vertex::{
    Vertex, VertexAttributes, color_offsets, is_back_reference, rgba_to_bgra, uv_offset,
};
use super::walk::{ModelVisitor, walk_model};

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error(
        "target '{found_name}' does not match the recorded source '{expected_name}' (crc32 {expected_crc:08X}, target crc32 {found_crc:08X?})"
    )]
    IdentityMismatch {
        expected_name: String,
        expected_crc: u32,
        found_name: String,
        /// Not computed when the names already differ.
        found_crc: Option<u32>,
    },
    #[error("model does not match the layout of the target file: {detail}")]
    ModelShapeMismatch { detail: String },
    #[error("mesh {mesh} vertex {vertex}: position X encodes as a back-reference marker")]
    PositionCollidesWithMarker { mesh: usize, vertex: u32 },
    #[error("global flags 0x{0:02X} do not form a valid model magic")]
    UnsupportedFlags(u32),
    #[error("target file is not a valid model: {0}")]
    Model(#[from] ModelError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn shape_mismatch(detail: String) -> EncodeError {
    EncodeError::ModelShapeMismatch { detail }
}

// Field offsets inside the model header and a mesh header.
const MAGIC_INDEX_MODE: usize = 0x00;
const MAGIC_FLAGS: usize = 0x04;
const OBJECT_CENTROID: usize = 0x08;
const OBJECT_RADIUS: usize = 0x14;
const MESH_PARAM: usize = 0x00;
const MESH_ISP_TSP: usize = 0x04;
const MESH_TSP: usize = 0x08;
const MESH_TEX_CTRL: usize = 0x0C;
const MESH_CENTROID: usize = 0x10;
const MESH_RADIUS: usize = 0x1C;
const MESH_TEXTURE_ID: usize = 0x20;
const MESH_SHADING: usize = 0x24;
const MESH_AMBIENT: usize = 0x28;
const MESH_BASE_COLOR: usize = 0x2C;
const MESH_OFFSET_COLOR: usize = 0x3C;

/// Collects word writes while the original stream is walked.
struct PatchVisitor<'a> {
    original: &'a [u8],
    model: &'a NaomiModel,
    transform: AxisTransform,
    endianness: Endianness,
    patches: Vec<(usize, u32)>,
    meshes_seen: usize,
    inline_seen: usize,
}

impl PatchVisitor<'_> {
    fn word_at(&self, offset: usize) -> u32 {
        let mut bytes = [0; 4];
        if let Some(src) = self.original.get(offset..offset + 4) {
            bytes.copy_from_slice(src);
        }
        self.endianness.u32_from_bytes(bytes)
    }

    fn put(&mut self, offset: usize, value: u32) {
        self.patches.push((offset, value));
    }

    fn put_f32(&mut self, offset: usize, value: f32) {
        self.put(offset, value.to_bits());
    }

    fn put_vec(&mut self, offset: usize, values: &[f32]) {
        for (i, &v) in values.iter().enumerate() {
            self.put_f32(offset + i * 4, v);
        }
    }

    /// Read-modify-write a packed word so that bits without a named field
    /// keep their original value.
    fn repack(&mut self, offset: usize, pack: impl FnOnce(&mut u32)) {
        let mut word = self.word_at(offset);
        pack(&mut word);
        self.put(offset, word);
    }

    fn apply(&self) -> Vec<u8> {
        let mut out = self.original.to_vec();
        for &(offset, value) in &self.patches {
            out[offset..offset + 4].copy_from_slice(&self.endianness.u32_bytes(value));
        }
        out
    }
}

impl ModelVisitor for PatchVisitor<'_> {
    type Error = EncodeError;

    fn model_header(&mut self, _: &ModelHeader, endianness: Endianness) -> Result<(), EncodeError> {
        self.endianness = endianness;
        let header = &self.model.header;
        let index_mode = header.index_mode.bits();
        let flags = header.flags;
        let centroid = self.transform.invert(header.object_centroid);
        let radius = header.object_bound_radius;

        self.repack(MAGIC_INDEX_MODE, |w| *w = (*w & !0xFF) | index_mode);
        let mut flags_word = self.word_at(MAGIC_FLAGS);
        flags.pack_into(&mut flags_word);
        if !GlobalFlags::KNOWN_WORDS.contains(&flags_word) {
            return Err(EncodeError::UnsupportedFlags(flags_word));
        }
        self.put(MAGIC_FLAGS, flags_word);
        self.put_vec(OBJECT_CENTROID, &centroid);
        self.put_f32(OBJECT_RADIUS, radius);
        Ok(())
    }

    fn begin_mesh(&mut self, index: usize, original: &MeshHeader, at: usize) -> Result<(), EncodeError> {
        let Some(mesh) = self.model.meshes.get(index) else {
            return Err(shape_mismatch(format!(
                "target has more than {} meshes",
                self.model.meshes.len()
            )));
        };
        let (layout, target_layout) = (mesh.layout(), original.shading.layout());
        if layout != target_layout {
            return Err(shape_mismatch(format!(
                "mesh {index} uses {layout:?} vertices, target uses {target_layout:?}"
            )));
        }

        let h = mesh.header.clone();
        self.repack(at + MESH_PARAM, |w| h.param.pack_into(w));
        self.repack(at + MESH_ISP_TSP, |w| h.isp_tsp.pack_into(w));
        self.repack(at + MESH_TSP, |w| h.tsp.pack_into(w));
        self.repack(at + MESH_TEX_CTRL, |w| h.tex_ctrl.pack_into(w));
        self.put_vec(at + MESH_CENTROID, &self.transform.invert(h.centroid));
        self.put_f32(at + MESH_RADIUS, h.bound_radius);
        self.put(at + MESH_TEXTURE_ID, h.texture_id as u32);
        self.put(at + MESH_SHADING, h.shading.raw() as u32);
        self.put_f32(at + MESH_AMBIENT, h.ambient);
        self.put_vec(at + MESH_BASE_COLOR, &h.base_color.to_array());
        self.put_vec(at + MESH_OFFSET_COLOR, &h.offset_color.to_array());

        self.meshes_seen = index + 1;
        self.inline_seen = 0;
        Ok(())
    }

    fn inline_vertex(
        &mut self,
        mesh: usize,
        index: u32,
        at: usize,
        original: Vertex,
    ) -> Result<(), EncodeError> {
        let model = self.model;
        let Some(vertex) = model.meshes[mesh].vertices.get(index as usize) else {
            return Err(shape_mismatch(format!(
                "mesh {mesh} has {} vertices, target has more",
                model.meshes[mesh].vertices.len()
            )));
        };
        let layout = original.attributes.layout();
        if vertex.attributes.layout() != layout {
            return Err(shape_mismatch(format!(
                "mesh {mesh} vertex {index} is not a {layout:?} vertex"
            )));
        }

        let [x, y, z] = self.transform.invert(vertex.position);
        let x_bits = x.to_bits() | 1;
        if is_back_reference(x_bits) {
            return Err(EncodeError::PositionCollidesWithMarker { mesh, vertex: index });
        }
        self.put(at, x_bits);
        self.put_f32(at + 4, y);
        self.put_f32(at + 8, z);

        if let (
            Some([base_at, offset_at]),
            VertexAttributes::Colored {
                base_color,
                offset_color,
                ..
            },
        ) = (color_offsets(layout), &vertex.attributes)
        {
            self.put(at + base_at, rgba_to_bgra(*base_color));
            self.put(at + offset_at, rgba_to_bgra(*offset_color));
        }
        let uv_at = at + uv_offset(layout);
        self.put_vec(uv_at, &vertex.uv);

        self.inline_seen += 1;
        Ok(())
    }

    fn strip(&mut self, _: usize, _: FaceStrip) -> Result<(), EncodeError> {
        Ok(())
    }

    fn end_mesh(&mut self, mesh: usize) -> Result<(), EncodeError> {
        let expected = self.model.meshes[mesh].vertices.len();
        if self.inline_seen != expected {
            return Err(shape_mismatch(format!(
                "mesh {mesh} has {expected} vertices, target has {}",
                self.inline_seen
            )));
        }
        Ok(())
    }
}

/// Patch `model`'s editable values into a copy of `original`.
///
/// `transform` must be the transform the model was decoded with. Nothing is
/// produced unless the whole model matches the layout of `original`.
pub fn encode_model(
    original: &[u8],
    model: &NaomiModel,
    transform: AxisTransform,
) -> Result<Vec<u8>, Report<EncodeError>> {
    let mut visitor = PatchVisitor {
        original,
        model,
        transform,
        endianness: Endianness::Little,
        patches: Vec::new(),
        meshes_seen: 0,
        inline_seen: 0,
    };
    walk_model(original, &mut visitor).map_err(Report::new)?;
    if visitor.meshes_seen != model.meshes.len() {
        return Err(Report::new(shape_mismatch(format!(
            "model has {} meshes, target has {}",
            model.meshes.len(),
            visitor.meshes_seen
        ))));
    }
    debug!(patches = visitor.patches.len(), "encoded model");
    Ok(visitor.apply())
}

/// Re-encode `model` into the file at `path`.
///
/// The file must be the one the model was decoded from: its name and CRC-32
/// are checked against `provenance` before anything is written. The checked
/// bytes are the ones patched, and the result goes to a sibling file that is
/// renamed over `path`, so a failed write leaves the target untouched.
pub fn write_model(
    path: &Path,
    provenance: &Provenance,
    model: &NaomiModel,
    options: &DecodeOptions,
) -> Result<(), Report<EncodeError>> {
    let mismatch = |found_crc| EncodeError::IdentityMismatch {
        expected_name: provenance.file_name.clone(),
        expected_crc: provenance.crc32,
        found_name: file_name_of(path),
        found_crc,
    };
    if file_name_of(path) != provenance.file_name {
        return Err(Report::new(mismatch(None)));
    }
    let original = fs::read(path).map_err(|e| Report::new(EncodeError::Io(e)))?;
    let crc = crc32_bytes(&original);
    if crc != provenance.crc32 {
        return Err(Report::new(mismatch(Some(crc))));
    }

    let encoded = encode_model(&original, model, options.transform)?;

    let tmp_path = staging_path(path);
    if let Err(e) = write_staged(&tmp_path, path, &encoded) {
        let _ = fs::remove_file(&tmp_path);
        return Err(Report::new(EncodeError::Io(e)));
    }
    info!(path = %path.display(), bytes = encoded.len(), "wrote model");
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    path.with_file_name(format!("{}.tmp", file_name_of(path)))
}

fn write_staged(tmp_path: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    {
        let mut file = File::create(tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    #[cfg(windows)]
    {
        // Windows rename fails if the destination exists.
        fs::remove_file(path)?;
    }

    fs::rename(tmp_path, path)
}
