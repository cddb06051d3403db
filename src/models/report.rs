//! Human-readable dump of a decoded model's headers.

use std::fmt::{self, Display, Formatter};

use super::decode::{Mesh, NaomiModel};
use super::header::{Argb, FormatRevision, ShadingMode};

fn yes_no(v: bool) -> &'static str {
    if v { "Yes" } else { "No " }
}

fn bit(f: &mut Formatter<'_>, bits: &str, name: &str, value: bool) -> fmt::Result {
    writeln!(f, "{bits:<9}| {name:<24}:[{}] {}", u8::from(value), yes_no(value))
}

fn field(f: &mut Formatter<'_>, bits: &str, name: &str, raw: u32, label: impl Display) -> fmt::Result {
    writeln!(f, "{bits:<9}| {name:<24}:[{raw}] {label}")
}

fn section(f: &mut Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f, "\n-----{title}-----")
}

fn argb(f: &mut Formatter<'_>, color: &Argb) -> fmt::Result {
    writeln!(f, "Alpha: {}", color.a)?;
    writeln!(f, "Red  : {}", color.r)?;
    writeln!(f, "Green: {}", color.g)?;
    writeln!(f, "Blue : {}", color.b)
}

/// Renders every header field of a model with its bit range and meaning.
pub struct ModelReport<'a> {
    pub model: &'a NaomiModel,
    pub revision: FormatRevision,
}

impl<'a> ModelReport<'a> {
    pub fn new(model: &'a NaomiModel, revision: FormatRevision) -> Self {
        Self { model, revision }
    }

    fn mesh(&self, f: &mut Formatter<'_>, index: usize, mesh: &Mesh) -> fmt::Result {
        let h = &mesh.header;
        writeln!(f, "\n-----------------------------")?;
        writeln!(f, "     Mesh {index} Header")?;
        writeln!(f, "-----------------------------")?;

        let p = &h.param;
        section(f, "Mesh_Param_Flags")?;
        bit(f, "bit0", "16 bit U/V", p.uv_16bit)?;
        bit(f, "bit1", "Gouraud", p.gouraud)?;
        bit(f, "bit2", "Color Offset", p.offset_color)?;
        bit(f, "bit3", "Texture", p.texture)?;
        field(f, "bit4-5", "Color Type", p.color_type.bits(), p.color_type)?;
        bit(f, "bit6", "Use Volume", p.volume)?;
        bit(f, "bit7", "Use Shadow", p.shadow)?;
        field(f, "bit16-17", "User Clip", p.user_clip.bits(), p.user_clip)?;
        field(f, "bit18-19", "Strip Length", p.strip_len.bits(), p.strip_len)?;
        bit(f, "bit23", "Group Enable", p.group_enable)?;
        field(f, "bit24-26", "List Type", p.list_type.bits(), p.list_type)?;
        bit(f, "bit28", "End Of Strip", p.end_of_strip)?;
        field(f, "bit29-31", "Para Type", p.param_type.bits(), p.param_type)?;

        let i = &h.isp_tsp;
        section(f, "Mesh_ISP_TSP")?;
        bit(f, "bit20", "DcalcCtrl", i.d_calc_ctrl)?;
        bit(f, "bit21", "CacheBypass", i.cache_bypass)?;
        bit(f, "bit22", "16bit_UV2", i.uv2_16bit)?;
        bit(f, "bit23", "Gouraud2", i.gouraud2)?;
        bit(f, "bit24", "Offset2", i.offset2)?;
        bit(f, "bit25", "Texture2", i.texture2)?;
        bit(f, "bit26", "ZWriteDisable", i.z_write_disable)?;
        field(f, "bit27-28", "CullingMode", i.culling.bits(), i.culling)?;
        field(f, "bit29-31", "DepthCompareMode", i.depth_compare.bits(), i.depth_compare)?;

        let t = &h.tsp;
        section(f, "Mesh_TSP")?;
        field(f, "bit0-2", "Texture V Size (Height)", t.texture_v_size.bits(), t.texture_v_size)?;
        field(f, "bit3-5", "Texture U Size (Width)", t.texture_u_size.bits(), t.texture_u_size)?;
        field(f, "bit6-7", "Texture / Shading", t.texture_shading.bits(), t.texture_shading)?;
        let d_adjust = match t.mipmap_d_adjust.factor() {
            Some(factor) => format!("{factor:.2}"),
            None => "Illegal".to_string(),
        };
        field(f, "bit8-11", "Mipmap D Adjust", u32::from(t.mipmap_d_adjust.0), d_adjust)?;
        bit(f, "bit12", "Super Sampling", t.super_sample)?;
        field(f, "bit13-14", "Filter", t.filter.bits(), t.filter)?;
        field(f, "bit15-16", "Clamp UV", t.uv_clamp.bits(), t.uv_clamp)?;
        field(f, "bit17-18", "Flip UV", t.uv_flip.bits(), t.uv_flip)?;
        bit(f, "bit19", "Ignore Tex.Alpha", t.ignore_texture_alpha)?;
        bit(f, "bit20", "Use Alpha", t.use_alpha)?;
        bit(f, "bit21", "Color Clamp", t.color_clamp)?;
        field(f, "bit22-23", "Fog Control", t.fog.bits(), t.fog)?;
        bit(f, "bit24", "DST Select", t.dst_select)?;
        bit(f, "bit25", "SRC Select", t.src_select)?;
        field(f, "bit26-28", "DST Alpha Instr", t.dst_alpha.bits(), t.dst_alpha)?;
        field(f, "bit29-31", "SRC Alpha Instr", t.src_alpha.bits(), t.src_alpha)?;

        let c = &h.tex_ctrl;
        section(f, "Mesh_Texture_Control_Flags")?;
        bit(f, "bit25", "StrideSelect", c.stride_select)?;
        let scan = if c.non_twiddled { "Non-Twiddled" } else { "Twiddled" };
        field(f, "bit26", "Scan Order", u32::from(c.non_twiddled), scan)?;
        field(f, "bit27-29", "Pixel Format", c.pixel_format.bits(), c.pixel_format)?;
        bit(f, "bit30", "VQ Compressed", c.vq_compressed)?;
        bit(f, "bit31", "Mip Mapped", c.mip_mapped)?;

        section(f, "Mesh_Centroid_&_Bound_Radius")?;
        let [x, y, z] = h.centroid;
        writeln!(f, "mesh_centroid: x = {x}")?;
        writeln!(f, "mesh_centroid: y = {y}")?;
        writeln!(f, "mesh_centroid: z = {z}")?;
        writeln!(f, "mesh_bnd_radius: = {}", h.bound_radius)?;

        section(f, "Mesh_Texture_ID")?;
        if h.has_texture() {
            writeln!(f, "Texture ID: {}", h.texture_id)?;
        } else {
            writeln!(f, "Texture ID: No Texture!")?;
        }

        section(f, "Mesh_Texture_Shading")?;
        match (h.shading, h.shading.specular_intensity(self.revision)) {
            (ShadingMode::Lambert(_), Some(intensity)) => writeln!(
                f,
                "[{}] {} - Specular Intensity: {intensity}",
                h.shading.raw(),
                h.shading.label()
            )?,
            _ => writeln!(f, "[{}] {}", h.shading.raw(), h.shading.label())?,
        }
        writeln!(f, "Texture Ambient Light: {}", h.ambient)?;

        section(f, "Mesh_Base_Colors_ARGB")?;
        argb(f, &h.base_color)?;
        section(f, "Mesh_Offset_Colors_ARGB")?;
        argb(f, &h.offset_color)?;

        section(f, "Mesh_Size")?;
        writeln!(f, "Mesh Data Size: 0x{:X}", h.mesh_size)?;

        section(f, "Mesh_Geometry")?;
        writeln!(f, "Strips: {}", mesh.strips.len())?;
        writeln!(f, "Vertices: {}", mesh.vertices.len())?;
        writeln!(f, "Triangles: {}", mesh.triangles.len())?;
        writeln!(f, "Backface Culling: {}", yes_no(mesh.backface_culling()).trim_end())?;
        writeln!(f, "Environment Mapped: {}", yes_no(mesh.env_mapped()).trim_end())?;

        for (i, strip) in mesh.strips.iter().enumerate() {
            let flags = &strip.flags;
            let kind = if flags.triangle_list { "Triangle List" } else { "Strip" };
            writeln!(
                f,
                "Strip {i}: {kind}, {} faces, culling [{}] {}, gouraud {}, env map {}, super index {}",
                strip.face_count,
                flags.culling.bits(),
                flags.culling,
                yes_no(flags.gouraud).trim_end(),
                yes_no(flags.env_mapping).trim_end(),
                yes_no(flags.super_index).trim_end(),
            )?;
        }
        Ok(())
    }
}

impl Display for ModelReport<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let header = &self.model.header;
        writeln!(f, "#---------------------------#")?;
        writeln!(f, "#    Naomi_Library_Model    #")?;
        writeln!(f, "#---------------------------#")?;
        writeln!(f, "-----Global_Flag0-----")?;
        writeln!(f, "{}", header.index_mode.label())?;

        let flags = &header.flags;
        writeln!(f, "-----Global_Flag1-----")?;
        bit(f, "bit0", "Always true", true)?;
        bit(f, "bit1", "Skip 1st lgt src op.", flags.skip_first_light)?;
        bit(f, "bit2", "Environment mapping", flags.env_mapping)?;
        bit(f, "bit3", "Palette texture", flags.palette_texture)?;
        bit(f, "bit4", "Bump map available", flags.bump_map)?;

        let [x, y, z] = header.object_centroid;
        writeln!(f, "-----")?;
        writeln!(f, "obj_centroid: x = {x}")?;
        writeln!(f, "obj_centroid: y = {y}")?;
        writeln!(f, "obj_centroid: z = {z}")?;
        writeln!(f, "obj_bnd_radius: = {}", header.object_bound_radius)?;

        for (index, mesh) in self.model.meshes.iter().enumerate() {
            self.mesh(f, index, mesh)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::decode::{DecodeOptions, decode_model};
    use crate::models::fixture::*;

    #[test]
    fn test_report_sections() {
        let mut untextured = FixtureMesh::new(
            -1,
            vec![FixtureStrip {
                word: strip_word(2, true),
                vertices: vec![
                    lit([0.0, 0.0, 0.0], [0.0, 0.0]),
                    lit([1.0, 0.0, 0.0], [0.0, 0.0]),
                    lit([0.0, 1.0, 0.0], [0.0, 0.0]),
                ],
            }],
        );
        untextured.texture_id = -1;
        let lambert = FixtureMesh::new(
            4,
            vec![FixtureStrip {
                word: strip_word(3, false),
                vertices: vec![lit([0.0, 0.0, 0.0], [0.0, 0.0])],
            }],
        );
        let data = FixtureModel::new(vec![untextured, lambert]).build();
        let model = decode_model(&data, &DecodeOptions::default()).unwrap();
        let report = ModelReport::new(&model, FormatRevision::Current).to_string();

        assert!(report.contains("Super_Index"));
        assert!(report.contains("Mesh 1 Header"));
        assert!(report.contains("Texture ID: No Texture!"));
        assert!(report.contains("Texture ID: 3"));
        assert!(report.contains("[-1] Constant Mode"));
        assert!(report.contains("[4] Lambert Mode - Specular Intensity: 0.25"));
        assert!(report.contains("Punch Through"));
        assert!(report.contains("Backface Culling: Yes"));
        assert!(report.contains("Strip 0: Triangle List, 1 faces, culling [2] Clockwise"));
        assert_eq!(report.matches("-----Mesh_TSP-----").count(), 2);
    }
}
