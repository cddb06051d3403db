//! Model and mesh headers.
//!
//! A model starts with an 0x18-byte header (index mode, global flags and the
//! object's bounding sphere). Every mesh then starts with an 0x50-byte header
//! made of four packed hardware words (polygon parameter, ISP/TSP, TSP and
//! texture control) followed by bounding sphere, texture, shading, lighting and
//! colour fields, and finally the byte size of the mesh's vertex stream.
//!
//! The packed words are decoded into named fields. Re-packing writes the named
//! fields back over the original word, so bits without a named field (the
//! texture address, reserved bits) survive a decode/encode cycle.

use crate::data::bitfield::{extract, flag, pack, set_flag};

/// Size of the model header; the first mesh header starts here.
pub const MODEL_HEADER_SIZE: usize = 0x18;
/// Size of a mesh header including its trailing size field.
pub const MESH_HEADER_SIZE: usize = 0x50;

field_enum! {
    ParamType: 3 {
        EndOfList => "Control Parameter End Of List",
        UserTileClip => "Control Parameter User Tile Clip",
        ObjectListSet => "Control Parameter Object List Set",
        Reserved => "Reserved",
        PolyOrModVol => "Global Parameter Polygon or Modifier Volume",
        Sprite => "Global Parameter Sprite",
        ReservedGlobal => "Global Parameter Reserved",
        VertexParam => "Vertex Parameter",
    }
}

field_enum! {
    ListType: 3 {
        Opaque => "Opaque",
        OpaqueModVol => "Opaque Modifier Volume",
        Translucent => "Translucent",
        TranslucentModVol => "Translucent Modifier Volume",
        PunchThrough => "Punch Through",
        Reserved5 => "Reserved",
        Reserved6 => "Reserved",
        Reserved7 => "Reserved",
    }
}

field_enum! {
    StripLength: 2 {
        One => "1 strip",
        Two => "2 strips",
        Four => "4 strips",
        Six => "6 strips",
    }
}

field_enum! {
    UserClip: 2 {
        Disabled => "Disabled",
        Reserved => "Reserved",
        InsideEnable => "Inside Enable",
        OutsideEnable => "Outside Enable",
    }
}

field_enum! {
    ColorType: 2 {
        Packed => "Packed Color",
        Floating => "Floating Color",
        Intensity1 => "Intensity Mode 1",
        Intensity2 => "Intensity Mode 2",
    }
}

field_enum! {
    DepthCompare: 3 {
        Never => "NEVER",
        Less => "LESS",
        Equal => "EQUAL",
        LessOrEqual => "LESS OR EQUAL",
        Greater => "GREATER",
        NotEqual => "NOT_EQUAL",
        GreaterOrEqual => "GREATER OR EQUAL",
        Always => "ALWAYS",
    }
}

field_enum! {
    CullingMode: 2 {
        None => "No Culling",
        Small => "Cull if Small",
        Negative => "Cull if Negative",
        Positive => "Cull if Positive",
    }
}

field_enum! {
    /// Blend factor for the source and destination alpha instructions.
    BlendFactor: 3 {
        Zero => "Zero",
        One => "One",
        OtherColor => "Other Color",
        InverseOtherColor => "Inverse Other Color",
        SrcAlpha => "SRC Alpha",
        InverseSrcAlpha => "Inverse SRC Alpha",
        DstAlpha => "DST Alpha",
        InverseDstAlpha => "Inverse DST Alpha",
    }
}

field_enum! {
    FogMode: 2 {
        LookUpTable => "Look Up Table",
        PerVertex => "Per Vertex",
        NoFog => "No Fog",
        LookUpTableMode2 => "Look Up Table Mode 2",
    }
}

field_enum! {
    UvFlip: 2 {
        None => "No",
        V => "Flip Y",
        U => "Flip X",
        Both => "Flip X, Y",
    }
}

field_enum! {
    UvClamp: 2 {
        None => "No",
        V => "Clamp Y",
        U => "Clamp X",
        Both => "Clamp XY",
    }
}

field_enum! {
    FilterMode: 2 {
        Point => "Point Sampled",
        Bilinear => "Bilinear Filter",
        TrilinearA => "Tri-linear Pass A",
        TrilinearB => "Tri-linear Pass B",
    }
}

field_enum! {
    TextureShading: 2 {
        Decal => "Decal",
        Modulate => "Modulate",
        DecalAlpha => "Decal Alpha",
        ModulateAlpha => "Modulate Alpha",
    }
}

field_enum! {
    TextureSize: 3 {
        S8 => "8 px",
        S16 => "16 px",
        S32 => "32 px",
        S64 => "64 px",
        S128 => "128 px",
        S256 => "256 px",
        S512 => "512 px",
        S1024 => "1024 px",
    }
}

impl TextureSize {
    pub fn pixels(self) -> u32 {
        8 << self.bits()
    }
}

field_enum! {
    TexturePixelFormat: 3 {
        Argb1555 => "ARGB1555",
        Rgb565 => "RGB565",
        Argb4444 => "ARGB4444",
        Yuv422 => "YUV422",
        Bump => "Bump Map",
        Pal4 => "4 BPP Palette",
        Pal8 => "8 BPP Palette",
        Reserved => "Reserved",
    }
}

/// Mipmap D adjust in quarter steps (`1` = 0.25). Zero is illegal on hardware
/// but is preserved as found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MipmapDAdjust(pub u8);

impl MipmapDAdjust {
    pub fn factor(self) -> Option<f32> {
        (self.0 != 0).then(|| f32::from(self.0 & 0xF) * 0.25)
    }
}

/// Polygon parameter control word.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshParam {
    pub param_type: ParamType,
    pub end_of_strip: bool,
    pub list_type: ListType,
    pub group_enable: bool,
    pub strip_len: StripLength,
    pub user_clip: UserClip,
    pub shadow: bool,
    pub volume: bool,
    pub color_type: ColorType,
    pub texture: bool,
    pub offset_color: bool,
    pub gouraud: bool,
    /// 16-bit rather than 32-bit UVs.
    pub uv_16bit: bool,
}

impl MeshParam {
    pub fn from_word(w: u32) -> Self {
        Self {
            param_type: ParamType::from_bits(extract(w, 29, 3)),
            end_of_strip: flag(w, 28),
            list_type: ListType::from_bits(extract(w, 24, 3)),
            group_enable: flag(w, 23),
            strip_len: StripLength::from_bits(extract(w, 18, 2)),
            user_clip: UserClip::from_bits(extract(w, 16, 2)),
            shadow: flag(w, 7),
            volume: flag(w, 6),
            color_type: ColorType::from_bits(extract(w, 4, 2)),
            texture: flag(w, 3),
            offset_color: flag(w, 2),
            gouraud: flag(w, 1),
            uv_16bit: flag(w, 0),
        }
    }

    pub fn pack_into(&self, w: &mut u32) {
        pack(w, 29, 3, self.param_type.bits());
        set_flag(w, 28, self.end_of_strip);
        pack(w, 24, 3, self.list_type.bits());
        set_flag(w, 23, self.group_enable);
        pack(w, 18, 2, self.strip_len.bits());
        pack(w, 16, 2, self.user_clip.bits());
        set_flag(w, 7, self.shadow);
        set_flag(w, 6, self.volume);
        pack(w, 4, 2, self.color_type.bits());
        set_flag(w, 3, self.texture);
        set_flag(w, 2, self.offset_color);
        set_flag(w, 1, self.gouraud);
        set_flag(w, 0, self.uv_16bit);
    }
}

/// ISP/TSP instruction word. Bits 0-19 are unused by the format.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IspTsp {
    pub depth_compare: DepthCompare,
    pub culling: CullingMode,
    pub z_write_disable: bool,
    pub texture2: bool,
    pub offset2: bool,
    pub gouraud2: bool,
    pub uv2_16bit: bool,
    pub cache_bypass: bool,
    pub d_calc_ctrl: bool,
}

impl IspTsp {
    pub fn from_word(w: u32) -> Self {
        Self {
            depth_compare: DepthCompare::from_bits(extract(w, 29, 3)),
            culling: CullingMode::from_bits(extract(w, 27, 2)),
            z_write_disable: flag(w, 26),
            texture2: flag(w, 25),
            offset2: flag(w, 24),
            gouraud2: flag(w, 23),
            uv2_16bit: flag(w, 22),
            cache_bypass: flag(w, 21),
            d_calc_ctrl: flag(w, 20),
        }
    }

    pub fn pack_into(&self, w: &mut u32) {
        pack(w, 29, 3, self.depth_compare.bits());
        pack(w, 27, 2, self.culling.bits());
        set_flag(w, 26, self.z_write_disable);
        set_flag(w, 25, self.texture2);
        set_flag(w, 24, self.offset2);
        set_flag(w, 23, self.gouraud2);
        set_flag(w, 22, self.uv2_16bit);
        set_flag(w, 21, self.cache_bypass);
        set_flag(w, 20, self.d_calc_ctrl);
    }
}

/// Texture/shading processor word.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tsp {
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
    /// Read from the secondary accumulation buffer.
    pub src_select: bool,
    /// Write to the secondary accumulation buffer.
    pub dst_select: bool,
    pub fog: FogMode,
    pub color_clamp: bool,
    pub use_alpha: bool,
    pub ignore_texture_alpha: bool,
    pub uv_flip: UvFlip,
    pub uv_clamp: UvClamp,
    pub filter: FilterMode,
    pub super_sample: bool,
    pub mipmap_d_adjust: MipmapDAdjust,
    pub texture_shading: TextureShading,
    pub texture_u_size: TextureSize,
    pub texture_v_size: TextureSize,
}

impl Tsp {
    pub fn from_word(w: u32) -> Self {
        Self {
            src_alpha: BlendFactor::from_bits(extract(w, 29, 3)),
            dst_alpha: BlendFactor::from_bits(extract(w, 26, 3)),
            src_select: flag(w, 25),
            dst_select: flag(w, 24),
            fog: FogMode::from_bits(extract(w, 22, 2)),
            color_clamp: flag(w, 21),
            use_alpha: flag(w, 20),
            ignore_texture_alpha: flag(w, 19),
            uv_flip: UvFlip::from_bits(extract(w, 17, 2)),
            uv_clamp: UvClamp::from_bits(extract(w, 15, 2)),
            filter: FilterMode::from_bits(extract(w, 13, 2)),
            super_sample: flag(w, 12),
            mipmap_d_adjust: MipmapDAdjust(extract(w, 8, 4) as u8),
            texture_shading: TextureShading::from_bits(extract(w, 6, 2)),
            texture_u_size: TextureSize::from_bits(extract(w, 3, 3)),
            texture_v_size: TextureSize::from_bits(extract(w, 0, 3)),
        }
    }

    pub fn pack_into(&self, w: &mut u32) {
        pack(w, 29, 3, self.src_alpha.bits());
        pack(w, 26, 3, self.dst_alpha.bits());
        set_flag(w, 25, self.src_select);
        set_flag(w, 24, self.dst_select);
        pack(w, 22, 2, self.fog.bits());
        set_flag(w, 21, self.color_clamp);
        set_flag(w, 20, self.use_alpha);
        set_flag(w, 19, self.ignore_texture_alpha);
        pack(w, 17, 2, self.uv_flip.bits());
        pack(w, 15, 2, self.uv_clamp.bits());
        pack(w, 13, 2, self.filter.bits());
        set_flag(w, 12, self.super_sample);
        pack(w, 8, 4, u32::from(self.mipmap_d_adjust.0));
        pack(w, 6, 2, self.texture_shading.bits());
        pack(w, 3, 3, self.texture_u_size.bits());
        pack(w, 0, 3, self.texture_v_size.bits());
    }
}

/// Texture control word. Bits 0-24 (texture address) are not interpreted.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TexCtrl {
    pub mip_mapped: bool,
    pub vq_compressed: bool,
    pub pixel_format: TexturePixelFormat,
    /// Set for non-twiddled textures.
    pub non_twiddled: bool,
    pub stride_select: bool,
}

impl TexCtrl {
    pub fn from_word(w: u32) -> Self {
        Self {
            mip_mapped: flag(w, 31),
            vq_compressed: flag(w, 30),
            pixel_format: TexturePixelFormat::from_bits(extract(w, 27, 3)),
            non_twiddled: flag(w, 26),
            stride_select: flag(w, 25),
        }
    }

    pub fn pack_into(&self, w: &mut u32) {
        set_flag(w, 31, self.mip_mapped);
        set_flag(w, 30, self.vq_compressed);
        pack(w, 27, 3, self.pixel_format.bits());
        set_flag(w, 26, self.non_twiddled);
        set_flag(w, 25, self.stride_select);
    }
}

/// Which model format revision the shading field follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FormatRevision {
    /// Specular intensity is `code / 10`.
    Legacy,
    /// Specular intensity is `1 / code`, biased by 0.02 above 5.
    #[default]
    Current,
}

/// Per-mesh shading mode. Non-negative values are Lambert shading with a
/// specular exponent code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShadingMode {
    VertexColor,
    Bump,
    Constant,
    Lambert(i32),
    Unknown(i32),
}

/// Shape of the per-vertex payload that follows the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexLayout {
    /// Float normal + UV.
    Lit,
    /// Packed i8 normal, two BGRA8 colours + UV.
    Colored,
    /// Float normal, two float bump basis vectors + UV.
    Bumped,
}

impl VertexLayout {
    /// Bytes per inline vertex, position included.
    pub fn stride(self) -> usize {
        match self {
            VertexLayout::Lit => 32,
            VertexLayout::Colored => 32,
            VertexLayout::Bumped => 56,
        }
    }
}

impl ShadingMode {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            -3 => ShadingMode::VertexColor,
            -2 => ShadingMode::Bump,
            -1 => ShadingMode::Constant,
            n if n >= 0 => ShadingMode::Lambert(n),
            n => ShadingMode::Unknown(n),
        }
    }

    pub fn raw(self) -> i32 {
        match self {
            ShadingMode::VertexColor => -3,
            ShadingMode::Bump => -2,
            ShadingMode::Constant => -1,
            ShadingMode::Lambert(n) | ShadingMode::Unknown(n) => n,
        }
    }

    pub fn layout(self) -> VertexLayout {
        match self {
            ShadingMode::VertexColor => VertexLayout::Colored,
            ShadingMode::Bump => VertexLayout::Bumped,
            _ => VertexLayout::Lit,
        }
    }

    /// Specular intensity of a Lambert mesh.
    pub fn specular_intensity(self, revision: FormatRevision) -> Option<f32> {
        let ShadingMode::Lambert(code) = self else {
            return None;
        };
        let code = code as f32;
        Some(match revision {
            FormatRevision::Legacy => code / 10.0,
            FormatRevision::Current if code == 0.0 => 1.0,
            FormatRevision::Current if code <= 5.0 => 1.0 / code,
            FormatRevision::Current => 1.0 / code + 0.02,
        })
    }

    pub fn label(self) -> &'static str {
        match self {
            ShadingMode::VertexColor => "Vertex Colors Mode",
            ShadingMode::Bump => "Bump Mode",
            ShadingMode::Constant => "Constant Mode",
            ShadingMode::Lambert(_) => "Lambert Mode",
            ShadingMode::Unknown(_) => "Unknown Mode",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Argb {
    pub a: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Argb {
    pub fn to_array(self) -> [f32; 4] {
        [self.a, self.r, self.g, self.b]
    }

    pub fn from_array([a, r, g, b]: [f32; 4]) -> Self {
        Self { a, r, g, b }
    }
}

/// How vertices are indexed across the model, from the first magic word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IndexMode {
    BetaIndex,
    SuperIndex,
}

impl IndexMode {
    pub fn from_word(word: u32) -> Option<Self> {
        match word {
            0 => Some(IndexMode::BetaIndex),
            1 => Some(IndexMode::SuperIndex),
            _ => None,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            IndexMode::BetaIndex => 0,
            IndexMode::SuperIndex => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            IndexMode::BetaIndex => "Pure_Beta",
            IndexMode::SuperIndex => "Super_Index",
        }
    }
}

/// Second magic word. Bit 0 is always set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlobalFlags {
    pub skip_first_light: bool,
    pub env_mapping: bool,
    pub palette_texture: bool,
    pub bump_map: bool,
}

impl GlobalFlags {
    /// Flag words a model may start with.
    pub const KNOWN_WORDS: [u32; 8] = [0x01, 0x02, 0x03, 0x05, 0x07, 0x11, 0x19, 0x15];

    pub fn from_word(w: u32) -> Self {
        Self {
            skip_first_light: flag(w, 1),
            env_mapping: flag(w, 2),
            palette_texture: flag(w, 3),
            bump_map: flag(w, 4),
        }
    }

    pub fn pack_into(&self, w: &mut u32) {
        set_flag(w, 1, self.skip_first_light);
        set_flag(w, 2, self.env_mapping);
        set_flag(w, 3, self.palette_texture);
        set_flag(w, 4, self.bump_map);
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelHeader {
    pub index_mode: IndexMode,
    pub flags: GlobalFlags,
    pub object_centroid: [f32; 3],
    pub object_bound_radius: f32,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshHeader {
    pub param: MeshParam,
    pub isp_tsp: IspTsp,
    pub tsp: Tsp,
    pub tex_ctrl: TexCtrl,
    pub centroid: [f32; 3],
    pub bound_radius: f32,
    /// `-1` for untextured meshes.
    pub texture_id: i32,
    pub shading: ShadingMode,
    pub ambient: f32,
    pub base_color: Argb,
    pub offset_color: Argb,
    /// Byte size of the vertex stream following this header.
    pub mesh_size: u32,
}

impl MeshHeader {
    pub fn has_texture(&self) -> bool {
        self.texture_id >= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_param_fields() {
        let param = MeshParam::from_word(0x8400_001A);
        assert_eq!(param.param_type, ParamType::PolyOrModVol);
        assert_eq!(param.list_type, ListType::PunchThrough);
        assert_eq!(param.color_type, ColorType::Floating);
        assert!(param.texture);
        assert!(!param.offset_color);
        assert!(param.gouraud);
        assert!(!param.uv_16bit);
    }

    #[test]
    fn test_pack_keeps_unnamed_bits() {
        let original = 0x8400_FF1A;
        let mut param = MeshParam::from_word(original);
        let mut word = original;
        param.pack_into(&mut word);
        assert_eq!(word, original);

        param.list_type = ListType::Translucent;
        param.pack_into(&mut word);
        assert_eq!(word, 0x8200_FF1A);
    }

    #[test]
    fn test_tsp_fields() {
        let tsp = Tsp::from_word(0x9480_04ED);
        assert_eq!(tsp.src_alpha, BlendFactor::SrcAlpha);
        assert_eq!(tsp.dst_alpha, BlendFactor::InverseSrcAlpha);
        assert_eq!(tsp.fog, FogMode::NoFog);
        assert_eq!(tsp.mipmap_d_adjust.factor(), Some(1.0));
        assert_eq!(tsp.texture_shading, TextureShading::ModulateAlpha);
        assert_eq!(tsp.texture_u_size, TextureSize::S256);
        assert_eq!(tsp.texture_v_size.pixels(), 256);

        let mut word = 0;
        tsp.pack_into(&mut word);
        assert_eq!(word, 0x9480_04ED);
    }

    #[test]
    fn test_isp_and_tex_ctrl_round_trip() {
        let isp = 0x9480_0000;
        let mut word = 0;
        IspTsp::from_word(isp).pack_into(&mut word);
        assert_eq!(word, isp);
        assert_eq!(IspTsp::from_word(isp).culling, CullingMode::Negative);

        let tex = TexCtrl::from_word(0xC800_1234);
        assert!(tex.mip_mapped);
        assert!(tex.vq_compressed);
        assert_eq!(tex.pixel_format, TexturePixelFormat::Rgb565);
        let mut word = 0x0000_1234;
        tex.pack_into(&mut word);
        assert_eq!(word, 0xC800_1234);
    }

    #[test]
    fn test_shading_modes() {
        assert_eq!(ShadingMode::from_raw(-3).layout(), VertexLayout::Colored);
        assert_eq!(ShadingMode::from_raw(-2).layout(), VertexLayout::Bumped);
        assert_eq!(ShadingMode::from_raw(7), ShadingMode::Lambert(7));
        assert_eq!(ShadingMode::from_raw(-9).raw(), -9);
    }

    #[test]
    fn test_specular_intensity_revisions() {
        let lambert = |n| ShadingMode::Lambert(n);
        assert_eq!(lambert(0).specular_intensity(FormatRevision::Current), Some(1.0));
        assert_eq!(lambert(4).specular_intensity(FormatRevision::Current), Some(0.25));
        assert_eq!(lambert(10).specular_intensity(FormatRevision::Current), Some(0.1 + 0.02));
        assert_eq!(lambert(5).specular_intensity(FormatRevision::Legacy), Some(0.5));
        assert_eq!(ShadingMode::Constant.specular_intensity(FormatRevision::Current), None);
    }

    #[test]
    fn test_global_flags() {
        let flags = GlobalFlags::from_word(0x19);
        assert!(flags.palette_texture);
        assert!(flags.bump_map);
        assert!(!flags.env_mapping);
        let mut word = 0x19;
        GlobalFlags {
            env_mapping: true,
            ..flags
        }
        .pack_into(&mut word);
        assert_eq!(word, 0x1D);
    }
}
