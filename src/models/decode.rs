use bon::Builder;
use rootcause::Report;
use tracing::debug;

use crate::data::parser_utils::Endianness;

use super::ModelError;
use super::header::{FormatRevision, MeshHeader, ModelHeader, VertexLayout};
use super::strip::FaceStrip;
use super::transform::AxisTransform;
use super::vertex::Vertex;
use super::walk::{ModelVisitor, walk_model};

/// Options shared by decoding and re-encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Builder)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecodeOptions {
    #[builder(default)]
    pub transform: AxisTransform,
    /// Selects how Lambert specular codes are interpreted.
    #[builder(default)]
    pub revision: FormatRevision,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mesh {
    pub header: MeshHeader,
    /// Inline vertices in stream order; back-references index into this list.
    pub vertices: Vec<Vertex>,
    pub strips: Vec<FaceStrip>,
    /// Indices into `vertices`, winding normalized per strip.
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn layout(&self) -> VertexLayout {
        self.header.shading.layout()
    }

    /// True if the last strip of the mesh culls back faces.
    pub fn backface_culling(&self) -> bool {
        self.strips
            .last()
            .is_some_and(|strip| strip.flags.culls_backfaces())
    }

    /// True if any strip requests environment mapping.
    pub fn env_mapped(&self) -> bool {
        self.strips.iter().any(|strip| strip.flags.env_mapping)
    }

    pub fn specular_intensity(&self, revision: FormatRevision) -> Option<f32> {
        self.header.shading.specular_intensity(revision)
    }
}

/// A decoded model. Positions and centroids are in the caller's coordinate
/// system (see [`AxisTransform`]).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NaomiModel {
    pub endianness: Endianness,
    pub header: ModelHeader,
    pub meshes: Vec<Mesh>,
}

impl NaomiModel {
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.vertices.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.triangles.len()).sum()
    }
}

struct DecodeVisitor {
    transform: AxisTransform,
    header: Option<ModelHeader>,
    meshes: Vec<Mesh>,
}

impl DecodeVisitor {
    fn mesh(&mut self, index: usize) -> &mut Mesh {
        // walk_model always calls begin_mesh first
        &mut self.meshes[index]
    }
}

impl ModelVisitor for DecodeVisitor {
    type Error = ModelError;

    fn model_header(&mut self, header: &ModelHeader, _: Endianness) -> Result<(), ModelError> {
        self.header = Some(ModelHeader {
            object_centroid: self.transform.apply(header.object_centroid),
            ..header.clone()
        });
        Ok(())
    }

    fn begin_mesh(&mut self, _: usize, header: &MeshHeader, _: usize) -> Result<(), ModelError> {
        self.meshes.push(Mesh {
            header: MeshHeader {
                centroid: self.transform.apply(header.centroid),
                ..header.clone()
            },
            vertices: Vec::new(),
            strips: Vec::new(),
            triangles: Vec::new(),
        });
        Ok(())
    }

    fn inline_vertex(
        &mut self,
        mesh: usize,
        _: u32,
        _: usize,
        vertex: Vertex,
    ) -> Result<(), ModelError> {
        let position = self.transform.apply(vertex.position);
        self.mesh(mesh).vertices.push(Vertex { position, ..vertex });
        Ok(())
    }

    fn strip(&mut self, mesh: usize, strip: FaceStrip) -> Result<(), ModelError> {
        let mesh = self.mesh(mesh);
        mesh.triangles.extend(strip.triangles());
        mesh.strips.push(strip);
        Ok(())
    }

    fn end_mesh(&mut self, mesh: usize) -> Result<(), ModelError> {
        let mesh_ref = self.mesh(mesh);
        debug!(
            mesh,
            vertices = mesh_ref.vertices.len(),
            triangles = mesh_ref.triangles.len(),
            texture = mesh_ref.header.texture_id,
            "decoded mesh"
        );
        Ok(())
    }
}

/// Decode a NaomiLib model.
pub fn decode_model(
    data: &[u8],
    options: &DecodeOptions,
) -> Result<NaomiModel, Report<ModelError>> {
    let mut visitor = DecodeVisitor {
        transform: options.transform,
        header: None,
        meshes: Vec::new(),
    };
    let endianness = walk_model(data, &mut visitor).map_err(Report::new)?;
    let header = visitor.header.ok_or_else(|| {
        Report::new(ModelError::UnsupportedModelFormat { magic: [0, 0] })
    })?;
    Ok(NaomiModel {
        endianness,
        header,
        meshes: visitor.meshes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixture::*;
    use crate::models::header::{IndexMode, ShadingMode};
    use crate::models::strip::VertexRef;
    use crate::models::transform::Orientation;
    use crate::models::vertex::VertexAttributes;

    fn triangle() -> Vec<FixtureVertex> {
        vec![
            lit([0.0, 0.0, 0.0], [0.0, 0.0]),
            lit([1.0, 0.0, 0.0], [1.0, 0.0]),
            lit([0.0, 1.0, 0.0], [0.0, 1.0]),
        ]
    }

    #[test]
    fn test_clockwise_triangle_list() {
        let data = FixtureModel::new(vec![FixtureMesh::new(
            0,
            vec![FixtureStrip {
                word: strip_word(2, true),
                vertices: triangle(),
            }],
        )])
        .build();

        let model = decode_model(&data, &DecodeOptions::default()).unwrap();
        assert_eq!(model.endianness, Endianness::Little);
        assert_eq!(model.header.index_mode, IndexMode::SuperIndex);
        assert!(model.header.flags.skip_first_light);
        assert_eq!(model.meshes.len(), 1);

        let mesh = &model.meshes[0];
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.triangles, vec![[1, 0, 2]]);
        assert!(mesh.backface_culling());
        assert!(!mesh.env_mapped());
        assert_eq!(mesh.header.texture_id, 3);
        assert_eq!(mesh.header.shading, ShadingMode::Lambert(0));
        assert_eq!(mesh.vertices[1].uv, [1.0, 0.0]);
    }

    #[test]
    fn test_back_references_share_vertices_across_strips() {
        let data = FixtureModel::new(vec![FixtureMesh::new(
            1,
            vec![
                FixtureStrip {
                    word: strip_word(3, false),
                    vertices: triangle(),
                },
                FixtureStrip {
                    word: strip_word(1, false) | (1 << 8),
                    vertices: vec![
                        FixtureVertex::Ref(2),
                        FixtureVertex::Ref(1),
                        lit([1.0, 1.0, 0.0], [1.0, 1.0]),
                    ],
                },
            ],
        )])
        .build();

        let model = decode_model(&data, &DecodeOptions::default()).unwrap();
        let mesh = &model.meshes[0];
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.triangles, vec![[0, 1, 2], [2, 1, 3]]);
        assert!(matches!(
            mesh.strips[1].vertices[0],
            VertexRef::BackReference { index: 2, .. }
        ));
        assert!(!mesh.backface_culling());
        assert!(mesh.env_mapped());
    }

    #[test]
    fn test_transform_applies_to_positions_and_centroids() {
        let data = FixtureModel::new(vec![FixtureMesh::new(
            0,
            vec![FixtureStrip {
                word: strip_word(3, true),
                vertices: triangle(),
            }],
        )])
        .build();
        let plain = decode_model(&data, &DecodeOptions::default()).unwrap();
        let options = DecodeOptions::builder()
            .transform(AxisTransform::new(Orientation::ZUp, true))
            .build();
        let moved = decode_model(&data, &options).unwrap();

        assert_eq!(moved.header.object_centroid, [-0.5, -2.5, 1.5]);
        assert_eq!(moved.meshes[0].header.centroid, [-1.0, 3.0, 2.0]);
        assert_eq!(moved.meshes[0].header.bound_radius, 4.0);
        let [x, y, z] = plain.meshes[0].vertices[2].position;
        assert_eq!(moved.meshes[0].vertices[2].position, [-x, z, y]);
        assert_eq!(
            moved.meshes[0].vertices[2].attributes,
            plain.meshes[0].vertices[2].attributes
        );
    }

    #[test]
    fn test_colored_and_bumped_meshes() {
        let colored = FixtureVertex::Colored {
            position: [x(1.0), 2.0, 3.0],
            normal: [0, 127, -128],
            base: [0x30, 0x20, 0x10, 0xFF],
            offset: [0, 0, 0, 0x80],
            uv: [0.5, 0.5],
        };
        let bumped = FixtureVertex::Bumped {
            position: [x(1.0), 2.0, 3.0],
            normal: [0.0, 0.0, 1.0],
            bump: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            uv: [0.25, 0.25],
        };
        let data = FixtureModel::new(vec![
            FixtureMesh::new(
                -3,
                vec![FixtureStrip {
                    word: strip_word(3, false),
                    vertices: vec![colored],
                }],
            ),
            FixtureMesh::new(
                -2,
                vec![FixtureStrip {
                    word: strip_word(3, false),
                    vertices: vec![bumped],
                }],
            ),
        ])
        .build();

        let model = decode_model(&data, &DecodeOptions::default()).unwrap();
        assert_eq!(model.meshes.len(), 2);
        assert_eq!(model.meshes[0].layout(), VertexLayout::Colored);
        assert_eq!(
            model.meshes[0].vertices[0].attributes,
            VertexAttributes::Colored {
                normal: [0, 127, -128],
                pad: 0,
                base_color: [0x10, 0x20, 0x30, 0xFF],
                offset_color: [0, 0, 0, 0x80],
            }
        );
        assert_eq!(model.meshes[0].vertices[0].uv, [0.5, 0.5]);
        assert!(model.meshes[0].triangles.is_empty());
        assert_eq!(model.meshes[1].layout(), VertexLayout::Bumped);
        assert_eq!(model.meshes[1].vertices[0].uv, [0.25, 0.25]);
    }

    #[test]
    fn test_big_endian_model() {
        let mut fixture = FixtureModel::new(vec![FixtureMesh::new(
            0,
            vec![FixtureStrip {
                word: strip_word(2, true),
                vertices: triangle(),
            }],
        )]);
        let little = decode_model(&fixture.build(), &DecodeOptions::default()).unwrap();
        fixture.big_endian = true;
        let big = decode_model(&fixture.build(), &DecodeOptions::default()).unwrap();
        assert_eq!(big.endianness, Endianness::Big);
        assert_eq!(big.meshes, little.meshes);
        assert_eq!(big.header, little.header);
    }

    #[test]
    fn test_unsupported_magic() {
        let err = decode_model(&[0xFF; 0x40], &DecodeOptions::default()).unwrap_err();
        assert!(matches!(
            err.current_context(),
            ModelError::UnsupportedModelFormat { .. }
        ));
    }

    #[test]
    fn test_empty_model() {
        let mut data = FixtureModel::new(Vec::new()).build();
        let model = decode_model(&data, &DecodeOptions::default()).unwrap();
        assert!(model.meshes.is_empty());
        data.truncate(0x18);
        assert!(decode_model(&data, &DecodeOptions::default()).is_ok());
    }

    #[test]
    fn test_specular_intensity_follows_revision() {
        let data = FixtureModel::new(vec![FixtureMesh::new(
            4,
            vec![FixtureStrip {
                word: strip_word(3, true),
                vertices: triangle(),
            }],
        )])
        .build();
        let model = decode_model(&data, &DecodeOptions::default()).unwrap();
        let mesh = &model.meshes[0];
        assert_eq!(mesh.specular_intensity(FormatRevision::Current), Some(0.25));
        assert_eq!(mesh.specular_intensity(FormatRevision::Legacy), Some(0.4));
    }
}
