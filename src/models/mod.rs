//! NaomiLib model files (`.bin`): decoding, in-place re-encoding and the
//! multi-model archive container.

use thiserror::Error;

use crate::data::parser_utils::ParseError;

macro_rules! field_enum {
    (
        $(#[$meta:meta])*
        $name:ident : $width:literal {
            $($variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum $name {
            $($variant),+
        }

        const _: () = assert!($name::ALL.len() == 1 << $width);

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
            pub const WIDTH: u32 = $width;

            pub fn from_bits(bits: u32) -> Self {
                Self::ALL[(bits & ((1 << $width) - 1)) as usize]
            }

            pub fn bits(self) -> u32 {
                self as u32
            }

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

pub mod archive;
pub mod decode;
pub mod encode;
pub mod header;
pub mod report;
pub mod strip;
pub mod transform;
pub mod vertex;
pub mod walk;

pub use archive::{ArchiveEntry, ArchiveError, ArchiveTable, read_archive_table};
pub use decode::{DecodeOptions, Mesh, NaomiModel, decode_model};
pub use encode::{EncodeError, encode_model, write_model};
pub use header::{FormatRevision, MeshHeader, ModelHeader, ShadingMode, VertexLayout};
pub use strip::{FaceStrip, StripCulling, StripFlags, VertexRef};
pub use transform::{AxisTransform, Orientation};
pub use vertex::{Vertex, VertexAttributes};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unsupported model format: magic words 0x{:08X} 0x{:08X}", magic[0], magic[1])]
    UnsupportedModelFormat { magic: [u32; 2] },
    #[error("model data truncated: {0}")]
    UnexpectedEof(#[from] ParseError),
    #[error(
        "back reference at 0x{offset:X} in mesh {mesh} points to 0x{target:X}, which is not an earlier vertex of that mesh"
    )]
    DanglingBackReference {
        mesh: usize,
        offset: usize,
        target: i64,
    },
}
