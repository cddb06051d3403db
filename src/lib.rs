/// Binary parsing helpers, bitfields and file provenance
pub mod data;
/// Raster export (PNG/BMP/TGA and `.act` palettes)
pub mod export;
/// NaomiLib models: decoding, in-place re-encoding, archives and reports
pub mod models;
/// Generic wrapper for values that may or may not match a known variant.
pub mod recognized;
/// PVR textures and PVP palettes
pub mod textures;

pub use data::{ByteCursor, Endianness, Provenance};
pub use models::{DecodeOptions, NaomiModel, decode_model, encode_model, write_model};
pub use textures::{Palette, Raster, decode_pvr, parse_pvp};
