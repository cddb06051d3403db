/// Bit range extraction and packing for 32-bit hardware words
pub mod bitfield;
/// Endianness-aware byte cursor shared by every parser
pub mod parser_utils;
/// Source file identity (name + CRC32) used to guard in-place patching
pub mod provenance;

pub use parser_utils::{ByteCursor, Endianness};
pub use provenance::Provenance;
