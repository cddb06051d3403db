/// Image and palette writers for decoded textures.
#[cfg(feature = "image")]
pub mod image;
