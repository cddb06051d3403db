//! Source identity of a decoded model: the file's basename and its CRC32.
//!
//! The encoder refuses to patch a file whose identity no longer matches the
//! one recorded when the model was decoded.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use flate2::Crc;

/// Size of the chunks used when checksumming files.
pub const CRC_CHUNK_SIZE: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Provenance {
    pub file_name: String,
    pub crc32: u32,
}

impl Provenance {
    pub fn new(file_name: impl Into<String>, data: &[u8]) -> Self {
        Self {
            file_name: file_name.into(),
            crc32: crc32_bytes(data),
        }
    }

    /// Compute the provenance of a file on disk.
    pub fn of_file(path: &Path) -> io::Result<Self> {
        Ok(Self {
            file_name: file_name_of(path),
            crc32: crc32_file(path)?,
        })
    }
}

/// Basename of `path`, lossily converted to UTF-8.
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn crc32_bytes(data: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(data);
    crc.sum()
}

/// CRC32 of everything `reader` yields, consumed in fixed-size chunks.
pub fn crc32_reader<R: Read>(mut reader: R) -> io::Result<u32> {
    let mut crc = Crc::new();
    let mut chunk = vec![0u8; CRC_CHUNK_SIZE];
    loop {
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        crc.update(&chunk[..read]);
    }
    Ok(crc.sum())
}

pub fn crc32_file(path: &Path) -> io::Result<u32> {
    crc32_reader(File::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_known_value() {
        assert_eq!(crc32_bytes(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_chunked_matches_whole() {
        let data: Vec<u8> = (0..20_000u32).map(|i| (i * 7) as u8).collect();
        assert_eq!(crc32_reader(&data[..]).unwrap(), crc32_bytes(&data));
    }

    #[test]
    fn test_of_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        std::fs::write(&path, b"abc").unwrap();
        let provenance = Provenance::of_file(&path).unwrap();
        assert_eq!(provenance, Provenance::new("model.bin", b"abc"));
    }
}
