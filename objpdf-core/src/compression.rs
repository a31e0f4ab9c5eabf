//! Compression utilities for PDF streams

use crate::error::{PdfError, Result};

/// How streams are compressed when a document is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    /// Streams are written decoded, without a filter
    None,
    Fastest,
    #[default]
    Optimal,
    Smallest,
}

impl CompressionLevel {
    pub const ALL: [CompressionLevel; 4] = [
        CompressionLevel::None,
        CompressionLevel::Fastest,
        CompressionLevel::Optimal,
        CompressionLevel::Smallest,
    ];

    pub fn is_compressed(&self) -> bool {
        !matches!(self, CompressionLevel::None)
    }

    #[cfg(feature = "compression")]
    fn flate_level(&self) -> flate2::Compression {
        match self {
            CompressionLevel::None => flate2::Compression::none(),
            CompressionLevel::Fastest => flate2::Compression::fast(),
            CompressionLevel::Optimal => flate2::Compression::default(),
            CompressionLevel::Smallest => flate2::Compression::best(),
        }
    }
}

impl std::str::FromStr for CompressionLevel {
    type Err = PdfError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(CompressionLevel::None),
            "fastest" => Ok(CompressionLevel::Fastest),
            "optimal" => Ok(CompressionLevel::Optimal),
            "smallest" => Ok(CompressionLevel::Smallest),
            other => Err(PdfError::CompressionError(format!(
                "unknown compression level '{other}'"
            ))),
        }
    }
}

/// Compress data using Flate/Zlib compression
#[cfg(feature = "compression")]
pub fn compress(data: &[u8], level: CompressionLevel) -> Result<Vec<u8>> {
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    let mut encoder = ZlibEncoder::new(Vec::new(), level.flate_level());
    encoder.write_all(data).map_err(PdfError::Io)?;
    encoder.finish().map_err(PdfError::Io)
}

#[cfg(not(feature = "compression"))]
pub fn compress(_data: &[u8], _level: CompressionLevel) -> Result<Vec<u8>> {
    Err(PdfError::CompressionError(
        "FlateDecode requires the compression feature".to_string(),
    ))
}

/// Decompress data using Flate/Zlib decompression
#[cfg(feature = "compression")]
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    use flate2::read::ZlibDecoder;
    use std::io::Read;

    let mut decoder = ZlibDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(PdfError::Io)?;
    Ok(decompressed)
}

#[cfg(not(feature = "compression"))]
pub fn decompress(_data: &[u8]) -> Result<Vec<u8>> {
    Err(PdfError::CompressionError(
        "FlateDecode requires the compression feature".to_string(),
    ))
}

#[cfg(all(test, feature = "compression"))]
mod tests {
    use super::*;

    #[test]
    fn test_compress_decompress_roundtrip() {
        let original = b"Hello, this is a test string that should be compressed and decompressed!";

        for level in CompressionLevel::ALL {
            let compressed = compress(original, level).unwrap();
            assert!(!compressed.is_empty());
            assert_eq!(decompress(&compressed).unwrap(), original);
        }
    }

    #[test]
    fn test_decompress_garbage_fails() {
        assert!(decompress(b"definitely not zlib").is_err());
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!("none".parse::<CompressionLevel>().unwrap(), CompressionLevel::None);
        assert_eq!("Smallest".parse::<CompressionLevel>().unwrap(), CompressionLevel::Smallest);
        assert!("maximum".parse::<CompressionLevel>().is_err());
        assert_eq!(CompressionLevel::default(), CompressionLevel::Optimal);
    }
}
