//! Compression layer for packet bodies
//!
//! Stateless zlib wrappers. Each call builds its own encoder or decoder, so no
//! state is carried from one packet to the next.

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use mcwire_core::{CodecError, Result};
use std::io::{Read, Write};

/// zlib level used when the caller does not pick one
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Compress data at the default level
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    compress_with_level(data, DEFAULT_COMPRESSION_LEVEL)
}

/// Compress data at `level` (0-9)
pub fn compress_with_level(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level.min(9)));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decompress data, refusing to produce more than `max_size` bytes
///
/// The decoder is capped at `max_size + 1` bytes of output, so a hostile
/// payload can never make this allocate past the limit.
///
/// # Errors
/// - `Decompression` if the stream is corrupt
/// - `SizeLimitExceeded` if the output would exceed `max_size`
pub fn decompress(data: &[u8], max_size: usize) -> Result<Vec<u8>> {
    let cap = (max_size as u64).saturating_add(1);
    let mut decoder = ZlibDecoder::new(data).take(cap);
    let mut decompressed = Vec::new();

    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| CodecError::Decompression(e.to_string()))?;

    if decompressed.len() > max_size {
        tracing::warn!(
            "Decompressed payload exceeds limit of {} bytes (compressed size {})",
            max_size,
            data.len()
        );
        return Err(CodecError::SizeLimitExceeded {
            limit: max_size,
            actual: decompressed.len(),
        });
    }

    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zlib_roundtrip() {
        let original = b"Hello, World! This is a test of the compression system.";

        let compressed = compress(original).unwrap();
        let decompressed = decompress(&compressed, original.len()).unwrap();

        assert_eq!(original, &decompressed[..]);
    }

    #[test]
    fn test_levels_roundtrip() {
        let original = vec![7u8; 4096];

        for level in [0, 1, 6, 9] {
            let compressed = compress_with_level(&original, level).unwrap();
            let decompressed = decompress(&compressed, original.len()).unwrap();
            assert_eq!(original, decompressed, "Failed for level {}", level);
        }
    }

    #[test]
    fn test_corrupt_input() {
        let err = decompress(&[0xFF, 0xFF, 0xFF, 0xFF], 1024).unwrap_err();
        assert!(matches!(err, CodecError::Decompression(_)));
    }

    #[test]
    fn test_decompression_bomb_is_capped() {
        let bomb = compress(&vec![0u8; 1 << 20]).unwrap();
        assert!(bomb.len() < 4096);

        match decompress(&bomb, 1024).unwrap_err() {
            CodecError::SizeLimitExceeded { limit, actual } => {
                assert_eq!(limit, 1024);
                // Never materializes more than one byte past the limit
                assert_eq!(actual, 1025);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_exact_limit_is_allowed() {
        let original = vec![1u8; 256];
        let compressed = compress(&original).unwrap();
        assert_eq!(decompress(&compressed, 256).unwrap(), original);
    }
}
