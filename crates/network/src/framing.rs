//! Pure frame encoding and decoding
//!
//! No I/O happens here. The connection layer reads the length prefix and the
//! frame bytes, then hands them to [`decode_frame`]; on the way out it writes
//! whatever [`encode_frame`] produced.
//!
//! ## Frame layout
//!
//! | threshold            | frame                                                         |
//! |----------------------|---------------------------------------------------------------|
//! | none                 | `{VARINT len(body)}{body}`                                    |
//! | `len(body) < t`      | `{VARINT len(body) + 1}{0x00}{body}`                          |
//! | `len(body) >= t`     | `{VARINT len(z) + len(VARINT len(body))}{VARINT len(body)}{z}` |
//!
//! where `body = {VARINT packet_id}{payload}` and `z = zlib(body)`.

use bytes::BytesMut;
use mcwire_config::CodecConfig;
use mcwire_core::{CodecError, Result, ValidationError};
use mcwire_protocol::codecs::{put_varuint, varint_len};
use mcwire_protocol::compression::{compress_with_level, decompress};
use mcwire_protocol::{Buffer, Serializable};

/// Validate `payload`, then build the complete frame for it
///
/// # Errors
/// - `Validation` if the payload or `packet_id` is invalid
/// - `SizeLimitExceeded` if the frame would exceed `max_frame_length`
pub fn encode_frame<P: Serializable>(
    packet_id: i32,
    payload: &P,
    compression_threshold: Option<u32>,
    config: &CodecConfig,
) -> Result<BytesMut> {
    if packet_id < 0 {
        return Err(ValidationError::OutOfRange {
            field: "packet_id",
            value: i128::from(packet_id),
            min: 0,
            max: i128::from(i32::MAX),
        }
        .into());
    }
    payload.validate()?;

    let mut body = Buffer::new().with_max_string_length(config.max_string_length);
    body.write_varint(packet_id);
    payload.serialize_to(&mut body)?;

    frame_body(body.as_slice(), compression_threshold, config)
}

/// Wrap an already serialized body (`{VARINT packet_id}{payload}`) in a frame
///
/// # Errors
/// `SizeLimitExceeded` if the frame would exceed `max_frame_length`.
pub fn frame_body(
    body: &[u8],
    compression_threshold: Option<u32>,
    config: &CodecConfig,
) -> Result<BytesMut> {
    let body_length = body.len() as u64;
    let compressed;

    let (data_length, contents): (Option<u64>, &[u8]) = match compression_threshold {
        None => (None, body),
        Some(threshold) if body_length < u64::from(threshold) => (Some(0), body),
        Some(_) => {
            compressed = compress_with_level(body, config.compression_level)?;
            (Some(body_length), compressed.as_slice())
        }
    };

    let frame_length = contents.len() + data_length.map_or(0, varint_len);
    if frame_length > config.max_frame_length {
        tracing::warn!(
            "Outbound frame of {} bytes exceeds limit of {} bytes",
            frame_length,
            config.max_frame_length
        );
        return Err(CodecError::SizeLimitExceeded {
            limit: config.max_frame_length,
            actual: frame_length,
        });
    }

    let mut frame = BytesMut::with_capacity(frame_length + 5);
    put_varuint(&mut frame, frame_length as u64);
    if let Some(data_length) = data_length {
        put_varuint(&mut frame, data_length);
    }
    frame.extend_from_slice(contents);

    tracing::trace!(
        "Framed body of {} bytes into {} bytes (compressed: {})",
        body.len(),
        frame.len(),
        data_length.is_some_and(|length| length > 0)
    );

    Ok(frame)
}

/// Check an untrusted frame length prefix before anything is allocated for it
///
/// # Errors
/// `MalformedInput` if the length is negative or above `max_frame_length`.
pub fn check_frame_length(frame_length: i32, config: &CodecConfig) -> Result<usize> {
    if frame_length < 0 {
        return Err(CodecError::MalformedInput(format!(
            "Negative frame length {}",
            frame_length
        )));
    }

    let frame_length = frame_length as usize;
    if frame_length > config.max_frame_length {
        tracing::warn!(
            "Frame length {} exceeds limit of {} bytes",
            frame_length,
            config.max_frame_length
        );
        return Err(CodecError::MalformedInput(format!(
            "Frame length {} exceeds limit of {} bytes",
            frame_length, config.max_frame_length
        )));
    }

    Ok(frame_length)
}

/// Decode one frame (without its length prefix) into `(packet_id, payload)`
///
/// The returned buffer is positioned at the start of the payload.
///
/// # Errors
/// - `MalformedInput` for a negative data length or packet id, or when the
///   decompressed size differs from the declared data length
/// - `SizeLimitExceeded` if the declared data length is above
///   `max_uncompressed_length`
/// - `MalformedInput` if the frame ends inside the data length or packet id
/// - `Decompression` for a corrupt compressed body
pub fn decode_frame(
    frame: &[u8],
    compression_threshold: Option<u32>,
    config: &CodecConfig,
) -> Result<(i32, Buffer)> {
    let mut frame = Buffer::from(frame);

    let mut body = match compression_threshold {
        None => Buffer::from(frame.read_remaining()),
        Some(_) => {
            let data_length = read_frame_varint(&mut frame, "data length")?;
            if data_length < 0 {
                return Err(CodecError::MalformedInput(format!(
                    "Negative data length {}",
                    data_length
                )));
            }

            let data_length = data_length as usize;
            if data_length == 0 {
                Buffer::from(frame.read_remaining())
            } else {
                if data_length > config.max_uncompressed_length {
                    tracing::warn!(
                        "Declared data length {} exceeds limit of {} bytes",
                        data_length,
                        config.max_uncompressed_length
                    );
                    return Err(CodecError::SizeLimitExceeded {
                        limit: config.max_uncompressed_length,
                        actual: data_length,
                    });
                }

                let compressed = frame.read_remaining();
                let decompressed = decompress(compressed, data_length)?;
                if decompressed.len() != data_length {
                    return Err(CodecError::MalformedInput(format!(
                        "Decompressed {} bytes but frame declared {}",
                        decompressed.len(),
                        data_length
                    )));
                }

                tracing::trace!(
                    "Decompressed frame body from {} to {} bytes",
                    compressed.len(),
                    data_length
                );
                Buffer::from(decompressed)
            }
        }
    }
    .with_max_string_length(config.max_string_length);

    let packet_id = read_frame_varint(&mut body, "packet id")?;
    if packet_id < 0 {
        return Err(CodecError::MalformedInput(format!(
            "Negative packet id {}",
            packet_id
        )));
    }

    tracing::trace!(
        "Decoded packet {:#04x} with {} payload bytes",
        packet_id,
        body.remaining()
    );

    Ok((packet_id, body))
}

/// Read a header varint from a frame that has already fully arrived
///
/// Running out of bytes here means the frame itself is short, not that more
/// bytes are on the way.
fn read_frame_varint(buf: &mut Buffer, field: &str) -> Result<i32> {
    buf.read_varint().map_err(|err| match err {
        CodecError::InsufficientData {
            offset, available, ..
        } => CodecError::MalformedInput(format!(
            "Frame of {} bytes ends inside the {} at offset {} ({} bytes left)",
            buf.len(),
            field,
            offset,
            available
        )),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcwire_protocol::codecs::decode_varuint;

    /// Opaque payload bytes
    #[derive(Debug, Clone, PartialEq)]
    struct Raw(Vec<u8>);

    impl Serializable for Raw {
        fn serialize_to(&self, buf: &mut Buffer) -> Result<()> {
            buf.write(&self.0);
            Ok(())
        }

        fn deserialize(buf: &mut Buffer) -> Result<Self> {
            Ok(Self(buf.read_remaining().to_vec()))
        }
    }

    /// Strip the frame length prefix, checking it matches the rest
    fn split_prefix(frame: &[u8]) -> &[u8] {
        let (length, consumed) = decode_varuint(frame, 32).unwrap().unwrap();
        assert_eq!(length as usize, frame.len() - consumed, "length prefix mismatch");
        &frame[consumed..]
    }

    #[test]
    fn test_uncompressed_frame_layout() {
        let config = CodecConfig::default();
        let frame = encode_frame(3, &Raw(vec![0xAB; 10]), None, &config).unwrap();

        let mut expected = vec![11, 3];
        expected.extend_from_slice(&[0xAB; 10]);
        assert_eq!(&frame[..], &expected[..]);

        let (id, mut payload) = decode_frame(split_prefix(&frame), None, &config).unwrap();
        assert_eq!(id, 3);
        assert_eq!(Raw::deserialize(&mut payload).unwrap(), Raw(vec![0xAB; 10]));
    }

    #[test]
    fn test_threshold_boundary() {
        let config = CodecConfig::default();

        // 1 byte of id + 254 bytes of payload = 255 byte body, below threshold
        let below = encode_frame(0, &Raw(vec![7; 254]), Some(256), &config).unwrap();
        assert_eq!(&below[..3], &[0x80, 0x02, 0x00]);
        assert_eq!(below.len(), 2 + 1 + 255);

        // 256 byte body, compressed
        let at = encode_frame(0, &Raw(vec![7; 255]), Some(256), &config).unwrap();
        let inner = split_prefix(&at);
        assert_eq!(&inner[..2], &[0x80, 0x02]);
        assert!(at.len() < 256);

        for (frame, len) in [(below, 254), (at, 255)] {
            let (id, mut payload) = decode_frame(split_prefix(&frame), Some(256), &config).unwrap();
            assert_eq!(id, 0);
            assert_eq!(Raw::deserialize(&mut payload).unwrap(), Raw(vec![7; len]));
        }
    }

    #[test]
    fn test_zero_threshold_compresses_everything() {
        let config = CodecConfig::default();
        let frame = encode_frame(1, &Raw(Vec::new()), Some(0), &config).unwrap();
        let inner = split_prefix(&frame);
        assert_eq!(inner[0], 1, "data length should be the 1 byte body");

        let (id, payload) = decode_frame(inner, Some(0), &config).unwrap();
        assert_eq!(id, 1);
        assert_eq!(payload.remaining(), 0);
    }

    #[test]
    fn test_encode_validates_first() {
        let config = CodecConfig::default();
        let err = encode_frame(-1, &Raw(vec![]), None, &config).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Validation(ValidationError::OutOfRange { field: "packet_id", .. })
        ));

        let name = mcwire_protocol::LoginStart {
            username: "x".repeat(20),
        };
        let err = encode_frame(0, &name, None, &config).unwrap_err();
        assert!(matches!(err, CodecError::Validation(ValidationError::TooLong { .. })));
    }

    #[test]
    fn test_outbound_frame_limit() {
        let config = CodecConfig {
            max_frame_length: 16,
            ..CodecConfig::default()
        };
        let err = encode_frame(0, &Raw(vec![1; 32]), None, &config).unwrap_err();
        assert!(matches!(err, CodecError::SizeLimitExceeded { limit: 16, actual: 33 }));
    }

    #[test]
    fn test_check_frame_length() {
        let config = CodecConfig::default();
        let test_cases: Vec<(i32, bool)> = vec![
            (0, true),
            (2_097_151, true),
            (2_097_152, false),
            (-1, false),
        ];

        for (length, ok) in test_cases {
            let result = check_frame_length(length, &config);
            assert_eq!(result.is_ok(), ok, "Failed for {}", length);
            if !ok {
                assert!(matches!(result, Err(CodecError::MalformedInput(_))));
            }
        }
    }

    #[test]
    fn test_hostile_data_lengths() {
        let config = CodecConfig {
            max_uncompressed_length: 1024,
            ..CodecConfig::default()
        };

        // Declares far more than allowed; rejected before decompressing
        let mut frame = BytesMut::new();
        put_varuint(&mut frame, 1 << 24);
        frame.extend_from_slice(&[0x78, 0x9C]);
        assert!(matches!(
            decode_frame(&frame, Some(64), &config),
            Err(CodecError::SizeLimitExceeded { limit: 1024, actual: 16_777_216 })
        ));

        // Declares 100 bytes, inflates to 1000
        let mut frame = BytesMut::new();
        put_varuint(&mut frame, 100);
        frame.extend_from_slice(&compress_with_level(&[0u8; 1000], 6).unwrap());
        assert!(matches!(
            decode_frame(&frame, Some(64), &config),
            Err(CodecError::SizeLimitExceeded { limit: 100, .. })
        ));

        // Declares 100 bytes, inflates to 50
        let mut frame = BytesMut::new();
        put_varuint(&mut frame, 100);
        frame.extend_from_slice(&compress_with_level(&[0u8; 50], 6).unwrap());
        assert!(matches!(
            decode_frame(&frame, Some(64), &config),
            Err(CodecError::MalformedInput(_))
        ));

        // Negative data length
        let frame = [0xFF, 0xFF, 0xFF, 0xFF, 0x0F, 0x00];
        assert!(matches!(
            decode_frame(&frame, Some(64), &config),
            Err(CodecError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_corrupt_compressed_body() {
        let config = CodecConfig::default();
        let mut frame = BytesMut::new();
        put_varuint(&mut frame, 300);
        frame.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        assert!(matches!(
            decode_frame(&frame, Some(256), &config),
            Err(CodecError::Decompression(_))
        ));
    }

    #[test]
    fn test_negative_packet_id() {
        let config = CodecConfig::default();
        let frame = [0xFF, 0xFF, 0xFF, 0xFF, 0x0F];
        assert!(matches!(
            decode_frame(&frame, None, &config),
            Err(CodecError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_short_frame_header_is_malformed() {
        let config = CodecConfig::default();
        let test_cases: Vec<(&[u8], Option<u32>)> = vec![
            (&[], None),
            (&[0x80], None),
            (&[], Some(16)),
            (&[0x80], Some(16)),
            (&[0x00], Some(16)),
        ];

        for (frame, threshold) in test_cases {
            let result = decode_frame(frame, threshold, &config);
            assert!(
                matches!(result, Err(CodecError::MalformedInput(_))),
                "Failed for {:?} with {:?}: {:?}",
                frame,
                threshold,
                result
            );
        }
    }
}
