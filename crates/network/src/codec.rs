//! Streaming frame codec for `tokio_util::codec`
//!
//! [`PacketCodec`] only consumes bytes once a whole frame is buffered, so a
//! `FramedRead` built on it can be dropped or raced in `select!` without
//! losing stream position.

use bytes::{Buf, BytesMut};
use mcwire_config::CodecConfig;
use mcwire_core::{CodecError, Result, ValidationError};
use mcwire_protocol::codecs::decode_varuint;
use mcwire_protocol::Buffer;
use tokio_util::codec::{Decoder, Encoder};

use crate::framing::{check_frame_length, decode_frame, frame_body};

/// Frame decoder/encoder carrying the connection's threshold and limits
///
/// Items are `(packet_id, payload)`. On encode the payload's unread bytes are
/// sent, so a buffer fresh from `Serializable::serialize` goes out whole.
#[derive(Debug, Clone, Default)]
pub struct PacketCodec {
    compression_threshold: Option<u32>,
    config: CodecConfig,
}

impl PacketCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self {
            compression_threshold: None,
            config,
        }
    }

    pub fn compression_threshold(&self) -> Option<u32> {
        self.compression_threshold
    }

    /// Change the threshold used for frames after this call
    pub fn set_compression_threshold(&mut self, threshold: Option<u32>) {
        tracing::debug!("Codec compression threshold set to {:?}", threshold);
        self.compression_threshold = threshold;
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }
}

impl Decoder for PacketCodec {
    type Item = (i32, Buffer);
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let Some((length, prefix_length)) = decode_varuint(&src[..], 32)? else {
            return Ok(None);
        };
        let frame_length = check_frame_length(length as u32 as i32, &self.config)?;

        let total = prefix_length + frame_length;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(prefix_length);
        let frame = src.split_to(frame_length);
        decode_frame(&frame, self.compression_threshold, &self.config).map(Some)
    }
}

impl Encoder<(i32, Buffer)> for PacketCodec {
    type Error = CodecError;

    fn encode(&mut self, (packet_id, payload): (i32, Buffer), dst: &mut BytesMut) -> Result<()> {
        if packet_id < 0 {
            return Err(ValidationError::OutOfRange {
                field: "packet_id",
                value: i128::from(packet_id),
                min: 0,
                max: i128::from(i32::MAX),
            }
            .into());
        }

        let mut body = Buffer::with_capacity(payload.remaining() + 5);
        body.write_varint(packet_id);
        body.write(payload.remaining_slice());

        let frame = frame_body(body.as_slice(), self.compression_threshold, &self.config)?;
        dst.extend_from_slice(&frame);
        Ok(())
    }
}
