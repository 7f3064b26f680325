//! Variable-length integer codecs
//!
//! Varints carry 7 payload bits per byte. The most significant bit of each byte
//! is a continuation flag, set on every byte except the last. Groups are written
//! least significant first.
//!
//! Signed values are mapped to their two's complement unsigned form before
//! encoding, so `-1i32` always takes the full 5 bytes.
//!
//! These functions work directly on `BytesMut`/`&[u8]` so that both [`Buffer`]
//! and the streaming frame decoder can share them.
//!
//! [`Buffer`]: crate::Buffer

use bytes::{BufMut, BytesMut};
use mcwire_core::{CodecError, Result, ValidationError};

/// Maximum encoded size of a 32-bit varint
pub const VARINT_MAX_BYTES: usize = 5;

/// Maximum encoded size of a 64-bit varlong
pub const VARLONG_MAX_BYTES: usize = 10;

/// Number of bytes a varint of `max_bits` width may occupy
#[inline]
pub const fn max_varuint_bytes(max_bits: u32) -> usize {
    ((max_bits + 6) / 7) as usize
}

/// Number of bytes `value` occupies once varint encoded
#[inline]
pub fn varint_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.max(1).div_ceil(7)
}

/// Append `value` as a varint without any range check
#[inline]
pub fn put_varuint(buf: &mut BytesMut, value: u64) {
    let mut remaining = value;
    loop {
        if remaining & !0x7F == 0 {
            buf.put_u8(remaining as u8);
            return;
        }
        buf.put_u8((remaining & 0x7F) as u8 | 0x80);
        remaining >>= 7;
    }
}

/// Append `value` as a varint, rejecting values wider than `max_bits`
pub fn write_varuint(buf: &mut BytesMut, value: u64, max_bits: u32) -> Result<()> {
    if max_bits < 64 && value >> max_bits != 0 {
        return Err(ValidationError::OutOfRange {
            field: "varuint",
            value: i128::from(value),
            min: 0,
            max: (1i128 << max_bits) - 1,
        }
        .into());
    }
    put_varuint(buf, value);
    Ok(())
}

/// Append a signed 32-bit varint
#[inline]
pub fn write_varint(buf: &mut BytesMut, value: i32) {
    put_varuint(buf, u64::from(value as u32));
}

/// Append a signed 64-bit varlong
#[inline]
pub fn write_varlong(buf: &mut BytesMut, value: i64) {
    put_varuint(buf, value as u64);
}

/// Try to decode a varint of at most `max_bits` from the start of `src`
///
/// # Returns
/// - `Ok(Some((value, consumed)))` when a complete varint was found
/// - `Ok(None)` when `src` ends before the final byte (need more bytes)
///
/// # Errors
/// `MalformedInput` when the continuation run is longer than `max_bits`
/// allows, or when the accumulated value does not fit in `max_bits`.
pub fn decode_varuint(src: &[u8], max_bits: u32) -> Result<Option<(u64, usize)>> {
    let max_bytes = max_varuint_bytes(max_bits);
    let mut result: u64 = 0;

    for (i, &byte) in src.iter().take(max_bytes).enumerate() {
        let group = u64::from(byte & 0x7F);
        let shift = 7 * i as u32;

        if shift >= 64 || (group << shift) >> shift != group {
            return Err(out_of_range(max_bits));
        }
        result |= group << shift;

        if max_bits < 64 && result >> max_bits != 0 {
            return Err(out_of_range(max_bits));
        }

        if byte & 0x80 == 0 {
            return Ok(Some((result, i + 1)));
        }

        if i + 1 == max_bytes {
            return Err(CodecError::MalformedInput(format!(
                "Varint continues past {} bytes allowed for a {}-bit integer",
                max_bytes, max_bits
            )));
        }
    }

    Ok(None)
}

fn out_of_range(max_bits: u32) -> CodecError {
    CodecError::MalformedInput(format!(
        "Received varint was outside the range of a {}-bit integer",
        max_bits
    ))
}
