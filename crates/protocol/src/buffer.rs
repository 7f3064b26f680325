//! In-memory byte buffer with a forward-only read cursor
//!
//! A [`Buffer`] is created empty on the write path, or from received bytes on
//! the read path, and is discarded once its packet has been processed.
//!
//! # Invariants
//! - The read cursor never exceeds the written length.
//! - A read that needs more bytes than remain fails with `InsufficientData`
//!   and leaves the cursor where it was; reads never zero-pad.
//!
//! Fixed-width numbers use big-endian (network) byte order.

use bytes::{Buf, BufMut, BytesMut};
use mcwire_core::{CodecError, Result, ValidationError, MAX_STRING_LENGTH};

use crate::codecs;

/// Growable byte sequence plus a read position
#[derive(Debug, Clone)]
pub struct Buffer {
    data: BytesMut,
    pos: usize,
    max_string_length: usize,
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Buffer {
    /// Create an empty buffer for writing
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            pos: 0,
            max_string_length: MAX_STRING_LENGTH,
        }
    }

    /// Override the maximum string length (in characters) accepted by
    /// [`read_utf`](Self::read_utf) and [`write_utf`](Self::write_utf)
    pub fn with_max_string_length(mut self, max_string_length: usize) -> Self {
        self.max_string_length = max_string_length;
        self
    }

    /// Total number of written bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current read position
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// All written bytes, regardless of the read position
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Unread bytes, without consuming them
    #[inline]
    pub fn remaining_slice(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    pub fn into_bytes(self) -> BytesMut {
        self.data
    }

    /// Move the read position back to the start
    pub fn reset(&mut self) {
        self.pos = 0;
    }

    /// Drop all data and reset the read position
    pub fn clear(&mut self) {
        self.data.clear();
        self.pos = 0;
    }

    //=== Raw bytes ===//

    /// Append raw bytes
    #[inline]
    pub fn write(&mut self, data: &[u8]) {
        self.data.put_slice(data);
    }

    /// Read exactly `length` bytes
    ///
    /// # Errors
    /// `InsufficientData` if fewer than `length` bytes remain.
    pub fn read(&mut self, length: usize) -> Result<&[u8]> {
        self.ensure(length)?;
        let start = self.pos;
        self.pos += length;
        Ok(&self.data[start..self.pos])
    }

    /// Consume and return everything that is left
    pub fn read_remaining(&mut self) -> &[u8] {
        let start = self.pos;
        self.pos = self.data.len();
        &self.data[start..]
    }

    #[inline]
    fn ensure(&self, requested: usize) -> Result<()> {
        let available = self.remaining();
        if available < requested {
            return Err(CodecError::InsufficientData {
                offset: self.pos,
                requested,
                available,
            });
        }
        Ok(())
    }

    /// Run `f` over the next `length` bytes and advance past them
    #[inline]
    fn read_with<T>(&mut self, length: usize, f: impl FnOnce(&mut &[u8]) -> T) -> Result<T> {
        self.ensure(length)?;
        let mut chunk = &self.data[self.pos..self.pos + length];
        let value = f(&mut chunk);
        self.pos += length;
        Ok(value)
    }

    //=== Fixed-width values ===//

    /// Write a boolean as a single byte (0x00 or 0x01)
    pub fn write_bool(&mut self, value: bool) {
        self.data.put_u8(u8::from(value));
    }

    /// Read a boolean
    ///
    /// # Errors
    /// `MalformedInput` for any byte other than 0x00 or 0x01.
    pub fn read_bool(&mut self) -> Result<bool> {
        let offset = self.pos;
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => {
                self.pos = offset;
                Err(CodecError::MalformedInput(format!(
                    "Invalid boolean byte 0x{:02X} at offset {}",
                    other, offset
                )))
            }
        }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.data.put_u8(value);
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_with(1, |b| b.get_u8())
    }

    pub fn write_i8(&mut self, value: i8) {
        self.data.put_i8(value);
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.read_with(1, |b| b.get_i8())
    }

    pub fn write_u16(&mut self, value: u16) {
        self.data.put_u16(value);
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_with(2, |b| b.get_u16())
    }

    pub fn write_i16(&mut self, value: i16) {
        self.data.put_i16(value);
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.read_with(2, |b| b.get_i16())
    }

    pub fn write_u32(&mut self, value: u32) {
        self.data.put_u32(value);
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_with(4, |b| b.get_u32())
    }

    pub fn write_i32(&mut self, value: i32) {
        self.data.put_i32(value);
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_with(4, |b| b.get_i32())
    }

    pub fn write_u64(&mut self, value: u64) {
        self.data.put_u64(value);
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_with(8, |b| b.get_u64())
    }

    pub fn write_i64(&mut self, value: i64) {
        self.data.put_i64(value);
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.read_with(8, |b| b.get_i64())
    }

    pub fn write_f32(&mut self, value: f32) {
        self.data.put_f32(value);
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.read_with(4, |b| b.get_f32())
    }

    pub fn write_f64(&mut self, value: f64) {
        self.data.put_f64(value);
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.read_with(8, |b| b.get_f64())
    }

    //=== Variable-length integers ===//

    /// Write an unsigned varint limited to `max_bits`
    ///
    /// # Errors
    /// `ValidationError::OutOfRange` when `value` needs more than `max_bits`.
    pub fn write_varuint(&mut self, value: u64, max_bits: u32) -> Result<()> {
        codecs::write_varuint(&mut self.data, value, max_bits)
    }

    /// Read an unsigned varint limited to `max_bits`
    ///
    /// # Errors
    /// - `MalformedInput` if the continuation run is too long or the value
    ///   does not fit in `max_bits`
    /// - `InsufficientData` if the buffer ends mid-varint
    pub fn read_varuint(&mut self, max_bits: u32) -> Result<u64> {
        let src = self.remaining_slice();
        match codecs::decode_varuint(src, max_bits)? {
            Some((value, consumed)) => {
                self.pos += consumed;
                Ok(value)
            }
            None => Err(CodecError::InsufficientData {
                offset: self.pos,
                requested: src.len() + 1,
                available: src.len(),
            }),
        }
    }

    /// Write a 32-bit signed varint (at most 5 bytes)
    pub fn write_varint(&mut self, value: i32) {
        codecs::write_varint(&mut self.data, value);
    }

    /// Read a 32-bit signed varint
    pub fn read_varint(&mut self) -> Result<i32> {
        Ok(self.read_varuint(32)? as u32 as i32)
    }

    /// Write a 16-bit signed varshort (at most 3 bytes)
    pub fn write_varshort(&mut self, value: i16) {
        codecs::put_varuint(&mut self.data, u64::from(value as u16));
    }

    /// Read a 16-bit signed varshort
    pub fn read_varshort(&mut self) -> Result<i16> {
        Ok(self.read_varuint(16)? as u16 as i16)
    }

    /// Write a 64-bit signed varlong (at most 10 bytes)
    pub fn write_varlong(&mut self, value: i64) {
        codecs::write_varlong(&mut self.data, value);
    }

    /// Read a 64-bit signed varlong
    pub fn read_varlong(&mut self) -> Result<i64> {
        Ok(self.read_varuint(64)? as i64)
    }

    //=== Strings and byte arrays ===//

    /// Write a UTF-8 string prefixed with its byte length as a varint
    ///
    /// # Errors
    /// `ValidationError::TooLong` if the string has more characters than the
    /// configured maximum.
    pub fn write_utf(&mut self, value: &str) -> Result<()> {
        let chars = value.chars().count();
        if chars > self.max_string_length {
            return Err(ValidationError::TooLong {
                field: "string",
                length: chars,
                max: self.max_string_length,
            }
            .into());
        }
        self.write_length_prefix("string", value.len())?;
        self.write(value.as_bytes());
        Ok(())
    }

    /// Read a varint-length-prefixed UTF-8 string
    ///
    /// # Errors
    /// - `MalformedInput` if the declared length is negative, larger than the
    ///   byte budget of the maximum string length, not valid UTF-8, or holds
    ///   too many characters
    /// - `InsufficientData` if the buffer ends before the declared length
    pub fn read_utf(&mut self) -> Result<String> {
        let offset = self.pos;
        let length = self.read_varint()?;
        let max_chars = self.max_string_length;
        let max_bytes = max_chars.saturating_mul(4);

        if length < 0 {
            self.pos = offset;
            return Err(CodecError::MalformedInput(format!(
                "Negative string length {} at offset {}",
                length, offset
            )));
        }
        if length as usize > max_bytes {
            self.pos = offset;
            return Err(CodecError::MalformedInput(format!(
                "String length {} exceeds maximum of {} bytes",
                length, max_bytes
            )));
        }

        let bytes = match self.read(length as usize) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.pos = offset;
                return Err(e);
            }
        };
        let value = match std::str::from_utf8(bytes) {
            Ok(value) => value.to_owned(),
            Err(e) => {
                self.pos = offset;
                return Err(CodecError::MalformedInput(format!(
                    "Invalid UTF-8 in string at offset {}: {}",
                    offset, e
                )));
            }
        };

        let chars = value.chars().count();
        if chars > max_chars {
            self.pos = offset;
            return Err(CodecError::MalformedInput(format!(
                "String at offset {} holds {} characters, maximum is {}",
                offset, chars, max_chars
            )));
        }
        Ok(value)
    }

    /// Write a NUL-terminated ASCII string
    pub fn write_ascii(&mut self, value: &str) -> Result<()> {
        if !value.is_ascii() || value.contains('\0') {
            return Err(ValidationError::Invalid {
                field: "ascii string",
                reason: "must be ASCII without embedded NUL".into(),
            }
            .into());
        }
        self.write(value.as_bytes());
        self.write_u8(0);
        Ok(())
    }

    /// Read a NUL-terminated ASCII string
    pub fn read_ascii(&mut self) -> Result<String> {
        let src = self.remaining_slice();
        let Some(end) = src.iter().position(|&b| b == 0) else {
            return Err(CodecError::InsufficientData {
                offset: self.pos,
                requested: src.len() + 1,
                available: src.len(),
            });
        };
        if !src[..end].is_ascii() {
            return Err(CodecError::MalformedInput(format!(
                "Non-ASCII byte in string at offset {}",
                self.pos
            )));
        }
        let value = String::from_utf8_lossy(&src[..end]).into_owned();
        self.pos += end + 1;
        Ok(value)
    }

    /// Write bytes prefixed with their length as a varint
    ///
    /// # Errors
    /// `ValidationError::TooLong` if the length does not fit in a varint.
    pub fn write_bytearray(&mut self, value: &[u8]) -> Result<()> {
        self.write_length_prefix("byte array", value.len())?;
        self.write(value);
        Ok(())
    }

    fn write_length_prefix(&mut self, field: &'static str, length: usize) -> Result<()> {
        let prefix = i32::try_from(length).map_err(|_| ValidationError::TooLong {
            field,
            length,
            max: i32::MAX as usize,
        })?;
        self.write_varint(prefix);
        Ok(())
    }

    /// Read varint-length-prefixed bytes
    pub fn read_bytearray(&mut self) -> Result<Vec<u8>> {
        let offset = self.pos;
        let length = self.read_varint()?;
        if length < 0 {
            self.pos = offset;
            return Err(CodecError::MalformedInput(format!(
                "Negative byte array length {} at offset {}",
                length, offset
            )));
        }
        match self.read(length as usize) {
            Ok(bytes) => Ok(bytes.to_vec()),
            Err(e) => {
                self.pos = offset;
                Err(e)
            }
        }
    }

    //=== Optional values ===//

    /// Write a presence flag, then the value through `writer` when present
    pub fn write_optional<T>(
        &mut self,
        value: Option<&T>,
        writer: impl FnOnce(&mut Self, &T) -> Result<()>,
    ) -> Result<()> {
        match value {
            Some(value) => {
                self.write_bool(true);
                writer(self, value)
            }
            None => {
                self.write_bool(false);
                Ok(())
            }
        }
    }

    /// Read a presence flag, then the value through `reader` when present
    pub fn read_optional<T>(
        &mut self,
        reader: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<Option<T>> {
        if self.read_bool()? {
            reader(self).map(Some)
        } else {
            Ok(None)
        }
    }
}

impl From<&[u8]> for Buffer {
    fn from(data: &[u8]) -> Self {
        Self::from(BytesMut::from(data))
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Self {
        Self::from(&data[..])
    }
}

impl From<BytesMut> for Buffer {
    fn from(data: BytesMut) -> Self {
        Self {
            data,
            pos: 0,
            max_string_length: MAX_STRING_LENGTH,
        }
    }
}
