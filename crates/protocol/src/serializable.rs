//! The `Serializable` contract shared by every protocol value type
//!
//! A type's wire shape is fixed per protocol version; this layer only defines
//! how it is written to and read from a [`Buffer`].
//!
//! `deserialize` never calls `validate` on its own. Callers that need a valid
//! domain value check it explicitly after decoding, and constructors check it
//! when building fresh values.

use mcwire_core::{Result, ValidationError};

use crate::buffer::Buffer;

/// Encode/decode/validate capability implemented per concrete type
pub trait Serializable: Sized {
    /// Append the canonical encoding of `self` to `buf`
    fn serialize_to(&self, buf: &mut Buffer) -> Result<()>;

    /// Consume exactly this value's bytes from `buf` and rebuild it
    fn deserialize(buf: &mut Buffer) -> Result<Self>;

    /// Check field invariants
    ///
    /// Must be free of side effects so repeated calls agree.
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        Ok(())
    }

    /// Serialize into a fresh buffer
    fn serialize(&self) -> Result<Buffer> {
        let mut buf = Buffer::new();
        self.serialize_to(&mut buf)?;
        Ok(buf)
    }
}

macro_rules! fixed_width {
    ($($ty:ty => $write:ident, $read:ident;)*) => {
        $(
            impl Serializable for $ty {
                #[inline]
                fn serialize_to(&self, buf: &mut Buffer) -> Result<()> {
                    buf.$write(*self);
                    Ok(())
                }

                #[inline]
                fn deserialize(buf: &mut Buffer) -> Result<Self> {
                    buf.$read()
                }
            }
        )*
    };
}

fixed_width! {
    bool => write_bool, read_bool;
    u8 => write_u8, read_u8;
    i8 => write_i8, read_i8;
    u16 => write_u16, read_u16;
    i16 => write_i16, read_i16;
    u32 => write_u32, read_u32;
    i32 => write_i32, read_i32;
    u64 => write_u64, read_u64;
    i64 => write_i64, read_i64;
    f32 => write_f32, read_f32;
    f64 => write_f64, read_f64;
}

impl Serializable for String {
    fn serialize_to(&self, buf: &mut Buffer) -> Result<()> {
        buf.write_utf(self)
    }

    fn deserialize(buf: &mut Buffer) -> Result<Self> {
        buf.read_utf()
    }
}

/// 32-bit integer encoded as a varint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VarInt(pub i32);

impl Serializable for VarInt {
    fn serialize_to(&self, buf: &mut Buffer) -> Result<()> {
        buf.write_varint(self.0);
        Ok(())
    }

    fn deserialize(buf: &mut Buffer) -> Result<Self> {
        buf.read_varint().map(Self)
    }
}

/// 64-bit integer encoded as a varlong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VarLong(pub i64);

impl Serializable for VarLong {
    fn serialize_to(&self, buf: &mut Buffer) -> Result<()> {
        buf.write_varlong(self.0);
        Ok(())
    }

    fn deserialize(buf: &mut Buffer) -> Result<Self> {
        buf.read_varlong().map(Self)
    }
}
