//! # mcwire Protocol Library
//!
//! Binary value encoding for the Minecraft-style wire protocol.
//!
//! ## Architecture
//!
//! ### 1. Codecs Layer ([`codecs`])
//! Variable-length integers: 7 payload bits per byte, least significant group
//! first, continuation flag in the high bit. 32-bit values take at most 5
//! bytes, 64-bit values at most 10.
//!
//! ### 2. Buffer ([`buffer`])
//! A growable byte sequence with a read cursor. Fixed-width values are
//! big-endian. Strings, byte arrays and optionals are length or flag prefixed.
//!
//! ### 3. Serializable Contract ([`serializable`])
//! `serialize_to`, `deserialize` and `validate` for every value type.
//!
//! ### 4. Bit Sets ([`bitset`])
//! Length-prefixed [`BitSet`] and context-sized [`FixedBitSet`].
//!
//! ### 5. Packets ([`packets`], [`packet_types`])
//! The [`Packet`] trait, handshake/status/login packet structures and the
//! per-direction registries used to decode a payload by id.
//!
//! ### 6. Compression ([`compression`])
//! Stateless zlib with a hard output limit.
//!
//! ## Usage Example
//!
//! ```rust
//! use mcwire_protocol::{Buffer, Handshake, Serializable};
//! use mcwire_core::NextState;
//!
//! let handshake = Handshake::new(757, "localhost", 25565, NextState::Status).unwrap();
//! let mut buf = handshake.serialize().unwrap();
//!
//! let decoded = Handshake::deserialize(&mut buf).unwrap();
//! assert_eq!(decoded, handshake);
//! ```

pub mod bitset;
pub mod buffer;
pub mod codecs;
pub mod compression;
pub mod packet_types;
pub mod packets;
pub mod serializable;

pub use bitset::{BitSet, FixedBitSet};
pub use buffer::Buffer;
pub use packet_types::*;
pub use packets::{ClientboundPacket, Packet, ServerboundPacket};
pub use serializable::{Serializable, VarInt, VarLong};
