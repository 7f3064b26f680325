//! # mcwire Networking Layer
//!
//! Length-prefixed packet framing over blocking and Tokio transports, with
//! threshold-driven zlib compression.
//!
//! ## Modules
//!
//! - [`transport`] - Blocking and async byte-stream transports
//! - [`framing`] - Pure frame encode/decode with untrusted length guards
//! - [`connection`] - Packet read/write operations and connection state
//! - [`codec`] - `tokio_util` codec for cancellation safe streaming reads

pub mod codec;
pub mod connection;
pub mod framing;
pub mod transport;

// Re-export commonly used items
pub use codec::PacketCodec;
pub use connection::{
    async_read_packet, async_write_packet, sync_read_packet, sync_write_packet, AsyncConnection,
    SyncConnection,
};
pub use framing::{decode_frame, encode_frame};
pub use transport::{AsyncTransport, SyncTransport};
