//! Packet reads and writes over a transport
//!
//! The four free functions run the framing algorithm with default limits and
//! an explicit compression threshold. [`SyncConnection`] and
//! [`AsyncConnection`] own the transport together with the connection's
//! [`CodecConfig`] and threshold, so callers do not have to thread them
//! through every call.
//!
//! Both modes produce identical bytes. The async mode suspends only while
//! waiting on the transport; framing and compression run between those
//! points without yielding.
//!
//! # Cancellation
//!
//! Dropping an in-flight `async_read_packet` or `async_write_packet` future
//! part way through a frame leaves the transport mid-frame, and the stream
//! cannot be resumed. Use [`AsyncConnection::into_framed`] or
//! [`PacketCodec`] with `FramedRead` when reads must survive cancellation (e.g. inside `select!`).

use mcwire_config::CodecConfig;
use mcwire_core::{CodecError, Result};
use mcwire_protocol::codecs::decode_varuint;
use mcwire_protocol::packet_types::LoginSetCompression;
use mcwire_protocol::{Buffer, Packet, Serializable};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

use crate::codec::PacketCodec;
use crate::framing::{check_frame_length, decode_frame, encode_frame};
use crate::transport::{AsyncTransport, SyncTransport};

/// Frame and write one packet, blocking until it is flushed
pub fn sync_write_packet<T, P>(
    transport: &mut T,
    packet_id: i32,
    payload: &P,
    compression_threshold: Option<u32>,
) -> Result<()>
where
    T: SyncTransport + ?Sized,
    P: Serializable,
{
    write_frame_sync(transport, packet_id, payload, compression_threshold, &CodecConfig::default())
}

/// Read one packet, blocking until the whole frame has arrived
///
/// Returns the packet id and a buffer positioned at the payload.
pub fn sync_read_packet<T>(transport: &mut T, compression_threshold: Option<u32>) -> Result<(i32, Buffer)>
where
    T: SyncTransport + ?Sized,
{
    read_frame_sync(transport, compression_threshold, &CodecConfig::default())
}

/// Frame and write one packet
pub async fn async_write_packet<T, P>(
    transport: &mut T,
    packet_id: i32,
    payload: &P,
    compression_threshold: Option<u32>,
) -> Result<()>
where
    T: AsyncTransport + ?Sized,
    P: Serializable,
{
    write_frame_async(transport, packet_id, payload, compression_threshold, &CodecConfig::default()).await
}

/// Read one packet
///
/// Returns the packet id and a buffer positioned at the payload.
pub async fn async_read_packet<T>(transport: &mut T, compression_threshold: Option<u32>) -> Result<(i32, Buffer)>
where
    T: AsyncTransport + ?Sized,
{
    read_frame_async(transport, compression_threshold, &CodecConfig::default()).await
}

fn write_frame_sync<T, P>(
    transport: &mut T,
    packet_id: i32,
    payload: &P,
    compression_threshold: Option<u32>,
    config: &CodecConfig,
) -> Result<()>
where
    T: SyncTransport + ?Sized,
    P: Serializable,
{
    let frame = encode_frame(packet_id, payload, compression_threshold, config)?;
    transport.write_bytes(&frame)
}

fn read_frame_sync<T>(
    transport: &mut T,
    compression_threshold: Option<u32>,
    config: &CodecConfig,
) -> Result<(i32, Buffer)>
where
    T: SyncTransport + ?Sized,
{
    // The length prefix is read a byte at a time so nothing past it is consumed
    let mut prefix = Vec::with_capacity(5);
    let frame_length = loop {
        prefix.extend_from_slice(&transport.read_bytes(1)?);
        if let Some((length, _)) = decode_varuint(&prefix, 32)? {
            break check_frame_length(length as u32 as i32, config)?;
        }
    };

    let frame = transport.read_bytes(frame_length)?;
    decode_frame(&frame, compression_threshold, config)
}

async fn write_frame_async<T, P>(
    transport: &mut T,
    packet_id: i32,
    payload: &P,
    compression_threshold: Option<u32>,
    config: &CodecConfig,
) -> Result<()>
where
    T: AsyncTransport + ?Sized,
    P: Serializable,
{
    let frame = encode_frame(packet_id, payload, compression_threshold, config)?;
    transport.write_bytes(&frame).await
}

async fn read_frame_async<T>(
    transport: &mut T,
    compression_threshold: Option<u32>,
    config: &CodecConfig,
) -> Result<(i32, Buffer)>
where
    T: AsyncTransport + ?Sized,
{
    let mut prefix = Vec::with_capacity(5);
    let frame_length = loop {
        prefix.extend_from_slice(&transport.read_bytes(1).await?);
        if let Some((length, _)) = decode_varuint(&prefix, 32)? {
            break check_frame_length(length as u32 as i32, config)?;
        }
    };

    let frame = transport.read_bytes(frame_length).await?;
    decode_frame(&frame, compression_threshold, config)
}

/// Install `threshold` once, refusing a second call
fn install_threshold(slot: &mut Option<u32>, threshold: u32) -> Result<()> {
    if let Some(current) = *slot {
        return Err(CodecError::Protocol(format!(
            "Compression threshold already set to {}",
            current
        )));
    }

    tracing::debug!("Compression enabled for packets of {} bytes or more", threshold);
    *slot = Some(threshold);
    Ok(())
}

fn apply_threshold(slot: &mut Option<u32>, packet: &LoginSetCompression) -> Result<()> {
    match packet.compression_threshold() {
        Some(threshold) => install_threshold(slot, threshold),
        None => {
            tracing::debug!("Peer sent threshold {}, compression stays off", packet.threshold);
            Ok(())
        }
    }
}

fn expect_packet<P: Packet>(packet_id: i32, mut payload: Buffer) -> Result<P> {
    if packet_id != P::PACKET_ID {
        return Err(CodecError::Protocol(format!(
            "Expected packet {:#04x} but received {:#04x}",
            P::PACKET_ID,
            packet_id
        )));
    }
    P::deserialize(&mut payload)
}

/// Blocking connection state
#[derive(Debug)]
pub struct SyncConnection<T> {
    transport: T,
    config: CodecConfig,
    compression_threshold: Option<u32>,
}

impl<T: SyncTransport> SyncConnection<T> {
    /// Wrap a transport with default limits and compression off
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, CodecConfig::default())
    }

    pub fn with_config(transport: T, config: CodecConfig) -> Self {
        Self {
            transport,
            config,
            compression_threshold: None,
        }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn compression_threshold(&self) -> Option<u32> {
        self.compression_threshold
    }

    /// Turn compression on for the rest of the session
    ///
    /// # Errors
    /// `Protocol` if a threshold was already installed.
    pub fn set_compression_threshold(&mut self, threshold: u32) -> Result<()> {
        install_threshold(&mut self.compression_threshold, threshold)
    }

    /// Install the threshold carried by a [`LoginSetCompression`] packet
    pub fn apply_set_compression(&mut self, packet: &LoginSetCompression) -> Result<()> {
        apply_threshold(&mut self.compression_threshold, packet)
    }

    pub fn write_packet<P: Serializable>(&mut self, packet_id: i32, payload: &P) -> Result<()> {
        write_frame_sync(
            &mut self.transport,
            packet_id,
            payload,
            self.compression_threshold,
            &self.config,
        )
    }

    pub fn read_packet(&mut self) -> Result<(i32, Buffer)> {
        read_frame_sync(&mut self.transport, self.compression_threshold, &self.config)
    }

    /// Write a packet under its own id
    pub fn write_typed<P: Packet>(&mut self, packet: &P) -> Result<()> {
        self.write_packet(P::PACKET_ID, packet)
    }

    /// Read a packet that must be a `P`
    ///
    /// # Errors
    /// `Protocol` if a different packet id arrives.
    pub fn read_typed<P: Packet>(&mut self) -> Result<P> {
        let (packet_id, payload) = self.read_packet()?;
        expect_packet(packet_id, payload)
    }

    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }
}

/// Async connection state
///
/// Reads and writes are not cancellation safe, see the module docs.
#[derive(Debug)]
pub struct AsyncConnection<T> {
    transport: T,
    config: CodecConfig,
    compression_threshold: Option<u32>,
}

impl<T: AsyncTransport> AsyncConnection<T> {
    /// Wrap a transport with default limits and compression off
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, CodecConfig::default())
    }

    pub fn with_config(transport: T, config: CodecConfig) -> Self {
        Self {
            transport,
            config,
            compression_threshold: None,
        }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn compression_threshold(&self) -> Option<u32> {
        self.compression_threshold
    }

    /// Turn compression on for the rest of the session
    ///
    /// # Errors
    /// `Protocol` if a threshold was already installed.
    pub fn set_compression_threshold(&mut self, threshold: u32) -> Result<()> {
        install_threshold(&mut self.compression_threshold, threshold)
    }

    /// Install the threshold carried by a [`LoginSetCompression`] packet
    pub fn apply_set_compression(&mut self, packet: &LoginSetCompression) -> Result<()> {
        apply_threshold(&mut self.compression_threshold, packet)
    }

    pub async fn write_packet<P: Serializable>(&mut self, packet_id: i32, payload: &P) -> Result<()> {
        write_frame_async(
            &mut self.transport,
            packet_id,
            payload,
            self.compression_threshold,
            &self.config,
        )
        .await
    }

    pub async fn read_packet(&mut self) -> Result<(i32, Buffer)> {
        read_frame_async(&mut self.transport, self.compression_threshold, &self.config).await
    }

    /// Write a packet under its own id
    pub async fn write_typed<P: Packet>(&mut self, packet: &P) -> Result<()> {
        self.write_packet(P::PACKET_ID, packet).await
    }

    /// Read a packet that must be a `P`
    ///
    /// # Errors
    /// `Protocol` if a different packet id arrives.
    pub async fn read_typed<P: Packet>(&mut self) -> Result<P> {
        let (packet_id, payload) = self.read_packet().await?;
        expect_packet(packet_id, payload)
    }

    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Switch to the cancellation safe [`PacketCodec`], keeping limits and threshold
    pub fn into_framed(self) -> Framed<T, PacketCodec>
    where
        T: AsyncRead + AsyncWrite,
    {
        let mut codec = PacketCodec::new(self.config);
        codec.set_compression_threshold(self.compression_threshold);
        Framed::new(self.transport, codec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcwire_core::NextState;
    use mcwire_protocol::{Handshake, LoginStart, LoginSuccess, StatusPing};
    use std::io::{Cursor, ErrorKind, Read, Write};

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

    /// Hands out one byte per read, interrupting every other call
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        interrupt: bool,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(ErrorKind::Interrupted.into());
            }
            if self.pos >= self.data.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.data[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn written(threshold: Option<u32>, packet_id: i32, payload: &Raw) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        sync_write_packet(&mut out, packet_id, payload, threshold).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_end_to_end_without_threshold() {
        let payload = Raw((0..10).collect());
        let bytes = written(None, 3, &payload);

        let mut expected = vec![11, 3];
        expected.extend(0..10u8);
        assert_eq!(bytes, expected);

        let mut input = Cursor::new(bytes);
        let (id, mut body) = sync_read_packet(&mut input, None).unwrap();
        assert_eq!(id, 3);
        assert_eq!(Raw::deserialize(&mut body).unwrap(), payload);
    }

    #[test]
    fn test_threshold_compares_body_length() {
        let test_cases: Vec<(usize, bool)> = vec![(254, false), (255, true), (4096, true)];

        for (payload_len, compressed) in test_cases {
            let payload = Raw(vec![0x41; payload_len]);
            let bytes = written(Some(256), 0, &payload);

            let mut input = Cursor::new(bytes.clone());
            let mut prefix = Vec::new();
            loop {
                prefix.extend_from_slice(&SyncTransport::read_bytes(&mut input, 1).unwrap());
                if decode_varuint(&prefix, 32).unwrap().is_some() {
                    break;
                }
            }
            let marker = SyncTransport::read_bytes(&mut input, 1).unwrap()[0];
            assert_eq!(marker != 0, compressed, "Failed for {}", payload_len);

            let mut input = Cursor::new(bytes);
            let (id, mut body) = sync_read_packet(&mut input, Some(256)).unwrap();
            assert_eq!(id, 0);
            assert_eq!(Raw::deserialize(&mut body).unwrap(), payload);
        }
    }

    #[test]
    fn test_truncated_stream_is_connection_closed() {
        let mut bytes = written(None, 1, &Raw(vec![9; 20]));
        bytes.pop();

        let mut input = Cursor::new(bytes);
        match sync_read_packet(&mut input, None).unwrap_err() {
            CodecError::ConnectionClosed { received, expected } => {
                assert_eq!(expected, 21);
                assert_eq!(received, 20);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let mut empty = Cursor::new(Vec::<u8>::new());
        assert!(matches!(
            sync_read_packet(&mut empty, None),
            Err(CodecError::ConnectionClosed { received: 0, expected: 1 })
        ));
    }

    #[test]
    fn test_oversized_frame_rejected_before_reading() {
        let config = CodecConfig {
            max_frame_length: 64,
            ..CodecConfig::default()
        };
        // Claims 1000 bytes but carries none
        let mut conn = SyncConnection::with_config(Cursor::new(vec![0xE8, 0x07]), config);
        assert!(matches!(conn.read_packet(), Err(CodecError::MalformedInput(_))));

        let mut conn = SyncConnection::new(Cursor::new(vec![0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]));
        assert!(matches!(conn.read_packet(), Err(CodecError::MalformedInput(_))));
    }

    #[test]
    fn test_partial_reads_are_retried() {
        let payload = Raw(vec![5; 300]);
        let mut trickle = Trickle {
            data: Vec::new(),
            pos: 0,
            interrupt: false,
        };
        sync_write_packet(&mut trickle, 2, &payload, Some(64)).unwrap();
        assert_eq!(trickle.data[..], written(Some(64), 2, &payload)[..]);

        let (id, mut body) = sync_read_packet(&mut trickle, Some(64)).unwrap();
        assert_eq!(id, 2);
        assert_eq!(Raw::deserialize(&mut body).unwrap(), payload);
    }

    #[test]
    fn test_threshold_set_once() {
        let mut conn = SyncConnection::new(Cursor::new(Vec::<u8>::new()));
        assert_eq!(conn.compression_threshold(), None);

        conn.apply_set_compression(&LoginSetCompression { threshold: -1 }).unwrap();
        assert_eq!(conn.compression_threshold(), None);

        conn.apply_set_compression(&LoginSetCompression { threshold: 256 }).unwrap();
        assert_eq!(conn.compression_threshold(), Some(256));

        let err = conn.set_compression_threshold(512).unwrap_err();
        assert!(matches!(err, CodecError::Protocol(_)));
        assert_eq!(conn.compression_threshold(), Some(256));
    }

    #[test]
    fn test_sync_typed_roundtrip() {
        let mut conn = SyncConnection::new(Cursor::new(Vec::<u8>::new()));
        conn.set_compression_threshold(8).unwrap();

        let success = LoginSuccess {
            uuid: 0x1234,
            username: "Alex".into(),
        };
        conn.write_typed(&success).unwrap();
        conn.write_typed(&StatusPing { payload: 1 }).unwrap();
        conn.get_mut().set_position(0);

        assert_eq!(conn.read_typed::<LoginSuccess>().unwrap(), success);
        // Id 0x01 arrives where LoginSuccess (0x02) is expected
        assert!(matches!(
            conn.read_typed::<LoginSuccess>(),
            Err(CodecError::Protocol(_))
        ));
    }

    #[test]
    fn test_invalid_payload_writes_nothing() {
        let mut conn = SyncConnection::new(Cursor::new(Vec::<u8>::new()));
        let packet = LoginStart {
            username: "this_name_is_too_long".into(),
        };
        assert!(matches!(conn.write_typed(&packet), Err(CodecError::Validation(_))));
        assert!(conn.into_inner().into_inner().is_empty());
    }

    #[tokio::test]
    async fn test_async_matches_sync_bytes() {
        let payload = Raw(vec![0x42; 512]);
        let (mut client, mut server) = tokio::io::duplex(4096);

        async_write_packet(&mut client, 7, &payload, Some(256)).await.unwrap();
        drop(client);

        let mut received = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut server, &mut received).await.unwrap();
        assert_eq!(received, written(Some(256), 7, &payload));

        let mut input = Cursor::new(received);
        let (id, mut body) = async_read_packet(&mut input, Some(256)).await.unwrap();
        assert_eq!(id, 7);
        assert_eq!(Raw::deserialize(&mut body).unwrap(), payload);
    }

    #[tokio::test]
    async fn test_async_connection_handshake_flow() {
        let (client, server) = tokio::io::duplex(1024);
        let mut client = AsyncConnection::new(client);
        let mut server = AsyncConnection::new(server);

        let handshake = Handshake::new(757, "localhost", 25565, NextState::Login).unwrap();
        client.write_typed(&handshake).await.unwrap();
        assert_eq!(server.read_typed::<Handshake>().await.unwrap(), handshake);

        let set_compression = LoginSetCompression { threshold: 64 };
        server.write_typed(&set_compression).await.unwrap();
        server.apply_set_compression(&set_compression).unwrap();

        let received = client.read_typed::<LoginSetCompression>().await.unwrap();
        client.apply_set_compression(&received).unwrap();
        assert_eq!(client.compression_threshold(), Some(64));

        let success = LoginSuccess {
            uuid: u128::MAX,
            username: "a".repeat(16),
        };
        server.write_typed(&success).await.unwrap();
        assert_eq!(client.read_typed::<LoginSuccess>().await.unwrap(), success);
    }

    #[tokio::test]
    async fn test_into_framed_keeps_threshold() {
        use futures::{SinkExt, StreamExt};

        let (client, server) = tokio::io::duplex(1024);
        let mut client = AsyncConnection::new(client);
        client.set_compression_threshold(4).unwrap();
        let mut server = AsyncConnection::new(server);
        server.set_compression_threshold(4).unwrap();

        let mut framed = client.into_framed();
        assert_eq!(framed.codec().compression_threshold(), Some(4));

        let ping = StatusPing { payload: 77 };
        framed.send((0x01, ping.serialize().unwrap())).await.unwrap();
        assert_eq!(server.read_typed::<StatusPing>().await.unwrap(), ping);

        server.write_typed(&ping).await.unwrap();
        let (id, mut payload) = framed.next().await.unwrap().unwrap();
        assert_eq!(id, 0x01);
        assert_eq!(StatusPing::deserialize(&mut payload).unwrap(), ping);
    }

    #[tokio::test]
    async fn test_async_truncated_stream() {
        let mut bytes = written(Some(0), 1, &Raw(vec![1; 40]));
        bytes.truncate(bytes.len() - 3);

        let mut input = Cursor::new(bytes);
        assert!(matches!(
            async_read_packet(&mut input, Some(0)).await,
            Err(CodecError::ConnectionClosed { .. })
        ));
    }
}
