//! # Handshake, Status and Login Packets
//!
//! Packet shapes for protocol 757. Each structure encodes its fields in
//! declaration order; ids and states come from the [`Packet`] impls.
//!
//! Decoding never validates. Constructors do, and the framer validates every
//! outbound packet before it is written.

use mcwire_core::{CodecError, GameState, NextState, PacketDirection, Result, ValidationError};
use serde_json::Value;

use crate::buffer::Buffer;
use crate::packets::Packet;
use crate::serializable::Serializable;

/// Longest server address a client may send in a handshake
pub const MAX_SERVER_ADDRESS_LENGTH: usize = 255;

/// Longest player name accepted during login
pub const MAX_USERNAME_LENGTH: usize = 16;

/// Longest server id sent with an encryption request
pub const MAX_SERVER_ID_LENGTH: usize = 20;

fn check_length(field: &'static str, value: &str, max: usize) -> std::result::Result<(), ValidationError> {
    let length = value.chars().count();
    if length > max {
        return Err(ValidationError::TooLong { field, length, max });
    }
    Ok(())
}

fn write_json(buf: &mut Buffer, value: &Value) -> Result<()> {
    buf.write_utf(&value.to_string())
}

fn read_json(buf: &mut Buffer) -> Result<Value> {
    let text = buf.read_utf()?;
    serde_json::from_str(&text)
        .map_err(|e| CodecError::MalformedInput(format!("Invalid JSON payload: {}", e)))
}

/// First packet of every connection, selects the next state
///
/// # Wire Format
/// `{VARINT protocol_version}{UTF server_address}{U16 server_port}{VARINT next_state}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub protocol_version: i32,
    pub server_address: String,
    pub server_port: u16,
    pub next_state: NextState,
}

impl Handshake {
    pub fn new(
        protocol_version: i32,
        server_address: impl Into<String>,
        server_port: u16,
        next_state: NextState,
    ) -> std::result::Result<Self, ValidationError> {
        let packet = Self {
            protocol_version,
            server_address: server_address.into(),
            server_port,
            next_state,
        };
        packet.validate()?;
        Ok(packet)
    }
}

impl Serializable for Handshake {
    fn serialize_to(&self, buf: &mut Buffer) -> Result<()> {
        buf.write_varint(self.protocol_version);
        buf.write_utf(&self.server_address)?;
        buf.write_u16(self.server_port);
        buf.write_varint(self.next_state.as_i32());
        Ok(())
    }

    fn deserialize(buf: &mut Buffer) -> Result<Self> {
        let protocol_version = buf.read_varint()?;
        let server_address = buf.read_utf()?;
        let server_port = buf.read_u16()?;
        let offset = buf.position();
        let raw_state = buf.read_varint()?;
        let next_state = NextState::from_i32(raw_state).ok_or_else(|| {
            CodecError::MalformedInput(format!(
                "Unknown next state {} at offset {}",
                raw_state, offset
            ))
        })?;

        Ok(Self {
            protocol_version,
            server_address,
            server_port,
            next_state,
        })
    }

    fn validate(&self) -> std::result::Result<(), ValidationError> {
        check_length("server_address", &self.server_address, MAX_SERVER_ADDRESS_LENGTH)
    }
}

impl Packet for Handshake {
    const PACKET_ID: i32 = 0x00;
    const GAME_STATE: GameState = GameState::Handshaking;
    const DIRECTION: PacketDirection = PacketDirection::Serverbound;
}

/// Asks the server for its status JSON. Empty body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusRequest;

impl Serializable for StatusRequest {
    fn serialize_to(&self, _buf: &mut Buffer) -> Result<()> {
        Ok(())
    }

    fn deserialize(_buf: &mut Buffer) -> Result<Self> {
        Ok(Self)
    }
}

impl Packet for StatusRequest {
    const PACKET_ID: i32 = 0x00;
    const GAME_STATE: GameState = GameState::Status;
    const DIRECTION: PacketDirection = PacketDirection::Serverbound;
}

/// Server list status, a JSON document sent as a string
#[derive(Debug, Clone, PartialEq)]
pub struct StatusResponse {
    pub data: Value,
}

impl StatusResponse {
    pub fn new(data: Value) -> Self {
        Self { data }
    }
}

impl Serializable for StatusResponse {
    fn serialize_to(&self, buf: &mut Buffer) -> Result<()> {
        write_json(buf, &self.data)
    }

    fn deserialize(buf: &mut Buffer) -> Result<Self> {
        read_json(buf).map(Self::new)
    }
}

impl Packet for StatusResponse {
    const PACKET_ID: i32 = 0x00;
    const GAME_STATE: GameState = GameState::Status;
    const DIRECTION: PacketDirection = PacketDirection::Clientbound;
}

/// Latency probe from the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusPing {
    pub payload: i64,
}

impl Serializable for StatusPing {
    fn serialize_to(&self, buf: &mut Buffer) -> Result<()> {
        buf.write_i64(self.payload);
        Ok(())
    }

    fn deserialize(buf: &mut Buffer) -> Result<Self> {
        Ok(Self {
            payload: buf.read_i64()?,
        })
    }
}

impl Packet for StatusPing {
    const PACKET_ID: i32 = 0x01;
    const GAME_STATE: GameState = GameState::Status;
    const DIRECTION: PacketDirection = PacketDirection::Serverbound;
}

/// Echo of a [`StatusPing`] payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusPong {
    pub payload: i64,
}

impl From<StatusPing> for StatusPong {
    fn from(ping: StatusPing) -> Self {
        Self {
            payload: ping.payload,
        }
    }
}

impl Serializable for StatusPong {
    fn serialize_to(&self, buf: &mut Buffer) -> Result<()> {
        buf.write_i64(self.payload);
        Ok(())
    }

    fn deserialize(buf: &mut Buffer) -> Result<Self> {
        Ok(Self {
            payload: buf.read_i64()?,
        })
    }
}

impl Packet for StatusPong {
    const PACKET_ID: i32 = 0x01;
    const GAME_STATE: GameState = GameState::Status;
    const DIRECTION: PacketDirection = PacketDirection::Clientbound;
}

/// Opens the login sequence with the player's name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginStart {
    pub username: String,
}

impl LoginStart {
    pub fn new(username: impl Into<String>) -> std::result::Result<Self, ValidationError> {
        let packet = Self {
            username: username.into(),
        };
        packet.validate()?;
        Ok(packet)
    }
}

impl Serializable for LoginStart {
    fn serialize_to(&self, buf: &mut Buffer) -> Result<()> {
        buf.write_utf(&self.username)
    }

    fn deserialize(buf: &mut Buffer) -> Result<Self> {
        Ok(Self {
            username: buf.read_utf()?,
        })
    }

    fn validate(&self) -> std::result::Result<(), ValidationError> {
        check_length("username", &self.username, MAX_USERNAME_LENGTH)
    }
}

impl Packet for LoginStart {
    const PACKET_ID: i32 = 0x00;
    const GAME_STATE: GameState = GameState::Login;
    const DIRECTION: PacketDirection = PacketDirection::Serverbound;
}

/// Kicks the client during login. `reason` is a chat component.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginDisconnect {
    pub reason: Value,
}

impl Serializable for LoginDisconnect {
    fn serialize_to(&self, buf: &mut Buffer) -> Result<()> {
        write_json(buf, &self.reason)
    }

    fn deserialize(buf: &mut Buffer) -> Result<Self> {
        Ok(Self {
            reason: read_json(buf)?,
        })
    }
}

impl Packet for LoginDisconnect {
    const PACKET_ID: i32 = 0x00;
    const GAME_STATE: GameState = GameState::Login;
    const DIRECTION: PacketDirection = PacketDirection::Clientbound;
}

/// Starts the encryption handshake
///
/// # Wire Format
/// `{UTF server_id}{BYTEARRAY public_key}{BYTEARRAY verify_token}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginEncryptionRequest {
    pub server_id: String,
    pub public_key: Vec<u8>,
    pub verify_token: Vec<u8>,
}

impl Serializable for LoginEncryptionRequest {
    fn serialize_to(&self, buf: &mut Buffer) -> Result<()> {
        buf.write_utf(&self.server_id)?;
        buf.write_bytearray(&self.public_key)?;
        buf.write_bytearray(&self.verify_token)?;
        Ok(())
    }

    fn deserialize(buf: &mut Buffer) -> Result<Self> {
        Ok(Self {
            server_id: buf.read_utf()?,
            public_key: buf.read_bytearray()?,
            verify_token: buf.read_bytearray()?,
        })
    }

    fn validate(&self) -> std::result::Result<(), ValidationError> {
        check_length("server_id", &self.server_id, MAX_SERVER_ID_LENGTH)
    }
}

impl Packet for LoginEncryptionRequest {
    const PACKET_ID: i32 = 0x01;
    const GAME_STATE: GameState = GameState::Login;
    const DIRECTION: PacketDirection = PacketDirection::Clientbound;
}

/// Client's encrypted shared secret and echoed verify token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginEncryptionResponse {
    pub shared_secret: Vec<u8>,
    pub verify_token: Vec<u8>,
}

impl Serializable for LoginEncryptionResponse {
    fn serialize_to(&self, buf: &mut Buffer) -> Result<()> {
        buf.write_bytearray(&self.shared_secret)?;
        buf.write_bytearray(&self.verify_token)?;
        Ok(())
    }

    fn deserialize(buf: &mut Buffer) -> Result<Self> {
        Ok(Self {
            shared_secret: buf.read_bytearray()?,
            verify_token: buf.read_bytearray()?,
        })
    }
}

impl Packet for LoginEncryptionResponse {
    const PACKET_ID: i32 = 0x01;
    const GAME_STATE: GameState = GameState::Login;
    const DIRECTION: PacketDirection = PacketDirection::Serverbound;
}

/// Ends login successfully, switching the connection to play
///
/// # Wire Format
/// `{U64 uuid_high}{U64 uuid_low}{UTF username}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSuccess {
    pub uuid: u128,
    pub username: String,
}

impl Serializable for LoginSuccess {
    fn serialize_to(&self, buf: &mut Buffer) -> Result<()> {
        buf.write_u64((self.uuid >> 64) as u64);
        buf.write_u64(self.uuid as u64);
        buf.write_utf(&self.username)
    }

    fn deserialize(buf: &mut Buffer) -> Result<Self> {
        let high = buf.read_u64()?;
        let low = buf.read_u64()?;
        Ok(Self {
            uuid: (u128::from(high) << 64) | u128::from(low),
            username: buf.read_utf()?,
        })
    }

    fn validate(&self) -> std::result::Result<(), ValidationError> {
        check_length("username", &self.username, MAX_USERNAME_LENGTH)
    }
}

impl Packet for LoginSuccess {
    const PACKET_ID: i32 = 0x02;
    const GAME_STATE: GameState = GameState::Login;
    const DIRECTION: PacketDirection = PacketDirection::Clientbound;
}

/// Tells the client which compression threshold applies from now on
///
/// A negative threshold disables compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginSetCompression {
    pub threshold: i32,
}

impl LoginSetCompression {
    /// The threshold to install, or `None` when compression stays off
    pub fn compression_threshold(&self) -> Option<u32> {
        u32::try_from(self.threshold).ok()
    }
}

impl Serializable for LoginSetCompression {
    fn serialize_to(&self, buf: &mut Buffer) -> Result<()> {
        buf.write_varint(self.threshold);
        Ok(())
    }

    fn deserialize(buf: &mut Buffer) -> Result<Self> {
        Ok(Self {
            threshold: buf.read_varint()?,
        })
    }
}

impl Packet for LoginSetCompression {
    const PACKET_ID: i32 = 0x03;
    const GAME_STATE: GameState = GameState::Login;
    const DIRECTION: PacketDirection = PacketDirection::Clientbound;
}

/// Custom login query on a named channel
///
/// `data` runs to the end of the packet body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginPluginRequest {
    pub message_id: i32,
    pub channel: String,
    pub data: Vec<u8>,
}

impl Serializable for LoginPluginRequest {
    fn serialize_to(&self, buf: &mut Buffer) -> Result<()> {
        buf.write_varint(self.message_id);
        buf.write_utf(&self.channel)?;
        buf.write(&self.data);
        Ok(())
    }

    fn deserialize(buf: &mut Buffer) -> Result<Self> {
        let message_id = buf.read_varint()?;
        let channel = buf.read_utf()?;
        let data = buf.read_remaining().to_vec();
        Ok(Self {
            message_id,
            channel,
            data,
        })
    }
}

impl Packet for LoginPluginRequest {
    const PACKET_ID: i32 = 0x04;
    const GAME_STATE: GameState = GameState::Login;
    const DIRECTION: PacketDirection = PacketDirection::Clientbound;
}

/// Answer to a [`LoginPluginRequest`]
///
/// `data` is `None` when the client did not understand the request. When
/// present it runs to the end of the packet body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginPluginResponse {
    pub message_id: i32,
    pub data: Option<Vec<u8>>,
}

impl Serializable for LoginPluginResponse {
    fn serialize_to(&self, buf: &mut Buffer) -> Result<()> {
        buf.write_varint(self.message_id);
        buf.write_optional(self.data.as_ref(), |buf, data| {
            buf.write(data);
            Ok(())
        })
    }

    fn deserialize(buf: &mut Buffer) -> Result<Self> {
        let message_id = buf.read_varint()?;
        let data = buf.read_optional(|buf| Ok(buf.read_remaining().to_vec()))?;
        Ok(Self { message_id, data })
    }
}

impl Packet for LoginPluginResponse {
    const PACKET_ID: i32 = 0x02;
    const GAME_STATE: GameState = GameState::Login;
    const DIRECTION: PacketDirection = PacketDirection::Serverbound;
}
