//! # Packet Identity and Registry
//!
//! [`Packet`] ties a [`Serializable`] type to its id, state and direction.
//! [`ServerboundPacket`] and [`ClientboundPacket`] are the tagged unions a
//! connection decodes into once it knows the current [`GameState`].
//!
//! Ids are only unique within one state and one direction: `0x00` is
//! `Handshake` while handshaking, `StatusRequest` in status and `LoginStart`
//! in login.

use mcwire_core::{CodecError, GameState, PacketDirection, Result, ValidationError};

use crate::buffer::Buffer;
use crate::packet_types::*;
use crate::serializable::Serializable;

/// A packet type with a fixed place in the protocol
pub trait Packet: Serializable {
    /// Id written in front of the payload
    const PACKET_ID: i32;

    /// State in which `PACKET_ID` maps to this type
    const GAME_STATE: GameState;

    /// Which peer receives this packet
    const DIRECTION: PacketDirection;
}

macro_rules! packet_registry {
    (
        $(#[$meta:meta])*
        $name:ident, $direction:expr, {
            $($variant:ident),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub enum $name {
            $($variant($variant),)*
        }

        impl $name {
            /// Direction shared by every variant
            pub const DIRECTION: PacketDirection = $direction;

            /// Decode the payload of packet `packet_id` received in `state`
            ///
            /// # Errors
            /// `Protocol` if no packet with this id exists in `state`, or
            /// whatever the packet's own decoder reports.
            pub fn decode(state: GameState, packet_id: i32, buf: &mut Buffer) -> Result<Self> {
                $(
                    if state == <$variant as Packet>::GAME_STATE
                        && packet_id == <$variant as Packet>::PACKET_ID
                    {
                        return <$variant as Serializable>::deserialize(buf).map(Self::$variant);
                    }
                )*

                tracing::debug!(
                    "Unknown {} packet id {:#04x} in state {}",
                    stringify!($name),
                    packet_id,
                    state.as_str()
                );
                Err(CodecError::Protocol(format!(
                    "Unknown packet id {:#04x} in state {}",
                    packet_id,
                    state.as_str()
                )))
            }

            pub fn packet_id(&self) -> i32 {
                match self {
                    $(Self::$variant(_) => <$variant as Packet>::PACKET_ID,)*
                }
            }

            pub fn game_state(&self) -> GameState {
                match self {
                    $(Self::$variant(_) => <$variant as Packet>::GAME_STATE,)*
                }
            }

            /// Write the wrapped packet's payload (without its id)
            pub fn encode_payload(&self, buf: &mut Buffer) -> Result<()> {
                match self {
                    $(Self::$variant(packet) => packet.serialize_to(buf),)*
                }
            }

            pub fn validate(&self) -> std::result::Result<(), ValidationError> {
                match self {
                    $(Self::$variant(packet) => packet.validate(),)*
                }
            }
        }

        $(
            impl From<$variant> for $name {
                fn from(packet: $variant) -> Self {
                    Self::$variant(packet)
                }
            }
        )*
    };
}

packet_registry! {
    /// Every packet a client may send before play
    ServerboundPacket, PacketDirection::Serverbound, {
        Handshake,
        StatusRequest,
        StatusPing,
        LoginStart,
        LoginEncryptionResponse,
        LoginPluginResponse,
    }
}

packet_registry! {
    /// Every packet a server may send before play
    ClientboundPacket, PacketDirection::Clientbound, {
        StatusResponse,
        StatusPong,
        LoginDisconnect,
        LoginEncryptionRequest,
        LoginSuccess,
        LoginSetCompression,
        LoginPluginRequest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcwire_core::NextState;

    #[test]
    fn test_serverbound_ids_per_state() {
        let test_cases = vec![
            (GameState::Handshaking, 0x00, "Handshake"),
            (GameState::Status, 0x00, "StatusRequest"),
            (GameState::Status, 0x01, "StatusPing"),
            (GameState::Login, 0x00, "LoginStart"),
            (GameState::Login, 0x01, "LoginEncryptionResponse"),
            (GameState::Login, 0x02, "LoginPluginResponse"),
        ];

        let payloads: Vec<ServerboundPacket> = vec![
            Handshake::new(757, "mc.example.net", 25565, NextState::Status).unwrap().into(),
            StatusRequest.into(),
            StatusPing { payload: 99 }.into(),
            LoginStart::new("Alex").unwrap().into(),
            LoginEncryptionResponse {
                shared_secret: vec![1; 128],
                verify_token: vec![2; 128],
            }
            .into(),
            LoginPluginResponse { message_id: 3, data: None }.into(),
        ];

        for ((state, id, name), packet) in test_cases.into_iter().zip(payloads) {
            assert_eq!(packet.packet_id(), id, "Id for {}", name);
            assert_eq!(packet.game_state(), state, "State for {}", name);

            let mut buf = Buffer::new();
            packet.encode_payload(&mut buf).unwrap();
            let decoded = ServerboundPacket::decode(state, id, &mut buf).unwrap();
            assert_eq!(decoded, packet, "Decode for {}", name);
        }
    }

    #[test]
    fn test_clientbound_decode() {
        let packet: ClientboundPacket = LoginSetCompression { threshold: 256 }.into();
        let mut buf = Buffer::new();
        packet.encode_payload(&mut buf).unwrap();

        match ClientboundPacket::decode(GameState::Login, 0x03, &mut buf).unwrap() {
            ClientboundPacket::LoginSetCompression(p) => {
                assert_eq!(p.compression_threshold(), Some(256))
            }
            other => panic!("unexpected packet: {:?}", other),
        }
        assert_eq!(ClientboundPacket::DIRECTION, PacketDirection::Clientbound);
    }

    #[test]
    fn test_unknown_id_is_protocol_error() {
        let test_cases = vec![
            (GameState::Handshaking, 0x01),
            (GameState::Status, 0x02),
            (GameState::Play, 0x00),
        ];

        for (state, id) in test_cases {
            let mut buf = Buffer::new();
            let err = ServerboundPacket::decode(state, id, &mut buf).unwrap_err();
            assert!(matches!(err, CodecError::Protocol(_)), "Failed for {:?}/{}", state, id);
        }
    }

    #[test]
    fn test_registry_validate_delegates() {
        let packet: ServerboundPacket = LoginStart {
            username: "x".repeat(17),
        }
        .into();
        assert!(matches!(packet.validate(), Err(ValidationError::TooLong { .. })));
    }
}
