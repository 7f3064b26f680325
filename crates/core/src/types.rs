//! Core type definitions

use serde::{Deserialize, Serialize};

/// Protocol version whose packet shapes this crate implements (1.18.x).
pub const PROTOCOL_VERSION: i32 = 757;

/// Largest frame length a 3-byte varint can describe.
pub const MAX_FRAME_LENGTH: usize = 2_097_151;

/// Largest uncompressed packet body accepted from a peer (2^23).
pub const MAX_UNCOMPRESSED_LENGTH: usize = 8_388_608;

/// Default maximum string length, in characters.
pub const MAX_STRING_LENGTH: usize = 32_767;

/// Connection state that selects which packet id table is in effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameState {
    Handshaking = 0,
    Status = 1,
    Login = 2,
    Play = 3,
}

impl GameState {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Handshaking),
            1 => Some(Self::Status),
            2 => Some(Self::Login),
            3 => Some(Self::Play),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Handshaking => "handshaking",
            Self::Status => "status",
            Self::Login => "login",
            Self::Play => "play",
        }
    }
}

/// Which peer a packet travels towards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketDirection {
    /// Client -> Server
    Serverbound,
    /// Server -> Client
    Clientbound,
}

/// State requested by the client in the handshake packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NextState {
    Status = 1,
    Login = 2,
}

impl NextState {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::Status),
            2 => Some(Self::Login),
            _ => None,
        }
    }

    pub const fn as_i32(self) -> i32 {
        self as i32
    }
}

impl From<NextState> for GameState {
    fn from(state: NextState) -> Self {
        match state {
            NextState::Status => GameState::Status,
            NextState::Login => GameState::Login,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_state_discriminants() {
        for (value, state) in [
            (0, GameState::Handshaking),
            (1, GameState::Status),
            (2, GameState::Login),
            (3, GameState::Play),
        ] {
            assert_eq!(GameState::from_i32(value), Some(state));
            assert_eq!(state as i32, value);
        }
        assert_eq!(GameState::from_i32(4), None);
    }

    #[test]
    fn test_next_state_transitions() {
        assert_eq!(NextState::from_i32(1), Some(NextState::Status));
        assert_eq!(NextState::from_i32(3), None);
        assert_eq!(GameState::from(NextState::Login), GameState::Login);
        assert_eq!(NextState::Login.as_i32(), 2);
    }
}
