//! Binary room protocol.
//!
//! Every frame is one bincode-encoded [`RoomMessage`]:
//! ```text
//! ┌──────────┬───────────────┬─────────┬──────────┬──────────┐
//! │ msg_type │ connection_id │ room_id │ clock    │ payload  │
//! │ 1 byte   │ 16 bytes      │ varint+ │ varint   │ varint+  │
//! └──────────┴───────────────┴─────────┴──────────┴──────────┘
//! ```
//!
//! Payloads by type:
//! - `Enter`: bincode [`EnterRequest`]
//! - `RoomState`, `StorageUpdate`: yrs v1 update bytes
//! - `Presence`: bincode [`StateMap`]
//! - `Rejected`: UTF-8 reason
//! - `Leave`, `Ping`, `Pong`: empty

use scribe_session::{InitialState, StateMap};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    /// Client asks to join a room
    Enter = 1,
    /// Server accepts and sends the full document state
    RoomState = 2,
    /// Incremental storage (yrs) update
    StorageUpdate = 3,
    /// Presence map of one participant
    Presence = 4,
    /// Participant left the room
    Leave = 5,
    /// Server refused the enter request or dropped the room
    Rejected = 6,
    /// Heartbeat ping
    Ping = 7,
    /// Heartbeat pong
    Pong = 8,
}

/// Payload of an `Enter` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnterRequest {
    pub public_key: String,
    pub initial: InitialState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMessage {
    pub msg_type: MessageType,
    /// Sender's connection; nil for server-originated messages
    pub connection_id: Uuid,
    pub room_id: String,
    /// Per-connection sequence number
    pub clock: u64,
    pub payload: Vec<u8>,
}

impl RoomMessage {
    fn new(msg_type: MessageType, connection_id: Uuid, room_id: &str, clock: u64, payload: Vec<u8>) -> Self {
        Self {
            msg_type,
            connection_id,
            room_id: room_id.to_owned(),
            clock,
            payload,
        }
    }

    pub fn enter(connection_id: Uuid, room_id: &str, request: &EnterRequest) -> Result<Self, ProtocolError> {
        Ok(Self::new(MessageType::Enter, connection_id, room_id, 0, encode_payload(request)?))
    }

    pub fn room_state(room_id: &str, document: Vec<u8>) -> Self {
        Self::new(MessageType::RoomState, Uuid::nil(), room_id, 0, document)
    }

    pub fn storage_update(connection_id: Uuid, room_id: &str, clock: u64, update: Vec<u8>) -> Self {
        Self::new(MessageType::StorageUpdate, connection_id, room_id, clock, update)
    }

    pub fn presence(
        connection_id: Uuid,
        room_id: &str,
        clock: u64,
        presence: &StateMap,
    ) -> Result<Self, ProtocolError> {
        Ok(Self::new(
            MessageType::Presence,
            connection_id,
            room_id,
            clock,
            encode_payload(presence)?,
        ))
    }

    pub fn leave(connection_id: Uuid, room_id: &str) -> Self {
        Self::new(MessageType::Leave, connection_id, room_id, 0, Vec::new())
    }

    pub fn rejected(room_id: &str, reason: &str) -> Self {
        Self::new(MessageType::Rejected, Uuid::nil(), room_id, 0, reason.as_bytes().to_vec())
    }

    pub fn ping(connection_id: Uuid) -> Self {
        Self::new(MessageType::Ping, connection_id, "", 0, Vec::new())
    }

    pub fn pong(connection_id: Uuid) -> Self {
        Self::new(MessageType::Pong, connection_id, "", 0, Vec::new())
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        encode_payload(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        decode_payload(bytes)
    }

    pub fn enter_request(&self) -> Result<EnterRequest, ProtocolError> {
        self.expect_type(MessageType::Enter)?;
        decode_payload(&self.payload)
    }

    pub fn presence_state(&self) -> Result<StateMap, ProtocolError> {
        self.expect_type(MessageType::Presence)?;
        decode_payload(&self.payload)
    }

    pub fn rejection_reason(&self) -> Result<String, ProtocolError> {
        self.expect_type(MessageType::Rejected)?;
        Ok(String::from_utf8_lossy(&self.payload).into_owned())
    }

    fn expect_type(&self, expected: MessageType) -> Result<(), ProtocolError> {
        if self.msg_type == expected {
            Ok(())
        } else {
            Err(ProtocolError::InvalidMessageType {
                expected,
                actual: self.msg_type,
            })
        }
    }
}

fn encode_payload<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| ProtocolError::Serialization(e.to_string()))
}

fn decode_payload<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    let (value, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map_err(|e| ProtocolError::Deserialization(e.to_string()))?;
    Ok(value)
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Deserialization error: {0}")]
    Deserialization(String),
    #[error("Expected {expected:?} message, got {actual:?}")]
    InvalidMessageType {
        expected: MessageType,
        actual: MessageType,
    },
    #[error("Invalid document update: {0}")]
    InvalidUpdate(String),
    #[error("Room rejected the connection: {0}")]
    Rejected(String),
    #[error("Transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Timed out connecting to {0}")]
    Timeout(String),
    #[error("Not connected")]
    NotConnected,
    #[error("Outgoing queue full")]
    Backpressure,
    #[error("Document lock poisoned")]
    Poisoned,
}
