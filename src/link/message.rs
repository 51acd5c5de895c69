// Tracker Messages
// Wire vocabulary exchanged between leader and tracker nodes

use crate::bandits::BanditId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Wire schema version; decoders reject everything else
pub const PROTOCOL_VERSION: u8 = 1;

// ============================================================================
// NODE KIND
// ============================================================================

/// Role of a node on the tracker link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Leader,
    Tracker,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leader => write!(f, "leader"),
            Self::Tracker => write!(f, "tracker"),
        }
    }
}

// ============================================================================
// MESSAGE TYPES
// ============================================================================

/// Contact state for one bandit, reported by a tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactReport {
    /// Reporting node
    pub source: String,
    /// The bandit in contact
    pub bandit_id: BanditId,
    /// Signal strength of the most recent frame
    pub signal_dbm: i8,
    /// Frames observed during the contact
    pub frame_count: u64,
    /// When the most recent frame was seen
    pub last_seen: DateTime<Utc>,
}

/// Periodic presence announcement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    /// Announcing node
    pub source: String,
    /// Software version of the announcing node
    pub version: String,
    /// Role of the announcing node
    pub node_kind: NodeKind,
    /// Bandit the node is currently tracking, if any
    pub tracked_bandit: Option<BanditId>,
    /// When the heartbeat was built
    pub timestamp: DateTime<Utc>,
}

/// Generic command relay addressed to a single node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Node the command is addressed to
    pub receiver: String,
    /// Command name
    pub name: String,
    /// Positional arguments
    pub arguments: Vec<String>,
}

/// A message on the tracker link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackerMessage {
    ContactReport(ContactReport),
    Heartbeat(Heartbeat),
    Command(Command),
}

impl TrackerMessage {
    /// Short message kind label for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ContactReport(_) => "contact-report",
            Self::Heartbeat(_) => "heartbeat",
            Self::Command(_) => "command",
        }
    }
}

// ============================================================================
// MESSAGE ERRORS
// ============================================================================

/// Errors that can occur during message encoding/decoding
#[derive(Debug, Clone, Error)]
pub enum MessageError {
    #[error("Failed to encode message: {0}")]
    EncodeError(String),

    #[error("Failed to decode message: {0}")]
    DecodeError(String),

    #[error("Unsupported schema version: {0}")]
    UnsupportedVersion(u8),
}

// ============================================================================
// MESSAGE CODEC
// ============================================================================

/// Codec for serializing/deserializing tracker messages
pub struct MessageCodec;

impl MessageCodec {
    /// Encode a message to version-prefixed binary bytes
    pub fn encode(message: &TrackerMessage) -> Result<Vec<u8>, MessageError> {
        let body = postcard::to_allocvec(message)
            .map_err(|e| MessageError::EncodeError(e.to_string()))?;

        let mut bytes = Vec::with_capacity(body.len() + 1);
        bytes.push(PROTOCOL_VERSION);
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// Decode a message from version-prefixed binary bytes
    pub fn decode(bytes: &[u8]) -> Result<TrackerMessage, MessageError> {
        match bytes.split_first() {
            None => Err(MessageError::DecodeError("empty payload".to_string())),
            Some((&version, _)) if version != PROTOCOL_VERSION => {
                Err(MessageError::UnsupportedVersion(version))
            }
            Some((_, body)) => {
                postcard::from_bytes(body).map_err(|e| MessageError::DecodeError(e.to_string()))
            }
        }
    }
}
