// Tracker Device Interface
// Contract for radios carrying the tracker link, plus shared health and counters

use crate::link::crypto::CryptoError;
use crate::link::message::{MessageError, TrackerMessage};
use crate::link::serial::SerialError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use thiserror::Error;

// ============================================================================
// DEVICE ERRORS
// ============================================================================

/// Errors that can occur on a tracker device
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("No message handler registered")]
    NoHandlerRegistered,

    #[error("Transport error: {0}")]
    Transport(#[from] SerialError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Message error: {0}")]
    Message(#[from] MessageError),
}

impl DeviceError {
    /// Check if the error came from the byte stream rather than from
    /// message preparation
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

// ============================================================================
// MESSAGE HANDLER
// ============================================================================

/// Callback receiving every decoded message together with the RSSI sidecar
/// byte of its frame
pub type MessageHandler = Box<dyn Fn(TrackerMessage, u8) + Send + Sync>;

// ============================================================================
// LINK HEALTH
// ============================================================================

/// Per-direction link health, updated by the transmit and receive paths.
/// Both directions start unhealthy until a first success.
#[derive(Debug, Default)]
pub struct LinkHealth {
    receive_ok: AtomicBool,
    transmit_ok: AtomicBool,
}

impl LinkHealth {
    /// Record the outcome of a receive call
    pub fn record_receive(&self, ok: bool) {
        self.receive_ok.store(ok, Ordering::Relaxed);
    }

    /// Record the outcome of a transmit attempt
    pub fn record_transmit(&self, ok: bool) {
        self.transmit_ok.store(ok, Ordering::Relaxed);
    }

    /// Check receive-direction health
    pub fn receive_ok(&self) -> bool {
        self.receive_ok.load(Ordering::Relaxed)
    }

    /// Check transmit-direction health
    pub fn transmit_ok(&self) -> bool {
        self.transmit_ok.load(Ordering::Relaxed)
    }
}

// ============================================================================
// LINK COUNTERS
// ============================================================================

/// Byte counters shared between the device loops and observers
#[derive(Debug, Default)]
pub struct LinkCounters {
    bytes_received: AtomicU64,
    bytes_transmitted: AtomicU64,
}

impl LinkCounters {
    /// Add decrypted payload bytes to the receive counter
    pub fn record_received(&self, bytes: u64) {
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Add written frame bytes to the transmit counter
    pub fn record_transmitted(&self, bytes: u64) {
        self.bytes_transmitted.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot
    pub fn snapshot(&self) -> LinkStats {
        LinkStats {
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_transmitted: self.bytes_transmitted.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of the link byte counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStats {
    /// Decrypted payload bytes received
    pub bytes_received: u64,
    /// Frame bytes written
    pub bytes_transmitted: u64,
}

// ============================================================================
// TRACKER DEVICE TRAIT
// ============================================================================

/// A radio carrying the tracker link.
#[async_trait]
pub trait TrackerDevice: Send + Sync {
    /// Validate wiring and open the transport. Fails fast when no message
    /// handler is registered (checked before touching hardware) or the
    /// transport cannot be opened.
    fn initialize(&self) -> Result<(), DeviceError>;

    /// Blocking receive loop; run on a dedicated thread until `stop`
    fn read_loop(&self);

    /// Encode, seal, frame and write one message, then hold the channel
    /// throttle before returning
    async fn transmit(&self, message: &TrackerMessage) -> Result<(), DeviceError>;

    /// Register the single message callback. Required before `initialize`.
    fn on_message_received(&self, handler: MessageHandler);

    /// Stop the read loop and close the transport
    fn stop(&self);

    /// Transport open and both link directions healthy
    fn is_healthy(&self) -> bool;

    /// Current byte counters
    fn stats(&self) -> LinkStats;

    /// Human-readable device description
    fn description(&self) -> &str;
}
