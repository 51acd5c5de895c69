// LoRa HAT Device
// Waveshare SX126X LoRa HAT driver implementing the tracker device contract

use crate::link::crypto::LinkCipher;
use crate::link::device::{
    DeviceError, LinkCounters, LinkHealth, LinkStats, MessageHandler, TrackerDevice,
};
use crate::link::framing::{frame, FrameAssembler};
use crate::link::message::{MessageCodec, TrackerMessage};
use crate::link::serial::{LinkTransport, SerialError, UartTransport};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Quiet period held on the channel after every transmitted frame
pub const TRANSMIT_THROTTLE: Duration = Duration::from_millis(1500);

/// Back-off after an unexpected receive error before the loop retries
pub const RECEIVE_BACKOFF: Duration = Duration::from_secs(1);

const DESCRIPTION: &str = "Waveshare SX126X LoRa HAT";

// ============================================================================
// LORA HAT DEVICE
// ============================================================================

/// The SX126X LoRa HAT, attached over a UART.
///
/// The transport lock is held only for the duration of a single read or
/// write call, so transmits interleave with the read loop instead of
/// starving it. Transmit exclusivity, including the throttle, is a separate
/// async lock.
pub struct LoraHatDevice<T: LinkTransport> {
    transport: Mutex<T>,
    cipher: LinkCipher,
    handler: RwLock<Option<MessageHandler>>,
    transmit_lock: tokio::sync::Mutex<()>,
    health: LinkHealth,
    counters: LinkCounters,
    running: AtomicBool,
}

impl<T: LinkTransport> LoraHatDevice<T> {
    /// Create a device over the given transport
    pub fn new(transport: T, pre_shared_key: &str) -> Result<Self, DeviceError> {
        let cipher = LinkCipher::new(pre_shared_key)?;

        Ok(Self {
            transport: Mutex::new(transport),
            cipher,
            handler: RwLock::new(None),
            transmit_lock: tokio::sync::Mutex::new(()),
            health: LinkHealth::default(),
            counters: LinkCounters::default(),
            running: AtomicBool::new(false),
        })
    }

    /// Check if the read loop is supposed to be running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Per-direction health flags, updated by the two loops
    pub fn health(&self) -> &LinkHealth {
        &self.health
    }

    fn locked_read(&self, count: usize) -> Result<Option<Vec<u8>>, SerialError> {
        match self.transport.lock() {
            Ok(mut transport) => transport.read_bytes(count),
            Err(e) => Err(SerialError::Io(format!("transport lock poisoned: {}", e))),
        }
    }

    fn locked_write(&self, bytes: &[u8]) -> Result<usize, SerialError> {
        match self.transport.lock() {
            Ok(mut transport) => transport.write_bytes(bytes),
            Err(e) => Err(SerialError::Io(format!("transport lock poisoned: {}", e))),
        }
    }

    fn try_transmit(&self, message: &TrackerMessage) -> Result<usize, DeviceError> {
        let encoded = MessageCodec::encode(message)?;
        let sealed = self.cipher.encrypt(&encoded)?;
        let framed = frame(&sealed);

        debug!("Sending <{}> bytes: {}", framed.len(), hex::encode(&framed));
        Ok(self.locked_write(&framed)?)
    }

    /// A completed frame arrived; read the RSSI sidecar, open the payload and
    /// dispatch it.
    fn handle_complete_frame(&self, payload: &[u8]) {
        let rssi = match self.locked_read(1) {
            Ok(Some(bytes)) if !bytes.is_empty() => bytes[0],
            Ok(_) => return, // Sidecar missing; abandon the message.
            Err(e) => {
                warn!("Tracker link read failed while reading RSSI byte: {}", e);
                self.health.record_receive(false);
                std::thread::sleep(RECEIVE_BACKOFF);
                return;
            }
        };

        debug!("Received <{}> frame bytes: {}", payload.len(), hex::encode(payload));

        let decrypted = match self.cipher.decrypt(payload) {
            Ok(decrypted) => decrypted,
            Err(e) => {
                debug!("Skipping invalid frame ({}): {}", e, hex::encode(payload));
                return;
            }
        };

        let message = match MessageCodec::decode(&decrypted) {
            Ok(message) => message,
            Err(e) => {
                debug!("Skipping undecodable frame ({}): {}", e, hex::encode(payload));
                return;
            }
        };

        self.counters.record_received(decrypted.len() as u64);

        match self.handler.read() {
            Ok(handler) => match handler.as_ref() {
                Some(handler) => handler(message, rssi),
                None => warn!("Received message but no handler registered; dropping it."),
            },
            Err(e) => error!("Could not acquire handler lock. {}", e),
        }
    }
}

impl LoraHatDevice<UartTransport> {
    /// Create a device over a serial port
    pub fn on_port(port_name: &str, pre_shared_key: &str) -> Result<Self, DeviceError> {
        Self::new(UartTransport::new(port_name), pre_shared_key)
    }
}

#[async_trait]
impl<T: LinkTransport + 'static> TrackerDevice for LoraHatDevice<T> {
    fn initialize(&self) -> Result<(), DeviceError> {
        let has_handler = match self.handler.read() {
            Ok(handler) => handler.is_some(),
            Err(_) => false,
        };
        if !has_handler {
            return Err(DeviceError::NoHandlerRegistered);
        }

        {
            let mut transport = match self.transport.lock() {
                Ok(transport) => transport,
                Err(e) => {
                    return Err(SerialError::Io(format!("transport lock poisoned: {}", e)).into())
                }
            };
            transport.open()?;
        }

        self.running.store(true, Ordering::SeqCst);
        info!("Fully initialized [{}].", DESCRIPTION);
        Ok(())
    }

    fn read_loop(&self) {
        let mut assembler = FrameAssembler::new();

        while self.running.load(Ordering::SeqCst) {
            match self.locked_read(1) {
                Ok(None) => {
                    self.health.record_receive(true);
                    // A quiet line is the implicit frame boundary.
                    assembler.discard();
                }
                Ok(Some(bytes)) => {
                    self.health.record_receive(true);
                    match bytes.first() {
                        Some(&byte) => {
                            if let Some(payload) = assembler.feed(byte) {
                                self.handle_complete_frame(&payload);
                            }
                        }
                        None => assembler.discard(),
                    }
                }
                Err(e) => {
                    if self.running.load(Ordering::SeqCst) {
                        warn!("Tracker link read failed: {}", e);
                        self.health.record_receive(false);
                        std::thread::sleep(RECEIVE_BACKOFF);
                    }
                }
            }
        }

        debug!("Read loop of [{}] stopped.", DESCRIPTION);
    }

    async fn transmit(&self, message: &TrackerMessage) -> Result<(), DeviceError> {
        let _exclusive = self.transmit_lock.lock().await;

        let result = match self.try_transmit(message) {
            Ok(written) => {
                self.counters.record_transmitted(written as u64);
                self.health.record_transmit(true);
                Ok(())
            }
            Err(e) => {
                warn!("Tracker link transmit failed: {}", e);
                self.health.record_transmit(false);
                Err(e)
            }
        };

        // The half-duplex channel needs the gap whether or not the write
        // landed; peers transmit into it.
        tokio::time::sleep(TRANSMIT_THROTTLE).await;
        result
    }

    fn on_message_received(&self, handler: MessageHandler) {
        match self.handler.write() {
            Ok(mut slot) => *slot = Some(handler),
            Err(e) => error!("Could not acquire handler lock. {}", e),
        }
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);

        match self.transport.lock() {
            Ok(mut transport) => transport.close(),
            Err(e) => error!("Could not acquire transport lock. {}", e),
        }

        info!("Stopped [{}].", DESCRIPTION);
    }

    fn is_healthy(&self) -> bool {
        let transport_open = match self.transport.lock() {
            Ok(transport) => transport.is_open(),
            Err(_) => false,
        };

        transport_open && self.health.transmit_ok() && self.health.receive_ok()
    }

    fn stats(&self) -> LinkStats {
        self.counters.snapshot()
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }
}
