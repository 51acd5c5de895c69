// Link module - THE WIRE
// Encrypted tracker link: message codec, cipher, framing, transports, devices

mod crypto;
mod device;
mod framing;
mod lora;
mod message;
mod serial;
mod station;

pub use message::{
    // Message vocabulary
    Command, ContactReport, Heartbeat, NodeKind, TrackerMessage,
    // Codec
    MessageCodec, MessageError, PROTOCOL_VERSION,
};

pub use crypto::{CryptoError, LinkCipher, NONCE_LENGTH};

pub use framing::{frame, FrameAssembler, CHUNK_REDELIVERY_POSITION, TRAILER_ZERO_COUNT};

pub use serial::{
    // Transport seam
    LinkTransport, SerialError, UartTransport,
    // Scripted test double
    MockLinkTransport, MockScript, MockWrites, ReadStep,
    // Link constants
    BAUD_RATE, READ_TIMEOUT,
};

pub use device::{
    DeviceError, LinkCounters, LinkHealth, LinkStats, MessageHandler, TrackerDevice,
};

pub use lora::{LoraHatDevice, RECEIVE_BACKOFF, TRANSMIT_THROTTLE};

pub use station::{
    BaseStation, StationConfig, StationError, HEARTBEAT_INTERVAL, QUEUE_PRESSURE_WARN,
    TRANSMIT_QUEUE_CAPACITY,
};
