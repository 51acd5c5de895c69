// Link Framing
// Trailer-delimited frames and the receive-side assembly state machine

/// Number of consecutive 0x00 bytes terminating a frame
pub const TRAILER_ZERO_COUNT: usize = 3;

/// Byte position (1-indexed, per message) at which the radio re-delivers a
/// spurious byte after each internal chunk
pub const CHUNK_REDELIVERY_POSITION: u16 = 241;

// ============================================================================
// TRANSMIT FRAMING
// ============================================================================

/// Append the frame trailer to a sealed payload
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(payload.len() + TRAILER_ZERO_COUNT);
    framed.extend_from_slice(payload);
    framed.extend_from_slice(&[0x00; TRAILER_ZERO_COUNT]);
    framed
}

// ============================================================================
// FRAME ASSEMBLER
// ============================================================================

/// Receive-side state machine fed one byte at a time.
///
/// Accumulates payload bytes until three consecutive zeros mark the frame
/// boundary. Zeros are held in a run counter rather than the buffer; a
/// non-zero byte after a partial run proves the zeros were payload and
/// re-emits them. Every 241st received byte of a message is a spurious
/// re-delivery by the radio and is dropped before it can touch the buffer
/// or the zero run.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buffer: Vec<u8>,
    zero_run: usize,
    chunk_position: u16,
}

impl FrameAssembler {
    /// Create an empty assembler
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one received byte.
    ///
    /// Returns the completed payload (without the trailer) when the byte
    /// closes a frame; the assembler is reset and ready for the next frame.
    pub fn feed(&mut self, byte: u8) -> Option<Vec<u8>> {
        self.chunk_position += 1;
        if self.chunk_position == CHUNK_REDELIVERY_POSITION {
            self.chunk_position = 0;
            return None;
        }

        if byte == 0x00 {
            self.zero_run += 1;
            if self.zero_run == TRAILER_ZERO_COUNT {
                let payload = std::mem::take(&mut self.buffer);
                self.reset();
                return Some(payload);
            }
            return None;
        }

        if self.zero_run > 0 {
            // The zeros were payload, not a trailer.
            for _ in 0..self.zero_run {
                self.buffer.push(0x00);
            }
            self.zero_run = 0;
        }

        self.buffer.push(byte);
        None
    }

    /// Drop any partial state. Called at read-timeout boundaries, which are
    /// the implicit frame separators of the link.
    pub fn discard(&mut self) {
        self.reset();
    }

    /// Number of payload bytes currently held, including a partial zero run
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len() + self.zero_run
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.zero_run = 0;
        self.chunk_position = 0;
    }
}
