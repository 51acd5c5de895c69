// Serial Link Transport
// Raw byte-stream access to the radio, plus a scripted mock for tests

use serialport::{DataBits, Parity, SerialPort, StopBits};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

/// Fixed link speed of the radio UART
pub const BAUD_RATE: u32 = 2_400;

/// How long a read waits for a byte before reporting a quiet line
pub const READ_TIMEOUT: Duration = Duration::from_millis(500);

// ============================================================================
// SERIAL ERRORS
// ============================================================================

/// Errors that can occur on the raw byte stream
#[derive(Debug, Clone, Error)]
pub enum SerialError {
    #[error("Could not open serial port [{port}]: {message}")]
    OpenFailed { port: String, message: String },

    #[error("Serial port not open")]
    NotOpen,

    #[error("Serial I/O error: {0}")]
    Io(String),
}

impl SerialError {
    /// Check if this error occurred while opening the port
    pub fn is_open_failure(&self) -> bool {
        matches!(self, Self::OpenFailed { .. })
    }
}

// ============================================================================
// LINK TRANSPORT TRAIT
// ============================================================================

/// Byte-stream access to the radio.
///
/// Read timeouts are not errors: a quiet line returns `Ok(None)` and doubles
/// as the implicit frame separator of the link.
pub trait LinkTransport: Send {
    /// Open the underlying handle; a no-op when already open
    fn open(&mut self) -> Result<(), SerialError>;

    /// Read up to `count` bytes, waiting at most the read timeout
    fn read_bytes(&mut self, count: usize) -> Result<Option<Vec<u8>>, SerialError>;

    /// Write all bytes in a single blocking write
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<usize, SerialError>;

    /// Check if the handle is currently open
    fn is_open(&self) -> bool;

    /// Close the handle
    fn close(&mut self);
}

// ============================================================================
// UART TRANSPORT
// ============================================================================

/// Serial port transport with a lazily opened handle.
///
/// The handle is dropped on any I/O error, so the next call re-opens the
/// port. This is what lets the link survive USB re-enumeration.
pub struct UartTransport {
    port_name: String,
    handle: Option<Box<dyn SerialPort>>,
}

impl UartTransport {
    /// Create a transport for the given port; the port is not opened yet
    pub fn new(port_name: &str) -> Self {
        Self {
            port_name: port_name.to_string(),
            handle: None,
        }
    }

    /// Get the configured port name
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    fn handle(&mut self) -> Result<&mut Box<dyn SerialPort>, SerialError> {
        if self.handle.is_none() {
            let port = serialport::new(&self.port_name, BAUD_RATE)
                .timeout(READ_TIMEOUT)
                .data_bits(DataBits::Eight)
                .stop_bits(StopBits::One)
                .parity(Parity::None)
                .open()
                .map_err(|e| SerialError::OpenFailed {
                    port: self.port_name.clone(),
                    message: e.to_string(),
                })?;

            debug!("Opened serial port [{}].", self.port_name);
            self.handle = Some(port);
        }

        self.handle.as_mut().ok_or(SerialError::NotOpen)
    }
}

impl LinkTransport for UartTransport {
    fn open(&mut self) -> Result<(), SerialError> {
        self.handle().map(|_| ())
    }

    fn read_bytes(&mut self, count: usize) -> Result<Option<Vec<u8>>, SerialError> {
        let mut buf = vec![0u8; count];
        let read = self.handle()?.read(&mut buf);

        match read {
            Ok(0) => Ok(None),
            Ok(n) => {
                buf.truncate(n);
                Ok(Some(buf))
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Err(e) => {
                self.close();
                Err(SerialError::Io(e.to_string()))
            }
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<usize, SerialError> {
        let write = self.handle()?.write_all(bytes);

        match write {
            Ok(()) => Ok(bytes.len()),
            Err(e) => {
                self.close();
                Err(SerialError::Io(e.to_string()))
            }
        }
    }

    fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    fn close(&mut self) {
        if self.handle.take().is_some() {
            debug!("Closed serial port [{}].", self.port_name);
        }
    }
}

// ============================================================================
// MOCK TRANSPORT
// ============================================================================

/// One scripted outcome of a read call
#[derive(Debug, Clone)]
pub enum ReadStep {
    /// Deliver these bytes, spread over as many read calls as needed
    Bytes(Vec<u8>),
    /// One quiet read (timeout)
    Timeout,
    /// One failing read; the mock closes itself like the real transport
    Error(String),
}

/// Scripted in-memory transport for exercising the link without hardware.
///
/// Reads are served from a shared script so tests can extend it while the
/// device loop is running; writes are journaled for inspection.
pub struct MockLinkTransport {
    script: Arc<Mutex<VecDeque<ReadStep>>>,
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
    failing_opens: Arc<AtomicUsize>,
    open: bool,
}

impl MockLinkTransport {
    /// Create an empty mock with nothing scripted
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            writes: Arc::new(Mutex::new(Vec::new())),
            failing_opens: Arc::new(AtomicUsize::new(0)),
            open: false,
        }
    }

    /// Get a handle for scripting reads, usable after the mock moved away
    pub fn script(&self) -> MockScript {
        MockScript {
            script: Arc::clone(&self.script),
        }
    }

    /// Get a handle over the write journal
    pub fn writes(&self) -> MockWrites {
        MockWrites {
            writes: Arc::clone(&self.writes),
        }
    }

    /// Make the next `count` open attempts fail
    pub fn fail_opens(&self, count: usize) {
        self.failing_opens.store(count, Ordering::SeqCst);
    }

    fn ensure_open(&mut self) -> Result<(), SerialError> {
        if self.open {
            return Ok(());
        }

        if self.failing_opens.load(Ordering::SeqCst) > 0 {
            self.failing_opens.fetch_sub(1, Ordering::SeqCst);
            return Err(SerialError::OpenFailed {
                port: "mock".to_string(),
                message: "scripted open failure".to_string(),
            });
        }

        self.open = true;
        Ok(())
    }
}

impl Default for MockLinkTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkTransport for MockLinkTransport {
    fn open(&mut self) -> Result<(), SerialError> {
        self.ensure_open()
    }

    fn read_bytes(&mut self, count: usize) -> Result<Option<Vec<u8>>, SerialError> {
        self.ensure_open()?;

        let mut script = match self.script.lock() {
            Ok(script) => script,
            Err(e) => {
                error!("Could not acquire mock script lock. {}", e);
                return Ok(None);
            }
        };

        match script.front_mut() {
            None => {
                drop(script);
                // Behave like a quiet line instead of spinning the caller.
                std::thread::sleep(Duration::from_millis(1));
                Ok(None)
            }
            Some(ReadStep::Bytes(bytes)) => {
                let taken: Vec<u8> = bytes.drain(..count.min(bytes.len())).collect();
                if bytes.is_empty() {
                    script.pop_front();
                }
                if taken.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(taken))
                }
            }
            Some(ReadStep::Timeout) => {
                script.pop_front();
                Ok(None)
            }
            Some(ReadStep::Error(message)) => {
                let message = message.clone();
                script.pop_front();
                self.open = false;
                Err(SerialError::Io(message))
            }
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<usize, SerialError> {
        self.ensure_open()?;

        match self.writes.lock() {
            Ok(mut writes) => writes.push(bytes.to_vec()),
            Err(e) => error!("Could not acquire mock write journal lock. {}", e),
        }

        Ok(bytes.len())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
    }
}

/// Scripting handle for a `MockLinkTransport`
#[derive(Clone)]
pub struct MockScript {
    script: Arc<Mutex<VecDeque<ReadStep>>>,
}

impl MockScript {
    /// Append a step to the script
    pub fn push(&self, step: ReadStep) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(step);
        }
    }

    /// Append a byte delivery
    pub fn push_bytes(&self, bytes: &[u8]) {
        self.push(ReadStep::Bytes(bytes.to_vec()));
    }

    /// Check if every step has been consumed
    pub fn is_drained(&self) -> bool {
        match self.script.lock() {
            Ok(script) => script.is_empty(),
            Err(_) => false,
        }
    }
}

/// Inspection handle over a mock's write journal
#[derive(Clone)]
pub struct MockWrites {
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MockWrites {
    /// Get all writes so far
    pub fn all(&self) -> Vec<Vec<u8>> {
        match self.writes.lock() {
            Ok(writes) => writes.clone(),
            Err(_) => Vec::new(),
        }
    }

    /// Get the number of write calls so far
    pub fn count(&self) -> usize {
        match self.writes.lock() {
            Ok(writes) => writes.len(),
            Err(_) => 0,
        }
    }
}
