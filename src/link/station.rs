// Base Station
// Node-level link loop shared by leader and tracker roles

use crate::bandits::{BanditId, Contact};
use crate::link::device::{DeviceError, TrackerDevice};
use crate::link::message::{Command, ContactReport, Heartbeat, NodeKind, TrackerMessage};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Upper bound on queued outbound messages
pub const TRANSMIT_QUEUE_CAPACITY: usize = 100;

/// Queue depth above which enqueueing warns about link pressure
pub const QUEUE_PRESSURE_WARN: usize = 5;

/// Default heartbeat cadence
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

// ============================================================================
// STATION CONFIG
// ============================================================================

/// Configuration for a base station
#[derive(Debug, Clone)]
pub struct StationConfig {
    /// Identity announced on the link and matched against command receivers
    pub node_id: String,
    /// Role announced in heartbeats
    pub node_kind: NodeKind,
    /// Heartbeat cadence
    pub heartbeat_interval: Duration,
}

impl StationConfig {
    pub fn new(node_id: &str, node_kind: NodeKind) -> Self {
        Self {
            node_id: node_id.to_string(),
            node_kind,
            heartbeat_interval: HEARTBEAT_INTERVAL,
        }
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), StationError> {
        if self.node_id.trim().is_empty() {
            return Err(StationError::InvalidConfig(
                "node_id cannot be empty".to_string(),
            ));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(StationError::InvalidConfig(
                "heartbeat_interval cannot be zero".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// STATION ERRORS
// ============================================================================

/// Errors that can occur in the station layer
#[derive(Debug, Error)]
pub enum StationError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Station already started")]
    AlreadyStarted,

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),
}

// ============================================================================
// DISPATCH HANDLERS
// ============================================================================

type ContactReportHandler = Box<dyn Fn(ContactReport, u8) + Send + Sync>;
type HeartbeatHandler = Box<dyn Fn(Heartbeat, u8) + Send + Sync>;
type CommandHandler = Box<dyn Fn(Command, u8) + Send + Sync>;

#[derive(Default)]
struct DispatchHandlers {
    contact_report: RwLock<Option<ContactReportHandler>>,
    heartbeat: RwLock<Option<HeartbeatHandler>>,
    command: RwLock<Option<CommandHandler>>,
}

fn call_handler<M>(
    slot: &RwLock<Option<Box<dyn Fn(M, u8) + Send + Sync>>>,
    label: &str,
    message: M,
    rssi: u8,
) {
    match slot.read() {
        Ok(handler) => match handler.as_ref() {
            Some(handler) => handler(message, rssi),
            None => debug!("No {} handler registered; dropping message.", label),
        },
        Err(e) => error!("Could not acquire {} handler lock. {}", label, e),
    }
}

fn dispatch(handlers: &DispatchHandlers, node_id: &str, message: TrackerMessage, rssi: u8) {
    match message {
        TrackerMessage::ContactReport(report) => {
            call_handler(&handlers.contact_report, "contact report", report, rssi)
        }
        TrackerMessage::Heartbeat(heartbeat) => {
            call_handler(&handlers.heartbeat, "heartbeat", heartbeat, rssi)
        }
        TrackerMessage::Command(command) => {
            if command.receiver != node_id {
                debug!("Ignoring command addressed to [{}].", command.receiver);
                return;
            }
            call_handler(&handlers.command, "command", command, rssi)
        }
    }
}

// ============================================================================
// BASE STATION
// ============================================================================

/// Owns a tracker device and runs the node-level loop around it: a bounded
/// transmit queue drained one message at a time, periodic heartbeats, and
/// per-kind dispatch of received messages.
pub struct BaseStation {
    config: StationConfig,
    device: Arc<dyn TrackerDevice>,
    queue_tx: mpsc::Sender<TrackerMessage>,
    queue_rx: Mutex<Option<mpsc::Receiver<TrackerMessage>>>,
    handlers: Arc<DispatchHandlers>,
    tracked_bandit: Arc<RwLock<Option<BanditId>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    running: AtomicBool,
}

impl BaseStation {
    /// Create a station over the given device
    pub fn new(config: StationConfig, device: Arc<dyn TrackerDevice>) -> Result<Self, StationError> {
        config.validate()?;

        let (queue_tx, queue_rx) = mpsc::channel(TRANSMIT_QUEUE_CAPACITY);

        Ok(Self {
            config,
            device,
            queue_tx,
            queue_rx: Mutex::new(Some(queue_rx)),
            handlers: Arc::new(DispatchHandlers::default()),
            tracked_bandit: Arc::new(RwLock::new(None)),
            tasks: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
        })
    }

    /// Register a callback for received contact reports
    pub fn on_contact_report<F>(&self, handler: F)
    where
        F: Fn(ContactReport, u8) + Send + Sync + 'static,
    {
        if let Ok(mut slot) = self.handlers.contact_report.write() {
            *slot = Some(Box::new(handler));
        }
    }

    /// Register a callback for received heartbeats
    pub fn on_heartbeat<F>(&self, handler: F)
    where
        F: Fn(Heartbeat, u8) + Send + Sync + 'static,
    {
        if let Ok(mut slot) = self.handlers.heartbeat.write() {
            *slot = Some(Box::new(handler));
        }
    }

    /// Register a callback for commands addressed to this node
    pub fn on_command<F>(&self, handler: F)
    where
        F: Fn(Command, u8) + Send + Sync + 'static,
    {
        if let Ok(mut slot) = self.handlers.command.write() {
            *slot = Some(Box::new(handler));
        }
    }

    /// Wire up the device and spawn the station tasks.
    ///
    /// A station starts once; it cannot be restarted after `stop`.
    pub async fn start(&self) -> Result<(), StationError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(StationError::AlreadyStarted);
        }

        let receiver = match self.queue_rx.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        let mut receiver = match receiver {
            Some(receiver) => receiver,
            None => {
                self.running.store(false, Ordering::SeqCst);
                return Err(StationError::AlreadyStarted);
            }
        };

        let handlers = Arc::clone(&self.handlers);
        let dispatch_node_id = self.config.node_id.clone();
        self.device.on_message_received(Box::new(move |message, rssi| {
            dispatch(&handlers, &dispatch_node_id, message, rssi);
        }));

        if let Err(e) = self.device.initialize() {
            self.running.store(false, Ordering::SeqCst);
            return Err(e.into());
        }

        let mut tasks = Vec::new();

        // Receive loop on a dedicated blocking thread.
        let device = Arc::clone(&self.device);
        tasks.push(tokio::task::spawn_blocking(move || device.read_loop()));

        // Queue drain; the device throttle paces the shared channel.
        let device = Arc::clone(&self.device);
        tasks.push(tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                if let Err(e) = device.transmit(&message).await {
                    if e.is_transport_failure() {
                        warn!("Could not transmit queued message: {}", e);
                    } else {
                        error!("Could not transmit queued message: {}", e);
                    }
                }
            }
        }));

        // Heartbeats.
        let queue = self.queue_tx.clone();
        let node_id = self.config.node_id.clone();
        let node_kind = self.config.node_kind;
        let tracked = Arc::clone(&self.tracked_bandit);
        let heartbeat_interval = self.config.heartbeat_interval;
        tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(heartbeat_interval);
            loop {
                ticker.tick().await;

                let tracked_bandit = match tracked.read() {
                    Ok(tracked) => *tracked,
                    Err(_) => None,
                };

                enqueue_message(
                    &queue,
                    TrackerMessage::Heartbeat(Heartbeat {
                        source: node_id.clone(),
                        version: env!("CARGO_PKG_VERSION").to_string(),
                        node_kind,
                        tracked_bandit,
                        timestamp: Utc::now(),
                    }),
                );
            }
        }));

        match self.tasks.lock() {
            Ok(mut slot) => *slot = tasks,
            Err(e) => error!("Could not acquire task list lock. {}", e),
        }

        info!(
            "Station [{}] started as [{}].",
            self.config.node_id, self.config.node_kind
        );
        Ok(())
    }

    /// Queue a message for transmission. Never blocks; a full queue drops
    /// the message with a warning.
    pub fn enqueue(&self, message: TrackerMessage) {
        enqueue_message(&self.queue_tx, message);
    }

    /// Queue a contact report for the given contact
    pub fn enqueue_contact_report(&self, contact: &Contact) {
        self.enqueue(TrackerMessage::ContactReport(ContactReport {
            source: self.config.node_id.clone(),
            bandit_id: contact.bandit_id(),
            signal_dbm: contact.last_signal(),
            frame_count: contact.frame_count(),
            last_seen: contact.last_seen(),
        }));
    }

    /// Set the bandit announced as tracked in heartbeats
    pub fn set_tracked_bandit(&self, bandit: Option<BanditId>) {
        if let Ok(mut tracked) = self.tracked_bandit.write() {
            *tracked = bandit;
        }
    }

    /// Get the bandit currently announced as tracked
    pub fn tracked_bandit(&self) -> Option<BanditId> {
        match self.tracked_bandit.read() {
            Ok(tracked) => *tracked,
            Err(_) => None,
        }
    }

    /// Stop the device and abort the station tasks
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        self.device.stop();

        match self.tasks.lock() {
            Ok(mut tasks) => {
                for task in tasks.drain(..) {
                    task.abort();
                }
            }
            Err(e) => error!("Could not acquire task list lock. {}", e),
        }

        info!("Station [{}] stopped.", self.config.node_id);
    }

    /// Check if the station has been started and not stopped
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Check the link health of the underlying device
    pub fn is_link_healthy(&self) -> bool {
        self.device.is_healthy()
    }

    /// Get this station's node ID
    pub fn node_id(&self) -> &str {
        &self.config.node_id
    }

    /// Get the underlying device
    pub fn device(&self) -> &Arc<dyn TrackerDevice> {
        &self.device
    }
}

fn enqueue_message(queue: &mpsc::Sender<TrackerMessage>, message: TrackerMessage) {
    let queued = TRANSMIT_QUEUE_CAPACITY.saturating_sub(queue.capacity());
    if queued > QUEUE_PRESSURE_WARN {
        warn!(
            "Transmit queue holds [{}] messages. Generating traffic faster than the link can carry.",
            queued
        );
    }

    match queue.try_send(message) {
        Ok(()) => {}
        Err(TrySendError::Full(message)) => {
            warn!("Transmit queue full. Dropping [{}] message.", message.kind())
        }
        Err(TrySendError::Closed(message)) => {
            warn!("Transmit queue closed. Dropping [{}] message.", message.kind())
        }
    }
}
