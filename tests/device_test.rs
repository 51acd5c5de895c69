// LoRa HAT Device Tests
// Receive loop, transmit path, health and recovery against a scripted transport

use foxhunt::link::{
    frame, Command, DeviceError, LinkCipher, LinkStats, LoraHatDevice, MessageCodec,
    MessageHandler, MockLinkTransport, ReadStep, TrackerDevice, TrackerMessage,
    TRAILER_ZERO_COUNT, TRANSMIT_THROTTLE,
};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

const KEY: &str = "device-test pre-shared key";

type Received = Arc<Mutex<Vec<(TrackerMessage, u8)>>>;

/// Helper to build a small command message
fn test_message(name: &str) -> TrackerMessage {
    TrackerMessage::Command(Command {
        receiver: "tracker-1".to_string(),
        name: name.to_string(),
        arguments: Vec::new(),
    })
}

/// Helper to seal a message the way a peer would. Re-seals until the sealed
/// bytes contain no trailer sequence and no trailing zero, so the framing
/// layer delivers them verbatim.
fn seal(cipher: &LinkCipher, message: &TrackerMessage) -> Vec<u8> {
    let encoded = MessageCodec::encode(message).expect("Should encode message");
    loop {
        let sealed = cipher.encrypt(&encoded).expect("Should seal message");
        let has_trailer = sealed
            .windows(TRAILER_ZERO_COUNT)
            .any(|w| w.iter().all(|&b| b == 0x00));
        if !has_trailer && sealed.last() != Some(&0x00) {
            return sealed;
        }
    }
}

/// Helper to put a message on the wire: sealed payload, trailer, RSSI sidecar
fn wire_frame(cipher: &LinkCipher, message: &TrackerMessage, rssi: u8) -> Vec<u8> {
    let mut wire = frame(&seal(cipher, message));
    wire.push(rssi);
    wire
}

/// Helper to build a handler that journals every dispatch
fn collecting_handler(received: &Received) -> MessageHandler {
    let sink = Arc::clone(received);
    Box::new(move |message, rssi| {
        sink.lock().unwrap().push((message, rssi));
    })
}

/// Helper to wait on a condition fulfilled by the device's reader thread
fn wait_for(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "Timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(2));
    }
}

// ============================================================================
// INITIALIZATION
// ============================================================================

/// Test: The handler check runs before the transport is touched
#[test]
fn test_initialize_requires_handler_before_transport() {
    let mock = MockLinkTransport::new();
    mock.fail_opens(1);
    let device = LoraHatDevice::new(mock, KEY).expect("Should build device");

    // No handler yet; the scripted open failure must stay unconsumed.
    assert!(matches!(
        device.initialize(),
        Err(DeviceError::NoHandlerRegistered)
    ));

    device.on_message_received(Box::new(|_, _| {}));

    // Now the transport is touched and the scripted failure surfaces.
    match device.initialize() {
        Err(DeviceError::Transport(e)) => assert!(e.is_open_failure()),
        other => panic!("Expected a transport failure, got {:?}", other),
    }
    assert!(!device.is_running());

    device.initialize().expect("Should initialize once the port opens");
    assert!(device.is_running());
}

#[test]
fn test_device_rejects_empty_key() {
    assert!(matches!(
        LoraHatDevice::new(MockLinkTransport::new(), ""),
        Err(DeviceError::Crypto(_))
    ));
}

#[test]
fn test_device_initial_state() {
    let device = LoraHatDevice::new(MockLinkTransport::new(), KEY).expect("Should build device");

    assert_eq!(device.description(), "Waveshare SX126X LoRa HAT");
    assert!(!device.is_running());
    assert!(!device.is_healthy());
    assert_eq!(device.stats(), LinkStats::default());
}

// ============================================================================
// RECEIVE PATH
// ============================================================================

/// Test: A framed message on the wire reaches the handler together with its
/// RSSI sidecar byte
#[test]
fn test_receive_dispatches_message_with_rssi() {
    let mock = MockLinkTransport::new();
    let script = mock.script();
    let device = Arc::new(LoraHatDevice::new(mock, KEY).expect("Should build device"));
    let cipher = LinkCipher::new(KEY).expect("Should build cipher");

    let message = test_message("ping");
    script.push_bytes(&wire_frame(&cipher, &message, 42));

    let received: Received = Arc::new(Mutex::new(Vec::new()));
    device.on_message_received(collecting_handler(&received));
    device.initialize().expect("Should initialize");

    let loop_device = Arc::clone(&device);
    let reader = thread::spawn(move || loop_device.read_loop());

    wait_for("message dispatch", || !received.lock().unwrap().is_empty());
    device.stop();
    reader.join().expect("Reader thread should exit");

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].0, message);
    assert_eq!(received[0].1, 42);
    assert!(script.is_drained());

    let payload_len = MessageCodec::encode(&message).expect("Should encode").len() as u64;
    assert_eq!(device.stats().bytes_received, payload_len);
    assert_eq!(device.stats().bytes_transmitted, 0);
}

/// Test: A frame failing authentication is skipped without derailing the
/// frames after it
#[test]
fn test_tampered_frame_is_skipped() {
    let mock = MockLinkTransport::new();
    let script = mock.script();
    let device = Arc::new(LoraHatDevice::new(mock, KEY).expect("Should build device"));
    let cipher = LinkCipher::new(KEY).expect("Should build cipher");

    let mut tampered = wire_frame(&cipher, &test_message("bad"), 10);
    // Corrupt one sealed byte without introducing zeros.
    tampered[4] = if tampered[4] == 0x24 { 0x23 } else { 0x24 };
    script.push_bytes(&tampered);

    let good = test_message("after-tamper");
    script.push_bytes(&wire_frame(&cipher, &good, 77));

    let received: Received = Arc::new(Mutex::new(Vec::new()));
    device.on_message_received(collecting_handler(&received));
    device.initialize().expect("Should initialize");

    let loop_device = Arc::clone(&device);
    let reader = thread::spawn(move || loop_device.read_loop());

    wait_for("good message dispatch", || !received.lock().unwrap().is_empty());
    device.stop();
    reader.join().expect("Reader thread should exit");

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].0, good);
    assert_eq!(received[0].1, 77);

    // Only the authenticated payload is counted.
    let payload_len = MessageCodec::encode(&good).expect("Should encode").len() as u64;
    assert_eq!(device.stats().bytes_received, payload_len);
}

/// Test: A frame whose RSSI sidecar never arrives is abandoned silently
#[test]
fn test_missing_rssi_sidecar_abandons_message() {
    let mock = MockLinkTransport::new();
    let script = mock.script();
    let device = Arc::new(LoraHatDevice::new(mock, KEY).expect("Should build device"));
    let cipher = LinkCipher::new(KEY).expect("Should build cipher");

    // Frame without its sidecar, then a quiet read where the sidecar was
    // expected, then a complete delivery.
    script.push_bytes(&frame(&seal(&cipher, &test_message("incomplete"))));
    script.push(ReadStep::Timeout);
    let complete = test_message("complete");
    script.push_bytes(&wire_frame(&cipher, &complete, 55));

    let received: Received = Arc::new(Mutex::new(Vec::new()));
    device.on_message_received(collecting_handler(&received));
    device.initialize().expect("Should initialize");

    let loop_device = Arc::clone(&device);
    let reader = thread::spawn(move || loop_device.read_loop());

    wait_for("complete message dispatch", || {
        !received.lock().unwrap().is_empty()
    });
    device.stop();
    reader.join().expect("Reader thread should exit");

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].0, complete);
    assert_eq!(received[0].1, 55);
}

/// Test: The read loop backs off after a transport error and keeps receiving
/// once reads succeed again
#[test]
fn test_read_loop_recovers_after_transport_error() {
    let mock = MockLinkTransport::new();
    let script = mock.script();
    let device = Arc::new(LoraHatDevice::new(mock, KEY).expect("Should build device"));
    let cipher = LinkCipher::new(KEY).expect("Should build cipher");

    script.push(ReadStep::Error("device reported no data".to_string()));
    let message = test_message("after-recovery");
    script.push_bytes(&wire_frame(&cipher, &message, 33));

    let received: Received = Arc::new(Mutex::new(Vec::new()));
    device.on_message_received(collecting_handler(&received));
    device.initialize().expect("Should initialize");

    let loop_device = Arc::clone(&device);
    let reader = thread::spawn(move || loop_device.read_loop());

    // Crossing the back-off takes about a second.
    wait_for("dispatch after recovery", || {
        !received.lock().unwrap().is_empty()
    });
    device.stop();
    reader.join().expect("Reader thread should exit");

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].0, message);
    assert!(device.health().receive_ok());
}

// ============================================================================
// TRANSMIT PATH
// ============================================================================

/// Test: Transmitting writes one framed sealed payload and holds the throttle
#[tokio::test(start_paused = true)]
async fn test_transmit_writes_framed_sealed_message() {
    let mock = MockLinkTransport::new();
    let writes = mock.writes();
    let device = LoraHatDevice::new(mock, KEY).expect("Should build device");
    let cipher = LinkCipher::new(KEY).expect("Should build cipher");

    let message = test_message("ping");
    let before = tokio::time::Instant::now();
    device.transmit(&message).await.expect("Should transmit");
    assert!(before.elapsed() >= TRANSMIT_THROTTLE);

    let written = writes.all();
    assert_eq!(written.len(), 1);
    let wire = &written[0];
    assert!(wire.ends_with(&[0x00, 0x00, 0x00]));

    let sealed = &wire[..wire.len() - TRAILER_ZERO_COUNT];
    let opened = cipher.decrypt(sealed).expect("Should open transmitted payload");
    assert_eq!(MessageCodec::decode(&opened).expect("Should decode"), message);

    assert_eq!(device.stats().bytes_transmitted, wire.len() as u64);
    assert!(device.health().transmit_ok());
}

/// Test: A failed transmit reports the error, marks the direction unhealthy
/// and still holds the throttle
#[tokio::test(start_paused = true)]
async fn test_transmit_failure_reports_and_still_throttles() {
    let mock = MockLinkTransport::new();
    mock.fail_opens(1);
    let writes = mock.writes();
    let device = LoraHatDevice::new(mock, KEY).expect("Should build device");

    let before = tokio::time::Instant::now();
    let result = device.transmit(&test_message("ping")).await;
    assert!(before.elapsed() >= TRANSMIT_THROTTLE);

    match result {
        Err(e) => assert!(e.is_transport_failure()),
        Ok(()) => panic!("Expected the transmit to fail"),
    }
    assert!(!device.health().transmit_ok());
    assert_eq!(writes.count(), 0);
    assert_eq!(device.stats().bytes_transmitted, 0);

    // The next attempt re-opens the transport and lands.
    device.transmit(&test_message("ping")).await.expect("Should transmit");
    assert!(device.health().transmit_ok());
    assert_eq!(writes.count(), 1);
}

/// Test: Consecutive transmits are spaced by the throttle
#[tokio::test(start_paused = true)]
async fn test_consecutive_transmits_hold_the_throttle_each() {
    let mock = MockLinkTransport::new();
    let writes = mock.writes();
    let device = LoraHatDevice::new(mock, KEY).expect("Should build device");

    let before = tokio::time::Instant::now();
    device.transmit(&test_message("one")).await.expect("Should transmit");
    device.transmit(&test_message("two")).await.expect("Should transmit");

    assert!(before.elapsed() >= TRANSMIT_THROTTLE * 2);
    assert_eq!(writes.count(), 2);
}

// ============================================================================
// HEALTH
// ============================================================================

/// Test: A healthy link needs an open transport plus one proven success in
/// each direction
#[tokio::test(start_paused = true)]
async fn test_health_requires_transport_and_both_directions() {
    let mock = MockLinkTransport::new();
    let device = Arc::new(LoraHatDevice::new(mock, KEY).expect("Should build device"));
    assert!(!device.is_healthy());

    device.on_message_received(Box::new(|_, _| {}));
    device.initialize().expect("Should initialize");
    assert!(!device.is_healthy()); // Transport open, directions unproven.

    device.transmit(&test_message("ping")).await.expect("Should transmit");
    assert!(!device.is_healthy()); // Receive direction still unproven.

    let loop_device = Arc::clone(&device);
    let reader = thread::spawn(move || loop_device.read_loop());

    // The first quiet read proves the receive direction.
    let deadline = Instant::now() + Duration::from_secs(10);
    while !device.is_healthy() {
        assert!(Instant::now() < deadline, "Timed out waiting for healthy link");
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    device.stop();
    reader.join().expect("Reader thread should exit");
    assert!(!device.is_running());
}
