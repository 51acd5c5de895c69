// Link Framing Tests
// Wire-level frame assembly against the radio's delivery quirks

use foxhunt::link::{frame, FrameAssembler, CHUNK_REDELIVERY_POSITION, TRAILER_ZERO_COUNT};

/// Helper to feed a delivered byte stream and collect completed payloads
fn feed_all(assembler: &mut FrameAssembler, bytes: &[u8]) -> Vec<Vec<u8>> {
    let mut completed = Vec::new();
    for &byte in bytes {
        if let Some(payload) = assembler.feed(byte) {
            completed.push(payload);
        }
    }
    completed
}

/// Helper to model the radio chunk re-delivery: inserts a spurious byte so
/// that it arrives as the 241st byte of the stream
fn with_spurious_byte(wire: &[u8], spurious: u8) -> Vec<u8> {
    let mut delivered = wire.to_vec();
    delivered.insert(CHUNK_REDELIVERY_POSITION as usize - 1, spurious);
    delivered
}

/// Helper to build a payload of the given size with no zero bytes
fn nonzero_payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 255 + 1) as u8).collect()
}

// ============================================================================
// TRANSMIT SIDE
// ============================================================================

#[test]
fn test_frame_appends_zero_trailer() {
    let framed = frame(&[0x10, 0x20, 0x30]);

    assert_eq!(framed.len(), 3 + TRAILER_ZERO_COUNT);
    assert!(framed.ends_with(&[0x00, 0x00, 0x00]));
    assert_eq!(&framed[..3], &[0x10, 0x20, 0x30]);
}

// ============================================================================
// ROUND TRIPS
// ============================================================================

/// Test: Payloads short enough to avoid the chunk boundary survive verbatim
#[test]
fn test_round_trip_short_payloads() {
    for size in [1usize, 16, 64, 237] {
        let payload = nonzero_payload(size);
        let mut assembler = FrameAssembler::new();

        let completed = feed_all(&mut assembler, &frame(&payload));

        assert_eq!(completed, vec![payload], "size {} should round-trip", size);
        assert_eq!(assembler.pending_bytes(), 0);
    }
}

/// Test: Zero bytes inside a payload survive as long as fewer than three
/// run consecutively
#[test]
fn test_round_trip_embedded_zero_runs() {
    let payloads: Vec<Vec<u8>> = vec![
        vec![0x01, 0x00, 0x02],
        vec![0x01, 0x00, 0x00, 0x02],
        vec![0x00, 0x01],
        vec![0x00, 0x00, 0x01],
    ];

    for payload in payloads {
        let mut assembler = FrameAssembler::new();
        let completed = feed_all(&mut assembler, &frame(&payload));

        assert_eq!(completed, vec![payload]);
    }
}

/// Test: Two frames delivered back to back assemble independently
#[test]
fn test_back_to_back_frames() {
    let first = nonzero_payload(24);
    let second = vec![0xFE, 0x00, 0xFD];

    let mut wire = frame(&first);
    wire.extend_from_slice(&frame(&second));

    let mut assembler = FrameAssembler::new();
    assert_eq!(feed_all(&mut assembler, &wire), vec![first, second]);
}

// ============================================================================
// CHUNK RE-DELIVERY QUIRK
// ============================================================================

/// Test: The spurious 241st byte of a long message is dropped, leaving the
/// payload intact
#[test]
fn test_chunked_delivery_drops_spurious_byte() {
    let payload = nonzero_payload(300);
    let delivered = with_spurious_byte(&frame(&payload), 0x55);

    let mut assembler = FrameAssembler::new();
    assert_eq!(feed_all(&mut assembler, &delivered), vec![payload]);
}

/// Test: A spurious zero at the chunk boundary does not advance a payload
/// zero run into a false trailer
#[test]
fn test_spurious_zero_does_not_break_zero_run() {
    let mut payload = nonzero_payload(300);
    payload[239] = 0x00;
    payload[240] = 0x00;
    payload[241] = 0xAB;

    // The spurious byte lands between the two genuine zeros.
    let delivered = with_spurious_byte(&frame(&payload), 0x00);

    let mut assembler = FrameAssembler::new();
    assert_eq!(feed_all(&mut assembler, &delivered), vec![payload]);
}

/// Test: The byte position counter is per message, not per connection
#[test]
fn test_chunk_position_resets_between_frames() {
    // 40 short frames total well past 241 delivered bytes. None of them is
    // long enough to cross a chunk boundary on its own, so nothing may be
    // dropped anywhere in the stream.
    let payloads: Vec<Vec<u8>> = (0..40u8)
        .map(|i| vec![i + 1, i + 2, i + 3, i + 4, i + 5])
        .collect();

    let mut wire = Vec::new();
    for payload in &payloads {
        wire.extend_from_slice(&frame(payload));
    }
    assert!(wire.len() > CHUNK_REDELIVERY_POSITION as usize);

    let mut assembler = FrameAssembler::new();
    assert_eq!(feed_all(&mut assembler, &wire), payloads);
}

// ============================================================================
// DISCARD
// ============================================================================

/// Test: Discarding partial state leaves the next frame unharmed
#[test]
fn test_discard_isolates_partial_frames() {
    let stale = nonzero_payload(40);
    let fresh = nonzero_payload(25);

    let mut assembler = FrameAssembler::new();

    // Half a frame arrives, then the line goes quiet.
    for &byte in &stale[..20] {
        assert!(assembler.feed(byte).is_none());
    }
    assert_eq!(assembler.pending_bytes(), 20);
    assembler.discard();
    assert_eq!(assembler.pending_bytes(), 0);

    assert_eq!(feed_all(&mut assembler, &frame(&fresh)), vec![fresh]);
}
