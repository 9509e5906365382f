//! Integration tests for the relay-core text codec.
//!
//! These tests verify complete round-trip encoding and decoding of every
//! event variant through the public API, including the boundary values the
//! peer firmware cares about.

use relay_core::{
    decode, encode,
    protocol::messages::{MAX_KEY_CODE, MAX_POINTER_COORD, MAX_WIRE_LINE_BYTES},
    DecodeError, InputEvent,
};

/// Encodes an event and decodes the line back, asserting equality.
fn roundtrip(event: InputEvent) -> InputEvent {
    let line = encode(&event).expect("encode must succeed");
    assert!(line.len() <= MAX_WIRE_LINE_BYTES, "line must fit one GATT write");
    decode(line.as_bytes()).expect("decode must succeed")
}

#[test]
fn test_roundtrip_all_four_variants() {
    for event in [
        InputEvent::KeyDown { code: 65 },
        InputEvent::KeyUp { code: 65 },
        InputEvent::PointerDown { x: 100, y: 200 },
        InputEvent::PointerUp { x: 100, y: 200 },
    ] {
        assert_eq!(event, roundtrip(event));
    }
}

#[test]
fn test_roundtrip_key_code_boundaries() {
    assert_eq!(
        InputEvent::KeyDown { code: 0 },
        roundtrip(InputEvent::KeyDown { code: 0 })
    );
    assert_eq!(
        InputEvent::KeyUp { code: MAX_KEY_CODE },
        roundtrip(InputEvent::KeyUp { code: MAX_KEY_CODE })
    );
}

#[test]
fn test_roundtrip_pointer_origin_and_extent() {
    assert_eq!(
        InputEvent::PointerDown { x: 0, y: 0 },
        roundtrip(InputEvent::PointerDown { x: 0, y: 0 })
    );
    assert_eq!(
        InputEvent::PointerUp {
            x: MAX_POINTER_COORD,
            y: MAX_POINTER_COORD,
        },
        roundtrip(InputEvent::PointerUp {
            x: MAX_POINTER_COORD,
            y: MAX_POINTER_COORD,
        })
    );
}

#[test]
fn test_key_down_then_up_encodes_in_order() {
    let down = encode(&InputEvent::KeyDown { code: 65 }).unwrap();
    let up = encode(&InputEvent::KeyUp { code: 65 }).unwrap();

    assert_eq!(down, "KP:65");
    assert_eq!(up, "KR:65");
}

#[test]
fn test_peer_status_lines_are_rejected_not_fatal() {
    // Peer firmware may echo free-form status text; decode reports it as
    // unknown rather than panicking or corrupting session state.
    for line in [&b"READY"[..], b"", b"KP", b"mdown:1,2"] {
        assert!(matches!(decode(line), Err(DecodeError::UnknownFormat(_))));
    }
}
