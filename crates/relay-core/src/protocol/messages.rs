//! Canonical input event type and wire protocol constants.
//!
//! The wire format is one UTF-8 text line per event, matching what the peer
//! firmware parses on its UART-style GATT service:
//!
//! ```text
//! KP:<code>       key press
//! KR:<code>       key release
//! MDown:<x>,<y>   pointer button press at absolute coordinate
//! MUp:<x>,<y>     pointer button release at absolute coordinate
//! ```
//!
//! Integers are decimal. The peer has no framing layer beyond the GATT
//! write boundary, so every line must fit in a single characteristic write.

// ── Protocol constants ────────────────────────────────────────────────────────

/// Largest key code the host will relay.
///
/// Key codes are the GUI toolkit's portable key identifiers, which occupy
/// the low 25 bits; anything above this is not a key the peer firmware
/// knows how to map to a HID usage.
pub const MAX_KEY_CODE: u32 = 0x01FF_FFFF;

/// Largest pointer coordinate the host will relay.
///
/// The peer emulates an absolute HID digitizer whose logical axes run
/// 0..=32767; the host scales window coordinates into that space before
/// events reach this crate.
pub const MAX_POINTER_COORD: u16 = 32767;

/// Maximum encoded line length in bytes.
///
/// One line must fit in a single GATT write-without-response payload
/// (ATT_MTU 247 minus the 3-byte ATT header). The codec refuses to emit
/// anything longer.
pub const MAX_WIRE_LINE_BYTES: usize = 244;

/// Wire prefix for a key press.
pub const PREFIX_KEY_PRESS: &str = "KP:";
/// Wire prefix for a key release.
pub const PREFIX_KEY_RELEASE: &str = "KR:";
/// Wire prefix for a pointer button press.
pub const PREFIX_POINTER_PRESS: &str = "MDown:";
/// Wire prefix for a pointer button release.
pub const PREFIX_POINTER_RELEASE: &str = "MUp:";

// ── Canonical input event ─────────────────────────────────────────────────────

/// A single normalized input transition.
///
/// Produced by the input capture adapter, consumed by the relay
/// coordinator. Immutable once created; one event maps to exactly one wire
/// line. Pointer coordinates are in the peer's absolute device space
/// (`0..=`[`MAX_POINTER_COORD`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// A key went down.
    KeyDown { code: u32 },
    /// A key came up.
    KeyUp { code: u32 },
    /// The pointer button went down at an absolute position.
    PointerDown { x: u16, y: u16 },
    /// The pointer button came up at an absolute position.
    PointerUp { x: u16, y: u16 },
}

impl InputEvent {
    /// Returns `true` for the press variants (`KeyDown`, `PointerDown`).
    pub fn is_press(&self) -> bool {
        matches!(self, InputEvent::KeyDown { .. } | InputEvent::PointerDown { .. })
    }

    /// Returns `true` for the release variants (`KeyUp`, `PointerUp`).
    pub fn is_release(&self) -> bool {
        !self.is_press()
    }
}
