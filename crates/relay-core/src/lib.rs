//! # relay-core
//!
//! Shared library for BLE-HID-Relay containing the wire protocol codec and
//! the held-input domain logic.
//!
//! This crate is used by the host application. It has zero dependencies on
//! OS APIs, UI frameworks, radios, or async runtimes.
//!
//! # Architecture overview
//!
//! BLE-HID-Relay turns a PC into the controlling end of a remote console:
//! keyboard and mouse input captured on the host is relayed over a BLE GATT
//! link to an embedded receiver that emulates a USB HID device on the
//! machine under control, while a capture card provides the video feed back.
//!
//! This crate is the pure foundation. It defines:
//!
//! - **`protocol`** – How events travel over the radio. Each input event is
//!   encoded as one short UTF-8 text line (e.g. `KP:65`) small enough for a
//!   single GATT write, and decoded back on the other end.
//!
//! - **`domain`** – Pure relay state with no I/O. The important piece is the
//!   `HeldInputSet`: the set of keys and buttons whose press has been
//!   relayed but whose release has not, which is what must be flushed when
//!   the link drops so the peer never keeps a key stuck down.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `relay_core::InputEvent` instead of `relay_core::protocol::messages::InputEvent`.
pub use domain::held::{HeldInputSet, InputId};
pub use protocol::codec::{decode, encode, DecodeError, EncodeError};
pub use protocol::messages::InputEvent;
