//! Input capture infrastructure.
//!
//! The GUI shell delivers raw key/pointer notifications and window focus
//! changes on a std `mpsc` channel (it runs its own event loop thread, same
//! as an OS hook would). This module normalizes those notifications into
//! canonical [`InputEvent`]s, gated on focus, and pumps them into the tokio
//! channel the relay coordinator consumes.
//!
//! # Focus semantics
//!
//! While the window has focus, every raw transition is forwarded 1:1 in
//! arrival order — no coalescing or debouncing, because the peer's HID
//! emulation must see every down/up. While focus is absent, raw input is
//! dropped (not queued); only the focus edges themselves reach the
//! coordinator so it can flush held input.
//!
//! # Testability
//!
//! The `InputSource` trait lets tests (and the headless binary) inject
//! synthetic notifications without a GUI; see
//! [`shell_bridge::ShellInputSource`](crate::infrastructure::shell_bridge::ShellInputSource).

use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc, Arc,
};
use std::time::Duration;

use tokio::sync::mpsc as tokio_mpsc;
use tracing::{info, trace};

use relay_core::InputEvent;

/// A raw notification as delivered by the GUI shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInputNotification {
    /// A key went down (canonical key code).
    KeyDown { code: u32 },
    /// A key came up.
    KeyUp { code: u32 },
    /// The pointer button went down, coordinates already scaled to the
    /// peer's absolute device space.
    PointerDown { x: u16, y: u16 },
    /// The pointer button came up.
    PointerUp { x: u16, y: u16 },
    /// The window became the active input target.
    FocusGained,
    /// The window stopped being the active input target.
    FocusLost,
}

/// An event forwarded to the relay coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEvent {
    /// A canonical input event captured while focused.
    Input(InputEvent),
    /// Focus arrived; informational.
    FocusGained,
    /// Focus left; the coordinator must flush held input.
    FocusLost,
}

/// Error type for input capture operations.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("input source failed to start: {0}")]
    StartFailed(String),
    #[error("capture service has already been stopped")]
    AlreadyStopped,
}

/// Trait abstracting raw input notification production.
///
/// The production implementation is the shell bridge's channel-fed source;
/// tests drive the same type directly.
pub trait InputSource: Send {
    /// Starts the source and returns a receiver for raw notifications.
    fn start(&self) -> Result<mpsc::Receiver<RawInputNotification>, CaptureError>;
    /// Stops the source and releases its resources.
    fn stop(&self);
}

// ── Focus gate ────────────────────────────────────────────────────────────────

/// Pure focus filter: maps raw notifications to coordinator events.
///
/// Starts unfocused; nothing is forwarded until the shell reports
/// `FocusGained`.
#[derive(Debug, Default)]
pub struct FocusGate {
    focused: bool,
}

impl FocusGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while input is being forwarded.
    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Applies one raw notification, returning the event to forward, if any.
    pub fn apply(&mut self, raw: RawInputNotification) -> Option<CaptureEvent> {
        match raw {
            RawInputNotification::FocusGained => {
                self.focused = true;
                Some(CaptureEvent::FocusGained)
            }
            RawInputNotification::FocusLost => {
                self.focused = false;
                Some(CaptureEvent::FocusLost)
            }
            _ if !self.focused => None,
            RawInputNotification::KeyDown { code } => {
                Some(CaptureEvent::Input(InputEvent::KeyDown { code }))
            }
            RawInputNotification::KeyUp { code } => {
                Some(CaptureEvent::Input(InputEvent::KeyUp { code }))
            }
            RawInputNotification::PointerDown { x, y } => {
                Some(CaptureEvent::Input(InputEvent::PointerDown { x, y }))
            }
            RawInputNotification::PointerUp { x, y } => {
                Some(CaptureEvent::Input(InputEvent::PointerUp { x, y }))
            }
        }
    }
}

// ── Capture pump ──────────────────────────────────────────────────────────────

/// How long one blocking receive waits before re-checking the running flag.
const PUMP_RECV_TIMEOUT: Duration = Duration::from_millis(500);

/// Starts the capture source and spawns the pump thread bridging its std
/// channel into `event_tx`.
///
/// The pump applies the [`FocusGate`] and forwards in arrival order. It
/// exits when the source channel closes, the coordinator side hangs up, or
/// `running` is cleared.
///
/// # Errors
///
/// Returns [`CaptureError`] if the source fails to start or the pump
/// thread cannot be spawned.
pub fn start_capture_pump(
    source: &dyn InputSource,
    event_tx: tokio_mpsc::Sender<CaptureEvent>,
    running: Arc<AtomicBool>,
) -> Result<std::thread::JoinHandle<()>, CaptureError> {
    let raw_rx = source.start()?;

    let handle = std::thread::Builder::new()
        .name("relay-capture".to_string())
        .spawn(move || {
            pump_loop(raw_rx, event_tx, running);
        })
        .map_err(|e| CaptureError::StartFailed(format!("capture thread: {e}")))?;

    Ok(handle)
}

fn pump_loop(
    raw_rx: mpsc::Receiver<RawInputNotification>,
    event_tx: tokio_mpsc::Sender<CaptureEvent>,
    running: Arc<AtomicBool>,
) {
    let mut gate = FocusGate::new();

    while running.load(Ordering::Relaxed) {
        let raw = match raw_rx.recv_timeout(PUMP_RECV_TIMEOUT) {
            Ok(raw) => raw,
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        };

        match gate.apply(raw) {
            Some(event) => {
                if event_tx.blocking_send(event).is_err() {
                    // Coordinator is gone – application is shutting down.
                    break;
                }
            }
            None => {
                trace!(?raw, "dropped input without focus");
            }
        }
    }

    info!("capture pump stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
