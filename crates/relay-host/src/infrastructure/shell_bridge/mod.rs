//! Seam between the relay core and the GUI shell.
//!
//! The shell (window, video viewfinder, focus handling) lives outside this
//! crate. It interacts with the relay through two narrow channels:
//!
//! - **Inbound:** the shell pushes [`RawInputNotification`]s through a
//!   [`ShellInputHandle`]; the paired [`ShellInputSource`] plugs into the
//!   capture pump like any other `InputSource`.
//! - **Outbound:** the shell watches the session-state channel returned by
//!   `LinkSessionManager::new` and renders [`status_label`] somewhere
//!   visible.
//!
//! Tests drive [`ShellInputSource`] the same way the shell does, which is
//! why there is no separate mock input source.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::{self, Sender},
    Arc, Mutex,
};

use crate::infrastructure::input_capture::{CaptureError, InputSource, RawInputNotification};
use crate::infrastructure::link::SessionState;

/// Channel-fed [`InputSource`] owned by the relay side.
///
/// A source lives for one capture run: once stopped it cannot be restarted,
/// because the shell handle it paired with may still be queued into the old
/// channel. The shell builds a fresh source for a new run.
pub struct ShellInputSource {
    sender: Arc<Mutex<Option<Sender<RawInputNotification>>>>,
    stopped: AtomicBool,
}

/// Cloneable handle the shell uses to deliver notifications.
#[derive(Clone)]
pub struct ShellInputHandle {
    sender: Arc<Mutex<Option<Sender<RawInputNotification>>>>,
}

impl ShellInputSource {
    pub fn new() -> Self {
        Self {
            sender: Arc::new(Mutex::new(None)),
            stopped: AtomicBool::new(false),
        }
    }

    /// Returns the handle to hand to the GUI shell.
    pub fn handle(&self) -> ShellInputHandle {
        ShellInputHandle {
            sender: Arc::clone(&self.sender),
        }
    }
}

impl Default for ShellInputSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellInputHandle {
    /// Delivers one raw notification to the capture pump.
    ///
    /// Returns `false` if the source has not been started or has stopped;
    /// the shell can ignore that (input before startup is meaningless).
    pub fn notify(&self, raw: RawInputNotification) -> bool {
        let guard = self.sender.lock().expect("lock poisoned");
        match guard.as_ref() {
            Some(sender) => sender.send(raw).is_ok(),
            None => false,
        }
    }
}

impl InputSource for ShellInputSource {
    fn start(&self) -> Result<mpsc::Receiver<RawInputNotification>, CaptureError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(CaptureError::AlreadyStopped);
        }
        let (tx, rx) = mpsc::channel();
        *self.sender.lock().expect("lock poisoned") = Some(tx);
        Ok(rx)
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        // Drop the sender to close the channel.
        *self.sender.lock().expect("lock poisoned") = None;
    }
}

/// Human-readable session status for the shell's status bar.
pub fn status_label(state: SessionState) -> &'static str {
    match state {
        SessionState::Disconnected => "disconnected",
        SessionState::Scanning => "scanning…",
        SessionState::Connecting => "connecting…",
        SessionState::Connected => "connected",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifications_flow_once_started() {
        // Arrange
        let source = ShellInputSource::new();
        let handle = source.handle();
        let rx = source.start().expect("start should succeed");

        // Act
        assert!(handle.notify(RawInputNotification::FocusGained));
        assert!(handle.notify(RawInputNotification::KeyDown { code: 65 }));

        // Assert
        assert_eq!(rx.recv().unwrap(), RawInputNotification::FocusGained);
        assert_eq!(rx.recv().unwrap(), RawInputNotification::KeyDown { code: 65 });
    }

    #[test]
    fn test_notify_before_start_reports_failure() {
        let source = ShellInputSource::new();
        let handle = source.handle();

        assert!(!handle.notify(RawInputNotification::FocusGained));
    }

    #[test]
    fn test_stop_closes_channel() {
        // Arrange
        let source = ShellInputSource::new();
        let handle = source.handle();
        let rx = source.start().expect("start should succeed");

        // Act
        source.stop();

        // Assert
        assert!(!handle.notify(RawInputNotification::FocusLost));
        assert!(rx.recv().is_err(), "channel should be closed after stop()");
    }

    #[test]
    fn test_start_after_stop_is_rejected() {
        // Arrange
        let source = ShellInputSource::new();
        let _rx = source.start().expect("first start should succeed");

        // Act
        source.stop();
        let result = source.start();

        // Assert
        assert!(matches!(result, Err(CaptureError::AlreadyStopped)));
    }

    #[test]
    fn test_status_labels_cover_all_states() {
        assert_eq!(status_label(SessionState::Disconnected), "disconnected");
        assert_eq!(status_label(SessionState::Scanning), "scanning…");
        assert_eq!(status_label(SessionState::Connecting), "connecting…");
        assert_eq!(status_label(SessionState::Connected), "connected");
    }
}
