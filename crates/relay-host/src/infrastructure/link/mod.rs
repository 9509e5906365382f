//! BLE link session management.
//!
//! The [`LinkSessionManager`] owns the single session to the peer: it
//! drives discovery and connection, serializes outbound writes, surfaces
//! inbound notifications, and reports disconnects. It deliberately does
//! *not* auto-retry after a failure: the relay coordinator owns the retry
//! loop so that reconnect policy stays visible and testable rather than
//! hidden inside the transport.
//!
//! The raw radio is behind the [`LinkTransport`] trait: production uses the
//! btleplug implementation in [`ble`], tests use the scriptable
//! [`mock::MockLinkTransport`].

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::{uuid, Uuid};

pub mod ble;
pub mod mock;

// ── Peer identity defaults ────────────────────────────────────────────────────
//
// These must match the peer firmware exactly; the config file can override
// them for modified firmware builds.

/// GATT service the peer advertises.
pub const DEFAULT_SERVICE_UUID: Uuid = uuid!("597f1290-5b99-477d-9261-f0ed801fc566");
/// Characteristic the host writes input lines to.
pub const DEFAULT_WRITE_CHAR_UUID: Uuid = uuid!("597f1291-5b99-477d-9261-f0ed801fc566");
/// Characteristic the peer notifies status bytes on.
pub const DEFAULT_NOTIFY_CHAR_UUID: Uuid = uuid!("597f1292-5b99-477d-9261-f0ed801fc566");
/// Advertised device name fragment the scanner matches on.
pub const DEFAULT_DEVICE_NAME: &str = "HID BLE Relay";
/// How long one discovery pass may take before reporting failure.
pub const DEFAULT_SCAN_WINDOW: Duration = Duration::from_secs(10);
/// Pause between failed discovery passes.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Peer identity and session timing configuration.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Substring the advertised device name must contain.
    pub device_name: String,
    /// Service UUID the peer must advertise.
    pub service_uuid: Uuid,
    /// Inbound-write characteristic on the peer.
    pub write_char_uuid: Uuid,
    /// Outbound-notify characteristic on the peer.
    pub notify_char_uuid: Uuid,
    /// Bounded scan window for one discovery pass.
    pub scan_window: Duration,
    /// Delay before the coordinator retries a failed discovery pass.
    pub retry_delay: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            service_uuid: DEFAULT_SERVICE_UUID,
            write_char_uuid: DEFAULT_WRITE_CHAR_UUID,
            notify_char_uuid: DEFAULT_NOTIFY_CHAR_UUID,
            scan_window: DEFAULT_SCAN_WINDOW,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

// ── Errors and state ──────────────────────────────────────────────────────────

/// Error type for link-layer operations.
#[derive(Debug, Error)]
pub enum LinkError {
    /// No matching peer was found within the scan window. Recoverable;
    /// the caller decides whether to retry.
    #[error("no peer found within {window:?} scan window")]
    DiscoveryTimeout { window: Duration },

    /// The local BLE adapter is missing or unusable.
    #[error("BLE adapter unavailable: {0}")]
    Adapter(String),

    /// The peer was found but the connection or GATT setup failed.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// A send was attempted while not connected. Recoverable; the message
    /// is dropped.
    #[error("link unavailable: not connected")]
    LinkUnavailable,

    /// The transport rejected a write. Recoverable; the message is dropped
    /// and the session stays up unless the transport reports disconnection.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// The peer or link dropped outside our control.
    #[error("unexpected disconnect")]
    UnexpectedDisconnect,
}

/// Health of the wireless session, owned exclusively by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Scanning,
    Connecting,
    Connected,
}

/// One item from the session's inbound stream.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionInbound {
    /// Bytes the peer pushed on the notify characteristic.
    Data(Vec<u8>),
    /// The link dropped; the manager is already in `Disconnected` when the
    /// caller sees this.
    Disconnected,
}

// ── Transport seam ────────────────────────────────────────────────────────────

/// Trait abstracting the BLE central radio.
///
/// The production implementation is [`ble::BleCentralTransport`]; tests use
/// [`mock::MockLinkTransport`].
#[async_trait]
pub trait LinkTransport: Send {
    /// Scans for a peer matching `config` for at most `window`, remembering
    /// the match for a subsequent [`connect`](LinkTransport::connect).
    async fn discover(&mut self, config: &LinkConfig, window: Duration) -> Result<(), LinkError>;

    /// Connects to the previously discovered peer and subscribes to its
    /// notify characteristic.
    async fn connect(&mut self, config: &LinkConfig) -> Result<(), LinkError>;

    /// Writes one payload to the peer's write characteristic.
    async fn write(&mut self, payload: &[u8]) -> Result<(), LinkError>;

    /// Returns the next notify payload, or `None` once the link is gone.
    async fn next_inbound(&mut self) -> Option<Vec<u8>>;

    /// Tears the connection down and releases the radio handle.
    async fn close(&mut self);
}

// ── Session manager ───────────────────────────────────────────────────────────

/// Owns exactly one session to the peer.
///
/// State transitions are the only way the rest of the application learns
/// link health: the coordinator sees them through return values and
/// [`recv_inbound`](LinkSessionManager::recv_inbound), the GUI shell
/// through the watch channel returned by [`new`](LinkSessionManager::new).
pub struct LinkSessionManager<T: LinkTransport> {
    transport: T,
    config: LinkConfig,
    state: SessionState,
    status_tx: watch::Sender<SessionState>,
}

impl<T: LinkTransport> LinkSessionManager<T> {
    /// Creates a manager in `Disconnected` state and returns it together
    /// with a receiver observing every state change.
    pub fn new(transport: T, config: LinkConfig) -> (Self, watch::Receiver<SessionState>) {
        let (status_tx, status_rx) = watch::channel(SessionState::Disconnected);
        let mgr = Self {
            transport,
            config,
            state: SessionState::Disconnected,
            status_tx,
        };
        (mgr, status_rx)
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Configured retry delay, for the coordinator's reconnect loop.
    pub fn retry_delay(&self) -> Duration {
        self.config.retry_delay
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!(?state, "session state changed");
            self.state = state;
            // Receiver may be gone in headless runs; that is fine.
            let _ = self.status_tx.send(state);
        }
    }

    /// Discovers and connects to the peer within the configured scan window.
    ///
    /// Never blocks indefinitely: a pass that finds no peer ends with
    /// [`LinkError::DiscoveryTimeout`] and the session back in
    /// `Disconnected`. Retrying is the caller's decision.
    ///
    /// # Errors
    ///
    /// [`LinkError::DiscoveryTimeout`], [`LinkError::Adapter`], or
    /// [`LinkError::ConnectFailed`].
    pub async fn scan_and_connect(&mut self) -> Result<(), LinkError> {
        self.set_state(SessionState::Scanning);
        info!(device_name = %self.config.device_name, "scanning for peer");

        if let Err(e) = self.transport.discover(&self.config, self.config.scan_window).await {
            self.set_state(SessionState::Disconnected);
            return Err(e);
        }

        self.set_state(SessionState::Connecting);
        if let Err(e) = self.transport.connect(&self.config).await {
            self.set_state(SessionState::Disconnected);
            return Err(e);
        }

        self.set_state(SessionState::Connected);
        info!("peer connected");
        Ok(())
    }

    /// Writes one payload to the peer. FIFO ordering is guaranteed by the
    /// single-caller design: the coordinator is the only writer and awaits
    /// each write before issuing the next.
    ///
    /// # Errors
    ///
    /// [`LinkError::LinkUnavailable`] when not connected;
    /// [`LinkError::WriteFailed`] for a transport write error (session
    /// stays up); [`LinkError::UnexpectedDisconnect`] when the transport
    /// reports the link gone. In that case the state is `Disconnected`
    /// before this returns, so no later send can race ahead of it.
    pub async fn send(&mut self, payload: &[u8]) -> Result<(), LinkError> {
        if self.state != SessionState::Connected {
            return Err(LinkError::LinkUnavailable);
        }
        match self.transport.write(payload).await {
            Ok(()) => Ok(()),
            Err(LinkError::UnexpectedDisconnect) => {
                warn!("link dropped during write");
                self.set_state(SessionState::Disconnected);
                Err(LinkError::UnexpectedDisconnect)
            }
            Err(e) => Err(e),
        }
    }

    /// Waits for the next inbound payload from the peer.
    ///
    /// Returns [`SessionInbound::Disconnected`] exactly once per session
    /// when the notification stream ends; the state is already
    /// `Disconnected` at that point.
    pub async fn recv_inbound(&mut self) -> SessionInbound {
        match self.transport.next_inbound().await {
            Some(data) => SessionInbound::Data(data),
            None => {
                if self.state == SessionState::Connected {
                    warn!("peer disconnected");
                }
                self.set_state(SessionState::Disconnected);
                SessionInbound::Disconnected
            }
        }
    }

    /// Closes the session and releases the transport handle.
    pub async fn close(&mut self) {
        self.transport.close().await;
        self.set_state(SessionState::Disconnected);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
