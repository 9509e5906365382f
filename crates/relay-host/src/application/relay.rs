//! RelayCoordinator: ties input capture to the codec and the link session.
//!
//! This use case is the heart of the host application. It receives capture
//! events from the input adapter, encodes them, sends them through the
//! [`LinkSessionManager`], and tracks held input so that disconnects, focus
//! loss, and shutdown never leave a key stuck down on the peer.
//!
//! # Delivery policy
//!
//! The link is best-effort. A message that fails to send is dropped, never
//! retried: replaying stale input out of order is worse for a HID stream
//! than losing it. While the session is not connected, capture events are
//! drained and dropped (not queued), so no backlog of stale input replays
//! after a long outage.
//!
//! # Held-input policy
//!
//! A press enters the [`HeldInputSet`] only after its send succeeded
//! (withholding): a press the peer may never have seen must not produce a
//! phantom release later. Releases clear their entry regardless of send
//! outcome, and removing an absent entry is a no-op: a release with no
//! prior press is normal right after a reconnect.

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

use relay_core::{decode, encode, HeldInputSet, InputEvent};

use crate::infrastructure::input_capture::CaptureEvent;
use crate::infrastructure::link::{
    LinkError, LinkSessionManager, LinkTransport, SessionInbound, SessionState,
};

/// Running totals the shell can display next to the session status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Events successfully written to the link.
    pub relayed: u64,
    /// Events dropped (no link, unsupported, or write failure).
    pub dropped: u64,
    /// Synthetic releases attempted by flushes.
    pub synthetic_releases: u64,
}

/// Outcome of one phase of the coordinator loop.
enum Phase {
    /// Keep running; re-dispatch on the current session state.
    Continue,
    /// Shut down: flush, close the session, exit.
    Stop,
}

/// What woke the connected loop up.
enum Turn {
    Capture(Option<CaptureEvent>),
    Inbound(SessionInbound),
    Shutdown,
}

/// The relay coordinator.
///
/// Single task, single writer: every send is awaited before the next event
/// is processed, which is what preserves FIFO ordering on the session.
pub struct RelayCoordinator<T: LinkTransport> {
    session: LinkSessionManager<T>,
    held: HeldInputSet,
    capture_rx: mpsc::Receiver<CaptureEvent>,
    shutdown_rx: watch::Receiver<bool>,
    stats: RelayStats,
}

impl<T: LinkTransport> RelayCoordinator<T> {
    pub fn new(
        session: LinkSessionManager<T>,
        capture_rx: mpsc::Receiver<CaptureEvent>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            session,
            held: HeldInputSet::new(),
            capture_rx,
            shutdown_rx,
            stats: RelayStats::default(),
        }
    }

    /// Current running totals.
    pub fn stats(&self) -> RelayStats {
        self.stats
    }

    /// Number of inputs currently held down on the peer.
    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    /// Current session state, as the coordinator sees it.
    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// Runs the relay for the process lifetime.
    ///
    /// Alternates between the reconnect phase (scanning while draining and
    /// dropping input) and the connected phase (relaying input, watching
    /// for disconnects). Returns after a shutdown signal, with held input
    /// flushed and the session closed.
    pub async fn run(mut self) {
        loop {
            let phase = match self.session.state() {
                SessionState::Connected => self.run_connected().await,
                _ => self.reconnect().await,
            };
            if matches!(phase, Phase::Stop) {
                break;
            }
        }
        self.shutdown().await;
    }

    /// Flushes held input one final time and closes the session.
    pub async fn shutdown(&mut self) {
        self.flush_held("shutdown").await;
        self.session.close().await;
        info!(stats = ?self.stats, "relay stopped");
    }

    /// Handles one capture event according to the current session state.
    pub async fn handle_capture_event(&mut self, event: CaptureEvent) {
        match event {
            CaptureEvent::Input(input) => {
                if self.session.state() == SessionState::Connected {
                    self.relay_event(input).await;
                } else {
                    self.stats.dropped += 1;
                    debug!(?input, "dropped input while not connected");
                }
            }
            CaptureEvent::FocusLost => self.flush_held("focus lost").await,
            CaptureEvent::FocusGained => debug!("focus gained"),
        }
    }

    /// Sends one synthetic release per held input, then clears the set.
    ///
    /// Best-effort: delivery failures are logged, never retried. The local
    /// set is cleared even when nothing could reach the peer, because the
    /// peer cannot be trusted to share our held-key state after a fault.
    pub async fn flush_held(&mut self, reason: &str) {
        if self.held.is_empty() {
            return;
        }
        let releases = self.held.drain();
        info!(count = releases.len(), reason, "flushing held input");

        for release in releases {
            self.stats.synthetic_releases += 1;
            match encode(&release) {
                Ok(line) => {
                    if let Err(e) = self.session.send(line.as_bytes()).await {
                        debug!(error = %e, %line, "synthetic release not delivered");
                    }
                }
                // Unreachable for events that were encodable when pressed.
                Err(e) => warn!(error = %e, "could not encode synthetic release"),
            }
        }
    }

    // ── Connected phase ───────────────────────────────────────────────────────

    async fn run_connected(&mut self) -> Phase {
        loop {
            let turn = {
                let Self {
                    session,
                    capture_rx,
                    shutdown_rx,
                    ..
                } = &mut *self;
                tokio::select! {
                    maybe = capture_rx.recv() => Turn::Capture(maybe),
                    inbound = session.recv_inbound() => Turn::Inbound(inbound),
                    _ = shutdown_rx.changed() => Turn::Shutdown,
                }
            };

            match turn {
                Turn::Capture(Some(event)) => self.handle_capture_event(event).await,
                // Capture side gone: the shell has shut down.
                Turn::Capture(None) | Turn::Shutdown => return Phase::Stop,
                Turn::Inbound(SessionInbound::Data(data)) => log_peer_payload(&data),
                Turn::Inbound(SessionInbound::Disconnected) => {
                    self.flush_held("link lost").await;
                    return Phase::Continue;
                }
            }

            // A send may have detected the disconnect before the inbound
            // stream did; fall back to the reconnect phase promptly.
            if self.session.state() != SessionState::Connected {
                return Phase::Continue;
            }
        }
    }

    async fn relay_event(&mut self, event: InputEvent) {
        let line = match encode(&event) {
            Ok(line) => line,
            Err(e) => {
                self.stats.dropped += 1;
                warn!(error = %e, "not relaying unsupported event");
                return;
            }
        };

        // A release clears its entry whether or not the send below lands:
        // once we stop relaying a key we must never synthesize its release.
        if event.is_release() {
            self.held.release(&event.input_id());
        }

        match self.session.send(line.as_bytes()).await {
            Ok(()) => {
                self.stats.relayed += 1;
                if event.is_press() {
                    self.held.press(&event);
                }
                trace!(%line, "relayed");
            }
            Err(LinkError::UnexpectedDisconnect) => {
                self.stats.dropped += 1;
                self.flush_held("link lost").await;
            }
            Err(e) => {
                // Withholding: a press that failed to send is not held.
                self.stats.dropped += 1;
                debug!(error = %e, %line, "dropped event");
            }
        }
    }

    // ── Reconnect phase ───────────────────────────────────────────────────────

    async fn reconnect(&mut self) -> Phase {
        let outcome = {
            let Self {
                session,
                capture_rx,
                shutdown_rx,
                stats,
                ..
            } = &mut *self;

            let connect = session.scan_and_connect();
            tokio::pin!(connect);

            loop {
                tokio::select! {
                    result = &mut connect => break ReconnectOutcome::Finished(result),
                    maybe = capture_rx.recv() => match maybe {
                        Some(CaptureEvent::Input(input)) => {
                            stats.dropped += 1;
                            debug!(?input, "dropped input while not connected");
                        }
                        // Nothing is held while disconnected.
                        Some(_) => {}
                        None => break ReconnectOutcome::Stop,
                    },
                    _ = shutdown_rx.changed() => break ReconnectOutcome::Stop,
                }
            }
        };

        match outcome {
            ReconnectOutcome::Stop => Phase::Stop,
            ReconnectOutcome::Finished(Ok(())) => Phase::Continue,
            ReconnectOutcome::Finished(Err(e)) => {
                warn!(error = %e, "connect attempt failed");
                self.drain_for_retry_delay().await
            }
        }
    }

    /// Waits out the retry delay, still draining and dropping input.
    async fn drain_for_retry_delay(&mut self) -> Phase {
        let Self {
            session,
            capture_rx,
            shutdown_rx,
            stats,
            ..
        } = &mut *self;

        let sleep = tokio::time::sleep(session.retry_delay());
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return Phase::Continue,
                maybe = capture_rx.recv() => match maybe {
                    Some(CaptureEvent::Input(input)) => {
                        stats.dropped += 1;
                        debug!(?input, "dropped input while not connected");
                    }
                    Some(_) => {}
                    None => return Phase::Stop,
                },
                _ = shutdown_rx.changed() => return Phase::Stop,
            }
        }
    }
}

/// What a connect attempt in the reconnect phase produced.
enum ReconnectOutcome {
    Finished(Result<(), LinkError>),
    Stop,
}

/// Logs whatever the peer pushed on the notify characteristic.
///
/// The peer protocol defines no mandatory replies; anything that arrives is
/// decoded best-effort and logged, never fatal.
fn log_peer_payload(data: &[u8]) {
    match decode(data) {
        Ok(event) => debug!(?event, "peer echoed input event"),
        Err(_) => info!(
            payload = %String::from_utf8_lossy(data).trim_end(),
            "peer message"
        ),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
