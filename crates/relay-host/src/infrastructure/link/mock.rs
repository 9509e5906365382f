//! Scriptable in-memory link transport for unit and integration tests.
//!
//! Allows tests to fail discovery passes, inject peer notifications, drop
//! the link mid-session, and inspect everything the session wrote — without
//! a radio.

use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{LinkConfig, LinkError, LinkTransport};

#[derive(Default)]
struct Shared {
    discover_results: Mutex<VecDeque<Result<(), LinkError>>>,
    connect_results: Mutex<VecDeque<Result<(), LinkError>>>,
    write_results: Mutex<VecDeque<Result<(), LinkError>>>,
    writes: Mutex<Vec<Vec<u8>>>,
    write_attempts: AtomicU64,
    link_up: AtomicBool,
    inbound_tx: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
}

/// A mock implementation of [`LinkTransport`].
///
/// Unscripted operations succeed, so the default mock behaves like a peer
/// that is always in range and never busy.
pub struct MockLinkTransport {
    shared: Arc<Shared>,
    inbound_rx: Option<mpsc::UnboundedReceiver<Vec<u8>>>,
}

/// Test-side handle controlling a [`MockLinkTransport`].
#[derive(Clone)]
pub struct MockLinkHandle {
    shared: Arc<Shared>,
}

impl MockLinkTransport {
    pub fn new() -> (Self, MockLinkHandle) {
        let shared = Arc::new(Shared::default());
        (
            Self {
                shared: Arc::clone(&shared),
                inbound_rx: None,
            },
            MockLinkHandle { shared },
        )
    }
}

impl MockLinkHandle {
    /// Scripts the outcome of the next discovery pass.
    pub fn queue_discover_result(&self, result: Result<(), LinkError>) {
        self.shared
            .discover_results
            .lock()
            .expect("lock poisoned")
            .push_back(result);
    }

    /// Scripts the outcome of the next connect attempt.
    pub fn queue_connect_result(&self, result: Result<(), LinkError>) {
        self.shared
            .connect_results
            .lock()
            .expect("lock poisoned")
            .push_back(result);
    }

    /// Scripts the outcome of the next write.
    pub fn queue_write_result(&self, result: Result<(), LinkError>) {
        self.shared
            .write_results
            .lock()
            .expect("lock poisoned")
            .push_back(result);
    }

    /// Injects a peer notification payload.
    pub fn push_inbound(&self, payload: Vec<u8>) {
        if let Some(tx) = self.shared.inbound_tx.lock().expect("lock poisoned").as_ref() {
            let _ = tx.send(payload);
        }
    }

    /// Simulates an unexpected link loss: the notification stream ends and
    /// subsequent writes fail with [`LinkError::UnexpectedDisconnect`].
    pub fn drop_link(&self) {
        self.shared.link_up.store(false, Ordering::SeqCst);
        self.shared.inbound_tx.lock().expect("lock poisoned").take();
    }

    /// Everything successfully written, as UTF-8 lines.
    pub fn written(&self) -> Vec<String> {
        self.shared
            .writes
            .lock()
            .expect("lock poisoned")
            .iter()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .collect()
    }

    /// Number of write calls, including failed ones.
    pub fn write_attempts(&self) -> u64 {
        self.shared.write_attempts.load(Ordering::SeqCst)
    }

    /// Whether the simulated link is currently up.
    pub fn is_link_up(&self) -> bool {
        self.shared.link_up.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LinkTransport for MockLinkTransport {
    async fn discover(&mut self, _config: &LinkConfig, _window: Duration) -> Result<(), LinkError> {
        self.shared
            .discover_results
            .lock()
            .expect("lock poisoned")
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn connect(&mut self, _config: &LinkConfig) -> Result<(), LinkError> {
        self.shared
            .connect_results
            .lock()
            .expect("lock poisoned")
            .pop_front()
            .unwrap_or(Ok(()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        *self.shared.inbound_tx.lock().expect("lock poisoned") = Some(tx);
        self.inbound_rx = Some(rx);
        self.shared.link_up.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn write(&mut self, payload: &[u8]) -> Result<(), LinkError> {
        self.shared.write_attempts.fetch_add(1, Ordering::SeqCst);
        if !self.shared.link_up.load(Ordering::SeqCst) {
            return Err(LinkError::UnexpectedDisconnect);
        }
        self.shared
            .write_results
            .lock()
            .expect("lock poisoned")
            .pop_front()
            .unwrap_or(Ok(()))?;
        self.shared
            .writes
            .lock()
            .expect("lock poisoned")
            .push(payload.to_vec());
        Ok(())
    }

    async fn next_inbound(&mut self) -> Option<Vec<u8>> {
        match self.inbound_rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    async fn close(&mut self) {
        self.shared.link_up.store(false, Ordering::SeqCst);
        self.shared.inbound_tx.lock().expect("lock poisoned").take();
        self.inbound_rx = None;
    }
}
