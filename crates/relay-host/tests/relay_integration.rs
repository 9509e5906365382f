//! End-to-end relay scenarios over the scriptable mock transport.
//!
//! Each test drives the full chain the binary wires up: a channel-fed input
//! source, the focus-gated capture pump, the session manager, and the relay
//! coordinator running as its own task. Only the radio is faked.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use relay_host::application::relay::RelayCoordinator;
use relay_host::infrastructure::input_capture::{
    start_capture_pump, InputSource, RawInputNotification,
};
use relay_host::infrastructure::link::mock::{MockLinkHandle, MockLinkTransport};
use relay_host::infrastructure::link::{LinkConfig, LinkError, LinkSessionManager};
use relay_host::infrastructure::shell_bridge::{ShellInputHandle, ShellInputSource};

/// Everything a test needs to drive and observe a running relay.
struct Harness {
    shell: ShellInputHandle,
    link: MockLinkHandle,
    shutdown_tx: watch::Sender<bool>,
    running: Arc<AtomicBool>,
    source: ShellInputSource,
    pump: std::thread::JoinHandle<()>,
    relay_task: tokio::task::JoinHandle<()>,
}

impl Harness {
    fn start() -> Self {
        Self::start_with_config(LinkConfig::default(), |_| {})
    }

    fn start_with_config(config: LinkConfig, script: impl FnOnce(&MockLinkHandle)) -> Self {
        let (transport, link) = MockLinkTransport::new();
        script(&link);
        let (session, _status_rx) = LinkSessionManager::new(transport, config);

        let running = Arc::new(AtomicBool::new(true));
        let (capture_tx, capture_rx) = mpsc::channel(64);
        let source = ShellInputSource::new();
        let shell = source.handle();
        let pump = start_capture_pump(&source, capture_tx, Arc::clone(&running))
            .expect("pump must start");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let relay = RelayCoordinator::new(session, capture_rx, shutdown_rx);
        let relay_task = tokio::spawn(relay.run());

        Self {
            shell,
            link,
            shutdown_tx,
            running,
            source,
            pump,
            relay_task,
        }
    }

    /// Polls until `predicate` holds or a second passes.
    async fn wait_until(&self, predicate: impl Fn(&MockLinkHandle) -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        while !predicate(&self.link) {
            assert!(
                tokio::time::Instant::now() < deadline,
                "condition not reached within 1s; writes so far: {:?}",
                self.link.written()
            );
            tokio::task::yield_now().await;
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn shutdown(self) {
        self.shutdown_tx.send(true).expect("relay should be alive");
        self.relay_task.await.expect("relay task must not panic");
        self.running.store(false, Ordering::Relaxed);
        self.source.stop();
        let _ = self.pump.join();
    }
}

#[tokio::test]
async fn relays_focused_key_traffic_in_fifo_order() {
    let h = Harness::start();
    h.wait_until(|link| link.is_link_up()).await;

    h.shell.notify(RawInputNotification::FocusGained);
    h.shell.notify(RawInputNotification::KeyDown { code: 65 });
    h.shell.notify(RawInputNotification::KeyDown { code: 66 });
    h.shell.notify(RawInputNotification::KeyUp { code: 66 });
    h.shell.notify(RawInputNotification::KeyUp { code: 65 });

    h.wait_until(|link| link.written().len() == 4).await;
    assert_eq!(
        h.link.written(),
        vec!["KP:65", "KP:66", "KR:66", "KR:65"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
    );

    h.shutdown().await;
}

#[tokio::test]
async fn unfocused_input_never_reaches_the_peer() {
    let h = Harness::start();
    h.wait_until(|link| link.is_link_up()).await;

    // No FocusGained yet: these must be dropped at the capture gate.
    h.shell.notify(RawInputNotification::KeyDown { code: 65 });
    h.shell.notify(RawInputNotification::KeyUp { code: 65 });

    // A focused event afterwards proves the earlier ones were dropped,
    // not merely delayed.
    h.shell.notify(RawInputNotification::FocusGained);
    h.shell.notify(RawInputNotification::KeyDown { code: 90 });

    h.wait_until(|link| !link.written().is_empty()).await;
    assert_eq!(h.link.written(), vec!["KP:90".to_string()]);

    h.shutdown().await;
}

#[tokio::test]
async fn focus_loss_synthesizes_releases_for_held_input() {
    let h = Harness::start();
    h.wait_until(|link| link.is_link_up()).await;

    h.shell.notify(RawInputNotification::FocusGained);
    h.shell.notify(RawInputNotification::KeyDown { code: 65 });
    h.shell.notify(RawInputNotification::PointerDown { x: 500, y: 700 });
    h.shell.notify(RawInputNotification::FocusLost);

    h.wait_until(|link| link.written().len() == 4).await;
    let written = h.link.written();
    assert_eq!(&written[..2], &["KP:65".to_string(), "MDown:500,700".to_string()]);
    assert!(written[2..].contains(&"KR:65".to_string()));
    assert!(written[2..].contains(&"MUp:500,700".to_string()));

    h.shutdown().await;
}

#[tokio::test]
async fn shutdown_flushes_held_keys_before_closing() {
    let h = Harness::start();
    h.wait_until(|link| link.is_link_up()).await;

    h.shell.notify(RawInputNotification::FocusGained);
    h.shell.notify(RawInputNotification::KeyDown { code: 65 });
    h.wait_until(|link| link.written().len() == 1).await;

    let link = h.link.clone();
    h.shutdown().await;

    assert_eq!(
        link.written(),
        vec!["KP:65".to_string(), "KR:65".to_string()]
    );
    assert!(!link.is_link_up());
}

#[tokio::test]
async fn reconnects_after_link_loss_without_replaying_stale_input() {
    let h = Harness::start();
    h.wait_until(|link| link.is_link_up()).await;

    h.shell.notify(RawInputNotification::FocusGained);
    h.shell.notify(RawInputNotification::KeyDown { code: 65 });
    h.wait_until(|link| link.written().len() == 1).await;

    // The peer walks out of range mid-session.
    h.link.drop_link();
    h.wait_until(|link| link.is_link_up()).await;

    // Input typed during the outage must not show up after the reconnect;
    // only fresh traffic does.
    h.shell.notify(RawInputNotification::KeyDown { code: 90 });
    h.wait_until(|link| link.written().iter().any(|l| l == "KP:90")).await;

    let written = h.link.written();
    assert!(
        !written.iter().any(|l| l == "KR:65"),
        "synthetic release raced the reconnect: {written:?}"
    );
    assert_eq!(written.last().map(String::as_str), Some("KP:90"));

    h.shutdown().await;
}

#[tokio::test]
async fn discovery_timeout_is_retried_after_the_delay() {
    let mut config = LinkConfig::default();
    config.retry_delay = Duration::from_millis(10);

    let h = Harness::start_with_config(config, |link| {
        link.queue_discover_result(Err(LinkError::DiscoveryTimeout {
            window: Duration::from_secs(10),
        }));
    });

    // First pass fails; the coordinator waits the delay and the second
    // unscripted pass succeeds.
    h.wait_until(|link| link.is_link_up()).await;

    h.shell.notify(RawInputNotification::FocusGained);
    h.shell.notify(RawInputNotification::KeyDown { code: 65 });
    h.wait_until(|link| !link.written().is_empty()).await;
    assert_eq!(h.link.written(), vec!["KP:65".to_string()]);

    h.shutdown().await;
}

#[tokio::test]
async fn input_during_scan_is_dropped_not_queued() {
    let mut config = LinkConfig::default();
    config.retry_delay = Duration::from_millis(50);

    let h = Harness::start_with_config(config, |link| {
        // Hold the relay in its retry loop for a few passes.
        for _ in 0..3 {
            link.queue_discover_result(Err(LinkError::DiscoveryTimeout {
                window: Duration::from_secs(10),
            }));
        }
    });

    // Typed while nothing is connected.
    h.shell.notify(RawInputNotification::FocusGained);
    h.shell.notify(RawInputNotification::KeyDown { code: 65 });
    h.shell.notify(RawInputNotification::KeyUp { code: 65 });

    h.wait_until(|link| link.is_link_up()).await;

    // Fresh input after the connect is the first thing the peer sees.
    h.shell.notify(RawInputNotification::KeyDown { code: 90 });
    h.wait_until(|link| !link.written().is_empty()).await;
    assert_eq!(h.link.written(), vec!["KP:90".to_string()]);

    h.shutdown().await;
}

#[tokio::test]
async fn peer_notifications_do_not_disturb_the_relay() {
    let h = Harness::start();
    h.wait_until(|link| link.is_link_up()).await;

    h.link.push_inbound(b"READY\n".to_vec());
    h.link.push_inbound(b"KP:65".to_vec());

    h.shell.notify(RawInputNotification::FocusGained);
    h.shell.notify(RawInputNotification::KeyDown { code: 65 });
    h.wait_until(|link| !link.written().is_empty()).await;
    assert_eq!(h.link.written(), vec!["KP:65".to_string()]);

    h.shutdown().await;
}
