//! BLE HID Relay host entry point.
//!
//! Wires together the infrastructure services and starts the Tokio async
//! runtime. The GUI shell plugs in through the `shell_bridge` seam; this
//! binary runs the headless core.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()            -- TOML config, defaults on first run
//!  └─ start services
//!       ├─ capture pump        (std thread, focus-gated)
//!       ├─ status watcher      (Tokio task, logs session state)
//!       └─ RelayCoordinator    (Tokio task: scan/connect/relay loop)
//! ```

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use relay_host::application::relay::RelayCoordinator;
use relay_host::infrastructure::input_capture::{start_capture_pump, InputSource};
use relay_host::infrastructure::link::{ble::BleCentralTransport, LinkSessionManager};
use relay_host::infrastructure::shell_bridge::{status_label, ShellInputSource};
use relay_host::infrastructure::storage::config::{config_file_path, load_config};

/// Capacity of the capture-to-coordinator channel. Input is tiny and the
/// coordinator drains fast; a small buffer only smooths bursts.
const CAPTURE_CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    let config = load_config()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.host.log_level.clone())),
        )
        .init();

    info!("BLE HID Relay host starting");
    match config_file_path() {
        Ok(path) => info!(path = %path.display(), "config resolved"),
        Err(e) => warn!("no config path: {e}"),
    }

    let link_config = config.link.to_link_config()?;

    // ── Link session ──────────────────────────────────────────────────────────
    let transport = BleCentralTransport::new();
    let (session, mut status_rx) = LinkSessionManager::new(transport, link_config);

    // Status watcher: the GUI shell would render this in its status bar; the
    // headless binary logs it instead.
    tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let state = *status_rx.borrow();
            info!(status = status_label(state), "session status");
        }
    });

    // ── Input capture ─────────────────────────────────────────────────────────
    // Shutdown flag shared with the capture pump thread.
    let running = Arc::new(AtomicBool::new(true));
    let (capture_tx, capture_rx) = tokio::sync::mpsc::channel(CAPTURE_CHANNEL_CAPACITY);

    let source = ShellInputSource::new();
    // The GUI shell receives this handle and feeds it window focus changes
    // and key/pointer notifications. Headless, nothing drives it; the relay
    // idles connected until input arrives.
    let _shell_handle = source.handle();
    let pump = start_capture_pump(&source, capture_tx, Arc::clone(&running))?;

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            running_clone.store(false, Ordering::Relaxed);
            let _ = shutdown_tx.send(true);
        }
    });

    info!("BLE HID Relay host ready.  Press Ctrl-C to exit.");

    // ── Relay loop ────────────────────────────────────────────────────────────
    let relay = RelayCoordinator::new(session, capture_rx, shutdown_rx);
    relay.run().await;

    // Stop the capture side and wait for the pump thread to notice.
    running.store(false, Ordering::Relaxed);
    source.stop();
    if pump.join().is_err() {
        warn!("capture pump thread panicked");
    }

    info!("BLE HID Relay host stopped");
    Ok(())
}
