//! btleplug implementation of [`LinkTransport`].
//!
//! Drives the platform BLE central: scans for the peer by advertised name
//! and service UUID, connects, resolves the write/notify characteristic
//! pair, and exposes notify payloads as an inbound stream. All policy
//! (retries, flushing, state) lives above this layer.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, ValueNotification,
    WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::{Stream, StreamExt};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use relay_core::protocol::messages::MAX_WIRE_LINE_BYTES;

use super::{LinkConfig, LinkError, LinkTransport};

/// How often a discovery pass re-checks the adapter's peripheral list.
const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// BLE central transport backed by btleplug.
pub struct BleCentralTransport {
    adapter: Option<Adapter>,
    discovered: Option<Peripheral>,
    peer: Option<ConnectedPeer>,
}

struct ConnectedPeer {
    peripheral: Peripheral,
    write_char: Characteristic,
    notify_char_uuid: Uuid,
    notifications: Pin<Box<dyn Stream<Item = ValueNotification> + Send>>,
}

impl BleCentralTransport {
    pub fn new() -> Self {
        Self {
            adapter: None,
            discovered: None,
            peer: None,
        }
    }

    /// Returns the first usable BLE adapter, opening it on first use.
    async fn adapter(&mut self) -> Result<Adapter, LinkError> {
        if let Some(adapter) = &self.adapter {
            return Ok(adapter.clone());
        }
        let manager = Manager::new()
            .await
            .map_err(|e| LinkError::Adapter(e.to_string()))?;
        let adapter = manager
            .adapters()
            .await
            .map_err(|e| LinkError::Adapter(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| LinkError::Adapter("no BLE adapter present".to_string()))?;
        self.adapter = Some(adapter.clone());
        Ok(adapter)
    }

    /// Checks whether a peripheral's advertisement matches the peer.
    async fn matches_peer(peripheral: &Peripheral, config: &LinkConfig) -> bool {
        let props = match peripheral.properties().await {
            Ok(Some(props)) => props,
            _ => return false,
        };
        let name_matches = props
            .local_name
            .as_deref()
            .map(|name| name.contains(&config.device_name))
            .unwrap_or(false);
        // Some backends omit service UUIDs from cached advertisement data;
        // the ScanFilter already narrowed the candidates by service.
        let service_matches =
            props.services.is_empty() || props.services.contains(&config.service_uuid);
        name_matches && service_matches
    }
}

impl Default for BleCentralTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkTransport for BleCentralTransport {
    async fn discover(&mut self, config: &LinkConfig, window: Duration) -> Result<(), LinkError> {
        self.discovered = None;
        let service_uuid = config.service_uuid;
        let adapter = self.adapter().await?;

        adapter
            .start_scan(ScanFilter {
                services: vec![service_uuid],
            })
            .await
            .map_err(|e| LinkError::Adapter(format!("scan failed: {e}")))?;

        let deadline = Instant::now() + window;
        let found = loop {
            let peripherals = adapter
                .peripherals()
                .await
                .map_err(|e| LinkError::Adapter(e.to_string()))?;

            let mut matched = None;
            for peripheral in peripherals {
                if Self::matches_peer(&peripheral, config).await {
                    matched = Some(peripheral);
                    break;
                }
            }
            if let Some(peripheral) = matched {
                break Some(peripheral);
            }
            if Instant::now() >= deadline {
                break None;
            }
            sleep(SCAN_POLL_INTERVAL).await;
        };

        if let Err(e) = adapter.stop_scan().await {
            debug!("stop_scan failed: {e}");
        }

        match found {
            Some(peripheral) => {
                info!(address = %peripheral.address(), "found peer");
                self.discovered = Some(peripheral);
                Ok(())
            }
            None => Err(LinkError::DiscoveryTimeout { window }),
        }
    }

    async fn connect(&mut self, config: &LinkConfig) -> Result<(), LinkError> {
        let peripheral = self
            .discovered
            .take()
            .ok_or_else(|| LinkError::ConnectFailed("no discovered peer".to_string()))?;

        peripheral
            .connect()
            .await
            .map_err(|e| LinkError::ConnectFailed(e.to_string()))?;
        peripheral
            .discover_services()
            .await
            .map_err(|e| LinkError::ConnectFailed(e.to_string()))?;

        let characteristics = peripheral.characteristics();
        let write_char = characteristics
            .iter()
            .find(|c| c.uuid == config.write_char_uuid)
            .cloned()
            .ok_or_else(|| {
                LinkError::ConnectFailed(format!(
                    "write characteristic {} not found",
                    config.write_char_uuid
                ))
            })?;
        let notify_char = characteristics
            .iter()
            .find(|c| c.uuid == config.notify_char_uuid)
            .cloned()
            .ok_or_else(|| {
                LinkError::ConnectFailed(format!(
                    "notify characteristic {} not found",
                    config.notify_char_uuid
                ))
            })?;

        peripheral
            .subscribe(&notify_char)
            .await
            .map_err(|e| LinkError::ConnectFailed(format!("subscribe failed: {e}")))?;
        let notifications = peripheral
            .notifications()
            .await
            .map_err(|e| LinkError::ConnectFailed(e.to_string()))?;

        self.peer = Some(ConnectedPeer {
            peripheral,
            write_char,
            notify_char_uuid: config.notify_char_uuid,
            notifications,
        });
        Ok(())
    }

    async fn write(&mut self, payload: &[u8]) -> Result<(), LinkError> {
        let peer = self.peer.as_mut().ok_or(LinkError::LinkUnavailable)?;

        // A relay line fits one write-without-response; anything longer is
        // split at the same boundary the peer reassembles on.
        for chunk in payload.chunks(MAX_WIRE_LINE_BYTES) {
            peer.peripheral
                .write(&peer.write_char, chunk, WriteType::WithoutResponse)
                .await
                .map_err(|e| match e {
                    btleplug::Error::NotConnected => LinkError::UnexpectedDisconnect,
                    other => LinkError::WriteFailed(other.to_string()),
                })?;
        }
        Ok(())
    }

    async fn next_inbound(&mut self) -> Option<Vec<u8>> {
        let peer = self.peer.as_mut()?;
        loop {
            match peer.notifications.next().await {
                Some(notification) if notification.uuid == peer.notify_char_uuid => {
                    return Some(notification.value);
                }
                // Notification for a characteristic we never subscribed to.
                Some(notification) => {
                    debug!(uuid = %notification.uuid, "ignoring unrelated notification");
                }
                None => {
                    self.peer = None;
                    return None;
                }
            }
        }
    }

    async fn close(&mut self) {
        self.discovered = None;
        if let Some(peer) = self.peer.take() {
            if let Err(e) = peer.peripheral.disconnect().await {
                warn!("disconnect failed: {e}");
            }
        }
    }
}
