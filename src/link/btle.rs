//! BLE transport backed by btleplug
//!
//! This module handles the Bluetooth side of the dashboard: finding the
//! board by its advertised name, connecting, resolving the telemetry
//! characteristic and reading it.

use async_trait::async_trait;
use btleplug::api::{Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::StreamExt;
use log::{debug, info, warn};
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use uuid::Uuid;

use super::{Link, Transport, TransportError};
use crate::telemetry::constants::TELEMETRY_SERVICE_UUID;

/// Transport over the first available Bluetooth adapter
pub struct BtleTransport {
    adapter: Adapter,
    characteristic_uuid: Uuid,
}

impl BtleTransport {
    /// Open the first Bluetooth adapter on this machine
    pub async fn new(characteristic_uuid: Uuid) -> Result<Self, TransportError> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(TransportError::NoAdapter)?;

        match adapter.adapter_info().await {
            Ok(info) => info!("Using Bluetooth adapter: {}", info),
            Err(e) => debug!("Adapter info unavailable: {}", e),
        }

        Ok(Self { adapter, characteristic_uuid })
    }

    /// Return the peripheral if it advertises `name`
    async fn match_name(&self, peripheral: &Peripheral, name: &str) -> Result<bool, TransportError> {
        let local_name = peripheral
            .properties()
            .await?
            .and_then(|properties| properties.local_name);
        Ok(local_name.as_deref() == Some(name))
    }

    async fn scan_for(&self, name: &str) -> Result<Option<Peripheral>, TransportError> {
        let mut events = self.adapter.events().await?;

        // Already cached by the OS from an earlier scan
        for peripheral in self.adapter.peripherals().await? {
            if self.match_name(&peripheral, name).await? {
                return Ok(Some(peripheral));
            }
        }

        while let Some(event) = events.next().await {
            let id = match event {
                CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                _ => continue,
            };

            let peripheral = self.adapter.peripheral(&id).await?;
            if self.match_name(&peripheral, name).await? {
                return Ok(Some(peripheral));
            }
        }

        Ok(None)
    }
}

#[async_trait]
impl Transport for BtleTransport {
    type Device = Peripheral;
    type Link = BtleLink;

    async fn discover_by_name(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<Option<Peripheral>, TransportError> {
        debug!("Scanning for {} ({:?})...", name, timeout);
        self.adapter.start_scan(ScanFilter::default()).await?;

        let found = match tokio::time::timeout(timeout, self.scan_for(name)).await {
            Ok(result) => result,
            Err(_) => Ok(None),
        };

        if let Err(e) = self.adapter.stop_scan().await {
            debug!("Failed to stop scan: {}", e);
        }

        if let Ok(Some(peripheral)) = &found {
            info!("✓ Device found!");
            info!("  Address: {}", peripheral.address());
            info!("  Name: {}", name);
        }
        found
    }

    async fn connect(&self, peripheral: Peripheral, timeout: Duration) -> Result<BtleLink, TransportError> {
        let deadline = Instant::now() + timeout;

        info!("Connecting to {}...", peripheral.address());
        match timeout_at(deadline, peripheral.connect()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                // The stack may still finish the connect after we give up
                abandon(&peripheral).await;
                return Err(TransportError::Timeout);
            }
        }

        match self.resolve(&peripheral, deadline).await {
            Ok(link) => Ok(link),
            Err(e) => {
                abandon(&peripheral).await;
                Err(e)
            }
        }
    }
}

/// Disconnect after a failed connect so the board goes back to advertising
async fn abandon(peripheral: &Peripheral) {
    debug!("Abandoning connection to {}", peripheral.address());
    if let Err(e) = peripheral.disconnect().await {
        debug!("Disconnect after failed connect: {}", e);
    }
}

impl BtleTransport {
    /// Discover services on a connected peripheral and bind the telemetry characteristic
    async fn resolve(&self, peripheral: &Peripheral, deadline: Instant) -> Result<BtleLink, TransportError> {
        info!("Discovering services...");
        timeout_at(deadline, peripheral.discover_services())
            .await
            .map_err(|_| TransportError::Timeout)??;

        if !peripheral.services().iter().any(|s| s.uuid == TELEMETRY_SERVICE_UUID) {
            debug!("Device Information service not listed, searching all characteristics");
        }

        let characteristic = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == self.characteristic_uuid)
            .ok_or(TransportError::CharacteristicMissing(self.characteristic_uuid))?;
        debug!("Found telemetry characteristic {}", characteristic.uuid);

        let name = match timeout_at(deadline, peripheral.properties()).await {
            Ok(Ok(properties)) => properties.and_then(|p| p.local_name),
            _ => None,
        }
        .unwrap_or_else(|| "Unknown".to_string());

        info!("✓ Connected successfully!");
        Ok(BtleLink { peripheral: peripheral.clone(), characteristic, name })
    }
}

/// Connected board with a resolved telemetry characteristic
pub struct BtleLink {
    peripheral: Peripheral,
    characteristic: Characteristic,
    name: String,
}

#[async_trait]
impl Link for BtleLink {
    async fn read(&mut self) -> Result<Vec<u8>, TransportError> {
        self.peripheral
            .read(&self.characteristic)
            .await
            .map_err(|e| TransportError::Lost(e.to_string()))
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        if !self.peripheral.is_connected().await.unwrap_or(false) {
            debug!("{} already disconnected", self.name);
            return Ok(());
        }

        info!("Disconnecting from {}...", self.name);
        if let Err(e) = self.peripheral.disconnect().await {
            warn!("Disconnect from {} failed: {}", self.name, e);
            return Err(e.into());
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.name, self.peripheral.address())
    }
}
