//! Transport abstraction for the wireless link
//!
//! This module provides a narrow interface over the BLE stack so the
//! acquisition controller and the dashboard loop can run against either the
//! real adapter ([`btle`]) or a scripted one ([`mock`]).

pub mod btle;
pub mod mock;

pub use btle::{BtleLink, BtleTransport};
pub use mock::{MockLink, MockTransport};

use async_trait::async_trait;
use log::{debug, info, warn};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("No Bluetooth adapters found")]
    NoAdapter,

    #[error("BLE operation failed: {0}")]
    Ble(#[from] btleplug::Error),

    #[error("Characteristic {0} not found on device")]
    CharacteristicMissing(Uuid),

    #[error("Operation timed out")]
    Timeout,

    #[error("Link lost: {0}")]
    Lost(String),

    #[error("{0}")]
    Scripted(String),
}

/// Unified interface for finding and binding a peripheral
#[async_trait]
pub trait Transport: Send + Sync {
    /// Reference to a discovered, not yet connected, peripheral
    type Device: Send;

    /// Bound link produced by a successful connect
    type Link: Link;

    /// Look for a peripheral advertising `name` for at most `timeout`.
    /// `Ok(None)` means it was not seen in that window.
    async fn discover_by_name(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<Option<Self::Device>, TransportError>;

    /// Connect to a discovered peripheral and resolve the telemetry
    /// characteristic, giving up with [`TransportError::Timeout`] after
    /// `timeout`. An `Err` never leaves the peripheral connected.
    async fn connect(&self, device: Self::Device, timeout: Duration) -> Result<Self::Link, TransportError>;
}

/// A bound link to the telemetry characteristic
#[async_trait]
pub trait Link: Send {
    /// Read one raw telemetry payload
    async fn read(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Drop the connection. Calling it on an already released link is a no-op.
    async fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Human readable peer description for logs
    fn describe(&self) -> String;
}

/// Exclusive owner of a bound link.
///
/// Produced by the acquisition controller, consumed by the dashboard loop.
/// [`ConnectionHandle::release`] disconnects at most once no matter how many
/// exit paths call it.
pub struct ConnectionHandle<L: Link> {
    link: L,
    released: bool,
}

impl<L: Link> ConnectionHandle<L> {
    pub fn new(link: L) -> Self {
        Self { link, released: false }
    }

    /// Read one raw payload from the peer
    pub async fn read(&mut self) -> Result<Vec<u8>, TransportError> {
        if self.released {
            return Err(TransportError::Lost("handle already released".into()));
        }
        self.link.read().await
    }

    /// Disconnect from the peer (idempotent)
    pub async fn release(&mut self) {
        if self.released {
            debug!("Link {} already released", self.link.describe());
            return;
        }
        self.released = true;

        info!("Releasing link to {}...", self.link.describe());
        match self.link.disconnect().await {
            Ok(()) => info!("✓ Link released"),
            Err(e) => warn!("Disconnect failed: {}", e),
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl<L: Link> Drop for ConnectionHandle<L> {
    fn drop(&mut self) {
        if !self.released {
            warn!("Connection handle to {} dropped without release", self.link.describe());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_release_disconnects_once() {
        let link = MockLink::new(vec![Ok(b"1,2,3,4,0".to_vec())]);
        let counters = link.counters();
        let mut handle = ConnectionHandle::new(link);

        assert_eq!(handle.read().await.unwrap(), b"1,2,3,4,0".to_vec());

        handle.release().await;
        handle.release().await;

        assert!(handle.is_released());
        assert_eq!(counters.disconnects(), 1);
    }

    #[tokio::test]
    async fn test_read_after_release_is_lost() {
        let link = MockLink::new(vec![Ok(b"1,2,3,4,0".to_vec())]);
        let mut handle = ConnectionHandle::new(link);
        handle.release().await;

        assert!(matches!(handle.read().await, Err(TransportError::Lost(_))));
    }
}
