//! Mock transport for testing.
//!
//! This transport replays a script instead of talking to a Bluetooth
//! adapter. Useful for testing acquisition and the dashboard loop without
//! a board in range.

use async_trait::async_trait;
use log::info;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{Link, Transport, TransportError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Outcome of one scripted discovery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryStep {
    /// Scan the whole window without seeing the device
    NotFound,
    /// Report the device immediately
    Found,
    /// Fail the scan with an adapter error
    Fail(String),
}

/// Call counters shared between a mock and the test that built it
#[derive(Debug, Default)]
pub struct MockCounters {
    discoveries: AtomicUsize,
    connects: AtomicUsize,
    reads: AtomicUsize,
    disconnects: AtomicUsize,
    open: AtomicUsize,
}

impl MockCounters {
    pub fn discoveries(&self) -> usize {
        self.discoveries.load(Ordering::SeqCst)
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// Connections currently held open on the peer side
    pub fn open(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    fn close(&self) {
        let _ = self
            .open
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
}

/// Device reference handed out by [`MockTransport`]
#[derive(Debug, Clone)]
pub struct MockDevice {
    pub name: String,
}

/// Scripted transport. Once the discovery script is exhausted every further
/// attempt reports [`DiscoveryStep::NotFound`].
pub struct MockTransport {
    discovery: Mutex<VecDeque<DiscoveryStep>>,
    connect_failures: AtomicUsize,
    connect_delay: Duration,
    payloads: Mutex<Vec<Result<Vec<u8>, TransportError>>>,
    counters: Arc<MockCounters>,
}

impl MockTransport {
    /// Create a transport that follows `steps` for successive discovery attempts
    pub fn new(steps: Vec<DiscoveryStep>) -> Self {
        Self {
            discovery: Mutex::new(steps.into()),
            connect_failures: AtomicUsize::new(0),
            connect_delay: Duration::ZERO,
            payloads: Mutex::new(Vec::new()),
            counters: Arc::new(MockCounters::default()),
        }
    }

    /// A transport that never sees the device
    pub fn never_found() -> Self {
        Self::new(Vec::new())
    }

    /// A transport that sees the device on attempt `attempt` (1-based)
    pub fn found_on_attempt(attempt: usize) -> Self {
        let mut steps = vec![DiscoveryStep::NotFound; attempt.saturating_sub(1)];
        steps.push(DiscoveryStep::Found);
        Self::new(steps)
    }

    /// Fail the first `count` connect calls
    pub fn with_connect_failures(self, count: usize) -> Self {
        self.connect_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Take `delay` to bring a connection up. The peer counts as connected
    /// from the start of the call.
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// Payloads the connected link returns, in order. After the last one the
    /// link reports [`TransportError::Lost`].
    pub fn with_payloads(self, payloads: Vec<Result<Vec<u8>, TransportError>>) -> Self {
        *lock(&self.payloads) = payloads;
        self
    }

    pub fn counters(&self) -> Arc<MockCounters> {
        Arc::clone(&self.counters)
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Device = MockDevice;
    type Link = MockLink;

    async fn discover_by_name(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<Option<MockDevice>, TransportError> {
        self.counters.discoveries.fetch_add(1, Ordering::SeqCst);
        let step = lock(&self.discovery).pop_front().unwrap_or(DiscoveryStep::NotFound);

        info!("[MOCK LINK] Discovery for {}: {:?}", name, step);
        match step {
            DiscoveryStep::Found => Ok(Some(MockDevice { name: name.to_string() })),
            DiscoveryStep::NotFound => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
            DiscoveryStep::Fail(reason) => Err(TransportError::Scripted(reason)),
        }
    }

    async fn connect(&self, device: MockDevice, timeout: Duration) -> Result<MockLink, TransportError> {
        self.counters.connects.fetch_add(1, Ordering::SeqCst);

        let remaining = self.connect_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.connect_failures.store(remaining - 1, Ordering::SeqCst);
            info!("[MOCK LINK] Connect to {} refused", device.name);
            return Err(TransportError::Scripted("connection refused".into()));
        }

        self.counters.open.fetch_add(1, Ordering::SeqCst);
        if tokio::time::timeout(timeout, tokio::time::sleep(self.connect_delay)).await.is_err() {
            self.counters.close();
            info!("[MOCK LINK] Connect to {} timed out, disconnected", device.name);
            return Err(TransportError::Timeout);
        }

        info!("[MOCK LINK] Connected to {}", device.name);
        let payloads = std::mem::take(&mut *lock(&self.payloads));
        Ok(MockLink {
            name: device.name,
            payloads: payloads.into(),
            counters: Arc::clone(&self.counters),
        })
    }
}

/// Link produced by [`MockTransport`], replaying a payload queue
pub struct MockLink {
    name: String,
    payloads: VecDeque<Result<Vec<u8>, TransportError>>,
    counters: Arc<MockCounters>,
}

impl MockLink {
    /// Standalone link, for tests that skip acquisition
    pub fn new(payloads: Vec<Result<Vec<u8>, TransportError>>) -> Self {
        let counters = MockCounters::default();
        counters.open.store(1, Ordering::SeqCst);
        Self {
            name: "mock".to_string(),
            payloads: payloads.into(),
            counters: Arc::new(counters),
        }
    }

    pub fn counters(&self) -> Arc<MockCounters> {
        Arc::clone(&self.counters)
    }
}

#[async_trait]
impl Link for MockLink {
    async fn read(&mut self) -> Result<Vec<u8>, TransportError> {
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        self.payloads
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Lost("script exhausted".into())))
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.counters.disconnects.fetch_add(1, Ordering::SeqCst);
        self.counters.close();
        info!("[MOCK LINK] Disconnected from {}", self.name);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{} (mock)", self.name)
    }
}
