//! Device acquisition
//!
//! Finds the board by name and connects to it, retrying until a time budget
//! runs out. Discovery and connect failures only cost an attempt; running
//! out of budget is the one terminal outcome besides shutdown.
//!
//! Shutdown is observed between steps, never by dropping an in-flight
//! connect, so a half-open connection is always torn down by the transport.

use log::{debug, info, warn};
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;

use crate::display::{draw_box, Display, DisplayError, Style};
use crate::error::DashError;
use crate::link::{ConnectionHandle, Transport, TransportError};
use crate::telemetry::constants::*;

/// Timing of the acquisition loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquirePolicy {
    /// Total budget, measured from the first attempt
    pub max_wait: Duration,
    /// One discovery-by-name window
    pub discovery_timeout: Duration,
    /// Pause after an unsuccessful attempt
    pub retry_backoff: Duration,
    /// One connect call, enforced by the transport
    pub connect_timeout: Duration,
}

impl Default for AcquirePolicy {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_millis(MAX_WAIT_MS),
            discovery_timeout: Duration::from_millis(DISCOVERY_TIMEOUT_MS),
            retry_backoff: Duration::from_millis(RETRY_BACKOFF_MS),
            connect_timeout: Duration::from_millis(CONNECT_TIMEOUT_MS),
        }
    }
}

/// Receives one tick per acquisition attempt. Presentation only.
pub trait AcquireProgress {
    fn searching(&mut self, device: &str, attempt: usize);
}

/// Progress sink that shows nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl AcquireProgress for NoProgress {
    fn searching(&mut self, _device: &str, _attempt: usize) {}
}

const ELLIPSIS: [&str; 4] = ["   ", ".  ", ".. ", "..."];

/// "Searching for device ..." screen with a rotating ellipsis
pub struct SearchScreen<'a, D: Display + ?Sized> {
    display: &'a mut D,
}

impl<'a, D: Display + ?Sized> SearchScreen<'a, D> {
    pub fn new(display: &'a mut D) -> Self {
        Self { display }
    }

    fn draw(&mut self, device: &str, attempt: usize) -> Result<(), DisplayError> {
        let (cols, rows) = self.display.size()?;
        self.display.clear()?;
        draw_box(&mut *self.display, 0, 0, rows, cols, Style::Plain)?;
        let text = format!("Searching for device {}{}", device, ELLIPSIS[attempt % ELLIPSIS.len()]);
        self.display.put_str(5, 10, &text, Style::Plain)?;
        self.display.flush()
    }
}

impl<D: Display + ?Sized> AcquireProgress for SearchScreen<'_, D> {
    fn searching(&mut self, device: &str, attempt: usize) {
        // A broken indicator must not change retry behaviour
        if let Err(e) = self.draw(device, attempt) {
            debug!("Search screen not drawn: {}", e);
        }
    }
}

/// Show the acquisition failure message
pub fn show_not_found<D: Display + ?Sized>(display: &mut D, device: &str) -> Result<(), DisplayError> {
    display.clear()?;
    display.put_str(7, 10, &format!("Device {} not found.", device), Style::Plain)?;
    display.put_str(8, 10, "Press any key to exit.", Style::Plain)?;
    display.flush()
}

/// Discover `device_name` and connect to it within `policy.max_wait`.
///
/// The first successful discovery + connect returns immediately. Each
/// discovery window and backoff is clamped to the remaining budget, so a
/// timeout is reported at `max_wait` rather than one window later.
///
/// Returns [`DashError::Cancelled`] once `shutdown` fires; a link that came
/// up in the meantime is released first.
pub async fn acquire<T, P>(
    transport: &T,
    device_name: &str,
    policy: &AcquirePolicy,
    progress: &mut P,
    shutdown: &CancellationToken,
) -> Result<ConnectionHandle<T::Link>, DashError>
where
    T: Transport,
    P: AcquireProgress + ?Sized,
{
    info!("Searching for {} (up to {:?})...", device_name, policy.max_wait);
    let start = Instant::now();
    let mut attempt = 0usize;

    loop {
        if shutdown.is_cancelled() {
            info!("Search for {} cancelled", device_name);
            return Err(DashError::Cancelled);
        }

        let remaining = policy.max_wait.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            break;
        }

        progress.searching(device_name, attempt);
        attempt += 1;

        let window = policy.discovery_timeout.min(remaining);
        debug!("Discovery attempt {} ({:?} window, {:?} left)", attempt, window, remaining);

        let found = match timeout(window, transport.discover_by_name(device_name, window)).await {
            Ok(Ok(found)) => found,
            Ok(Err(e)) => {
                warn!("Discovery attempt {} failed: {}", attempt, e);
                None
            }
            Err(_) => None,
        };

        if let Some(device) = found {
            match transport.connect(device, policy.connect_timeout).await {
                Ok(link) => {
                    let mut handle = ConnectionHandle::new(link);
                    if shutdown.is_cancelled() {
                        handle.release().await;
                        return Err(DashError::Cancelled);
                    }
                    info!("✓ Acquired {} after {} attempt(s)", device_name, attempt);
                    return Ok(handle);
                }
                Err(TransportError::Timeout) => {
                    warn!("Connect attempt {} timed out after {:?}", attempt, policy.connect_timeout)
                }
                Err(e) => warn!("Connect attempt {} failed: {}", attempt, e),
            }
        }

        let remaining = policy.max_wait.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            break;
        }
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {}
            _ = sleep(policy.retry_backoff.min(remaining)) => {}
        }
    }

    let waited = start.elapsed();
    warn!("Device {} not found after {} attempt(s) in {:?}", device_name, attempt, waited);
    Err(DashError::AcquisitionTimeout { device: device_name.to_string(), waited })
}
