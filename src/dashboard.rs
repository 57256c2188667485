//! Telemetry render loop
//!
//! Reads one record at a time from the bound link, decodes it and hands it
//! to the panels, then waits out the poll interval. Strictly one sample in
//! flight: read, decode, render, wait, repeat.
//!
//! A malformed record is dropped and the panels keep their previous state.
//! The loop ends when the link is lost or shutdown is requested, and the
//! link is released on every exit path.

use log::{debug, info, warn};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::display::{Display, DisplayError};
use crate::error::DashError;
use crate::link::{ConnectionHandle, Link, TransportError};
use crate::panel::RenderSession;
use crate::telemetry::Sample;

/// Why the loop stopped
#[derive(Debug)]
pub enum LoopExit {
    /// Shutdown was requested (keyboard or signal)
    Shutdown,
    /// A read failed; the peer is gone
    TransportLost(TransportError),
}

impl LoopExit {
    /// Map to the top-level error taxonomy
    pub fn into_result(self) -> Result<(), DashError> {
        match self {
            LoopExit::Shutdown => Ok(()),
            LoopExit::TransportLost(e) => Err(DashError::TransportLost(e)),
        }
    }
}

/// Counters kept for the exit log line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub reads: u64,
    pub rendered: u64,
    pub dropped: u64,
}

/// Render loop state: the panels and the poll cadence
pub struct Dashboard {
    session: RenderSession,
    poll_interval: Duration,
    stats: LoopStats,
}

impl Dashboard {
    pub fn new(session: RenderSession, poll_interval: Duration) -> Self {
        Self { session, poll_interval, stats: LoopStats::default() }
    }

    pub fn session(&self) -> &RenderSession {
        &self.session
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Decode one raw record and render it.
    ///
    /// Returns `Ok(false)` when the record was malformed and dropped.
    pub fn apply<D: Display + ?Sized>(&mut self, raw: &[u8], display: &mut D) -> Result<bool, DisplayError> {
        match Sample::parse(raw) {
            Ok(sample) => {
                self.session.render(&sample, display)?;
                self.stats.rendered += 1;
                Ok(true)
            }
            Err(e) => {
                self.stats.dropped += 1;
                debug!("Dropping malformed sample {:?}: {}", String::from_utf8_lossy(raw), e);
                Ok(false)
            }
        }
    }

    async fn drive<L, D>(
        &mut self,
        handle: &mut ConnectionHandle<L>,
        display: &mut D,
    ) -> Result<LoopExit, DisplayError>
    where
        L: Link,
        D: Display + ?Sized,
    {
        self.session.draw_static(display)?;
        info!("Dashboard running (poll every {:?})", self.poll_interval);

        loop {
            let raw = match handle.read().await {
                Ok(raw) => raw,
                Err(e) => return Ok(LoopExit::TransportLost(e)),
            };
            self.stats.reads += 1;

            self.apply(&raw, display)?;
            sleep(self.poll_interval).await;
        }
    }

    /// Run until the link is lost or `shutdown` fires, then release the link.
    ///
    /// Display failures are returned as errors; the link is still released.
    pub async fn run<L, D>(
        &mut self,
        mut handle: ConnectionHandle<L>,
        display: &mut D,
        shutdown: CancellationToken,
    ) -> Result<LoopExit, DashError>
    where
        L: Link,
        D: Display + ?Sized,
    {
        let outcome = tokio::select! {
            biased;
            _ = shutdown.cancelled() => Ok(LoopExit::Shutdown),
            result = self.drive(&mut handle, display) => result,
        };

        handle.release().await;

        let stats = self.stats;
        match &outcome {
            Ok(LoopExit::Shutdown) => info!("Dashboard stopped"),
            Ok(LoopExit::TransportLost(e)) => warn!("Link lost: {}", e),
            Err(e) => warn!("Display failed: {}", e),
        }
        info!(
            "  Reads: {}, rendered: {}, dropped: {}",
            stats.reads, stats.rendered, stats.dropped
        );

        outcome.map_err(DashError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::MockDisplay;
    use crate::link::MockLink;
    use crate::panel::{Side, MIN_COLS, MIN_ROWS};

    fn dashboard(display: &MockDisplay) -> Dashboard {
        let session = RenderSession::for_display(display).unwrap();
        Dashboard::new(session, Duration::from_millis(15))
    }

    fn ok(payload: &str) -> Result<Vec<u8>, TransportError> {
        Ok(payload.as_bytes().to_vec())
    }

    #[test]
    fn test_malformed_sample_keeps_panel_state() {
        let mut display = MockDisplay::new(MIN_COLS, MIN_ROWS);
        let mut dash = dashboard(&display);

        assert!(dash.apply(b"100,200,300,400,1", &mut display).unwrap());
        let left = *dash.session().panel(Side::Left).state();
        let right = *dash.session().panel(Side::Right).state();
        display.take_ops();

        assert!(!dash.apply(b"1,2,3", &mut display).unwrap());
        assert!(!dash.apply(b"abc,1,2,3,0", &mut display).unwrap());
        assert!(!dash.apply(b"1,2,3,5000,0", &mut display).unwrap());

        assert_eq!(*dash.session().panel(Side::Left).state(), left);
        assert_eq!(*dash.session().panel(Side::Right).state(), right);
        assert!(display.ops().is_empty());
        assert_eq!(dash.stats().dropped, 3);
        assert_eq!(dash.stats().rendered, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_survives_malformed_and_exits_on_loss() {
        let mut display = MockDisplay::new(MIN_COLS, MIN_ROWS);
        let mut dash = dashboard(&display);

        let link = MockLink::new(vec![
            ok("0,0,4095,4095,1"),
            ok("1,2,3"),
            ok("abc,1,2,3,0"),
            ok("4095,4095,0,0,0"),
        ]);
        let counters = link.counters();

        let exit = dash
            .run(ConnectionHandle::new(link), &mut display, CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(exit, LoopExit::TransportLost(_)));
        assert!(matches!(exit.into_result(), Err(DashError::TransportLost(_))));
        assert_eq!(dash.stats(), LoopStats { reads: 4, rendered: 2, dropped: 2 });
        assert_eq!(counters.reads(), 5);
        assert_eq!(counters.disconnects(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_interval_spaces_reads() {
        let mut display = MockDisplay::new(MIN_COLS, MIN_ROWS);
        let mut dash = dashboard(&display);
        let link = MockLink::new((0..10).map(|_| ok("1,1,1,1,0")).collect());

        let start = tokio::time::Instant::now();
        dash.run(ConnectionHandle::new(link), &mut display, CancellationToken::new())
            .await
            .unwrap();

        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_releases_link() {
        let mut display = MockDisplay::new(MIN_COLS, MIN_ROWS);
        let mut dash = dashboard(&display);
        let link = MockLink::new((0..1000).map(|_| ok("2048,2048,2048,2048,1")).collect());
        let counters = link.counters();

        let shutdown = CancellationToken::new();
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let exit = dash
            .run(ConnectionHandle::new(link), &mut display, shutdown)
            .await
            .unwrap();

        assert!(matches!(exit, LoopExit::Shutdown));
        assert!(counters.reads() < 1000);
        assert_eq!(counters.disconnects(), 1);
    }

    #[tokio::test]
    async fn test_display_failure_still_releases_link() {
        // Too small for the panels: the static framing fails
        let mut small = MockDisplay::new(20, 10);
        let layout_display = MockDisplay::new(MIN_COLS, MIN_ROWS);
        let mut dash = dashboard(&layout_display);
        let link = MockLink::new(vec![ok("1,1,1,1,0")]);
        let counters = link.counters();

        let result = dash
            .run(ConnectionHandle::new(link), &mut small, CancellationToken::new())
            .await;

        assert!(matches!(result, Err(DashError::Display(_))));
        assert_eq!(counters.disconnects(), 1);
    }
}
