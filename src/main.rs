//! Joystick Dashboard - Main Application
//!
//! Finds the board, takes over the terminal and renders both sticks until
//! the link drops or the user quits (`q`, `Esc`, `Ctrl+C`).

use anyhow::Context;
use joydash_rs::acquire::{acquire, show_not_found, SearchScreen};
use joydash_rs::config::{DashboardConfig, DEFAULT_CONFIG_FILE};
use joydash_rs::display::terminal::{read_key_blocking, wait_for_key, watch_input, TerminalDisplay};
use joydash_rs::link::BtleTransport;
use joydash_rs::{Dashboard, DashError, RenderSession};
use log::{info, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn init_logging(config: &DashboardConfig) {
    // The terminal belongs to the dashboard, so logs go to a file. Without
    // one, logging is discarded rather than drawn over the panels.
    let (sink, file_error) = config.open_log_sink();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(sink))
        .init();

    if let Some(e) = file_error {
        eprintln!("Logging disabled: cannot create {}: {}", config.log_file.display(), e);
    }
}

/// Cancel `shutdown` on SIGINT/SIGTERM
fn watch_signals(shutdown: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut terminate = match signal(SignalKind::terminate()) {
                Ok(terminate) => terminate,
                Err(e) => {
                    warn!("SIGTERM handler unavailable: {}", e);
                    let _ = tokio::signal::ctrl_c().await;
                    shutdown.cancel();
                    return;
                }
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }

        #[cfg(not(unix))]
        let _ = tokio::signal::ctrl_c().await;

        info!("Termination signal received");
        shutdown.cancel();
    });
}

async fn run(
    config: &DashboardConfig,
    transport: &BtleTransport,
    display: &mut TerminalDisplay,
    keys: &mut mpsc::Receiver<crossterm::event::KeyEvent>,
    shutdown: CancellationToken,
) -> Result<(), DashError> {
    // Fail on a too-small terminal before touching the radio
    let session = RenderSession::for_display(&*display)?;

    let policy = config.acquire_policy();
    let acquired = {
        let mut screen = SearchScreen::new(&mut *display);
        acquire(transport, &config.device_name, &policy, &mut screen, &shutdown).await
    };

    let handle = match acquired {
        Ok(handle) => handle,
        Err(DashError::Cancelled) => return Ok(()),
        Err(e @ DashError::AcquisitionTimeout { .. }) => {
            show_not_found(display, &config.device_name)?;
            while keys.try_recv().is_ok() {}
            wait_for_key(keys, &shutdown, read_key_blocking).await;
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    let mut dashboard = Dashboard::new(session, config.poll_interval());
    dashboard.run(handle, display, shutdown).await?.into_result()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = DashboardConfig::load_or_default(DEFAULT_CONFIG_FILE)
        .with_context(|| format!("Invalid {}", DEFAULT_CONFIG_FILE))?;
    init_logging(&config);
    info!("=== Joystick Dashboard ===");
    info!("Device: {}", config.device_name);

    let shutdown = CancellationToken::new();
    watch_signals(shutdown.clone());

    let transport = BtleTransport::new(config.characteristic_uuid)
        .await
        .context("Failed to open Bluetooth adapter")?;

    let mut display = TerminalDisplay::enter().context("Failed to set up terminal")?;
    let (input_task, mut keys) = watch_input(shutdown.clone());

    let outcome = run(&config, &transport, &mut display, &mut keys, shutdown.clone()).await;

    shutdown.cancel();
    let _ = input_task.await;
    display.restore().context("Failed to restore terminal")?;

    outcome?;
    info!("Bye");
    Ok(())
}
