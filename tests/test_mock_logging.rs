//! Test to verify the mocks log their activity

use joydash_rs::acquire::{acquire, AcquirePolicy, SearchScreen};
use joydash_rs::display::{Display, MockDisplay, Style};
use joydash_rs::link::mock::{DiscoveryStep, MockTransport};
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn test_mock_transport_logs() {
    // Initialize a simple logger for testing
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();

    let transport = MockTransport::new(vec![
        DiscoveryStep::NotFound,
        DiscoveryStep::Fail("adapter busy".into()),
        DiscoveryStep::Found,
    ]);
    let mut display = MockDisplay::new(80, 24);

    // These should log at info/debug level (visible with RUST_LOG=debug)
    let mut screen = SearchScreen::new(&mut display);
    let shutdown = CancellationToken::new();
    let handle = acquire(&transport, "BLE-Arseni", &AcquirePolicy::default(), &mut screen, &shutdown).await;
    assert!(handle.is_ok());

    let mut handle = handle.unwrap();
    handle.release().await;
    assert_eq!(transport.counters().disconnects(), 1);
}

#[test]
fn test_mock_display_logs() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();

    let mut display = MockDisplay::new(20, 4);
    assert!(display.put_str(1, 1, "X :", Style::Primary).is_ok());
    assert!(display.flush().is_ok());
    assert!(display.put_str(9, 1, "off screen", Style::Plain).is_err());
}
