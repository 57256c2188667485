//! End-to-end flow: acquisition through the mock link, then the render loop
//! drawing into the recording display

use joydash_rs::acquire::{acquire, AcquirePolicy, NoProgress};
use joydash_rs::display::{DrawOp, MockDisplay, Style};
use joydash_rs::link::mock::MockTransport;
use joydash_rs::link::TransportError;
use joydash_rs::panel::{MIN_COLS, MIN_ROWS};
use joydash_rs::{Dashboard, LoopExit, RenderSession, ScreenPoint, Side};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn payload(text: &str) -> Result<Vec<u8>, TransportError> {
    Ok(text.as_bytes().to_vec())
}

/// Dot and blank writes, in order, as (row, col, glyph, style)
fn dot_writes(display: &MockDisplay) -> Vec<(u16, u16, String, Style)> {
    display
        .ops()
        .iter()
        .filter_map(|op| match op {
            DrawOp::Text { row, col, text, style } if text == "◉" || text == " " => {
                Some((*row, *col, text.clone(), *style))
            }
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_full_corner_to_corner_sweep() {
    let transport = MockTransport::found_on_attempt(2).with_payloads(vec![
        payload("0,0,4095,4095,1"),
        payload("4095,4095,0,0,0"),
    ]);
    let counters = transport.counters();

    let shutdown = CancellationToken::new();
    let handle = acquire(&transport, "BLE-Arseni", &AcquirePolicy::default(), &mut NoProgress, &shutdown)
        .await
        .expect("device should be acquired on the second attempt");
    assert_eq!(counters.connects(), 1);

    let mut display = MockDisplay::new(MIN_COLS, MIN_ROWS);
    let session = RenderSession::for_display(&display).unwrap();
    let mut dashboard = Dashboard::new(session, Duration::from_millis(15));

    let exit = dashboard
        .run(handle, &mut display, shutdown)
        .await
        .unwrap();
    assert!(matches!(exit, LoopExit::TransportLost(_)));
    assert_eq!(counters.disconnects(), 1);
    assert_eq!(counters.open(), 0);

    let writes = dot_writes(&display);
    assert_eq!(writes.len(), 6, "unexpected dot writes: {:?}", writes);

    // Frame 1: two dots, nothing erased
    let (l1_row, l1_col, ref glyph, style) = writes[0];
    assert_eq!((glyph.as_str(), style), ("◉", Style::Primary));
    let (r1_row, r1_col, ref glyph, style) = writes[1];
    assert_eq!((glyph.as_str(), style), ("◉", Style::Secondary));

    // Frame 2: each panel erases exactly its previous cell, then redraws
    assert_eq!(writes[2], (l1_row, l1_col, " ".to_string(), Style::Plain));
    let (l2_row, l2_col, ref glyph, style) = writes[3];
    assert_eq!((glyph.as_str(), style), ("◉", Style::Idle));
    assert_eq!(writes[4], (r1_row, r1_col, " ".to_string(), Style::Plain));
    let (r2_row, r2_col, ref glyph, style) = writes[5];
    assert_eq!((glyph.as_str(), style), ("◉", Style::Secondary));

    // Left: max column, top row -> min column, bottom row
    assert_eq!(l1_col - l2_col, 34);
    assert_eq!(l2_row - l1_row, 18);
    // Right moves the opposite way
    assert_eq!(r2_col - r1_col, 34);
    assert_eq!(r1_row - r2_row, 18);

    let left = dashboard.session().panel(Side::Left).state();
    assert_eq!(left.last_point, Some(ScreenPoint { column: 1, row: 18 }));
    assert!(!left.last_switch);
    let right = dashboard.session().panel(Side::Right).state();
    assert_eq!(right.last_point, Some(ScreenPoint { column: 35, row: 0 }));

    assert_eq!(display.cell(l1_row, l1_col).0, ' ');
    assert_eq!(display.cell(l2_row, l2_col), ('◉', Style::Idle));
}

#[tokio::test(start_paused = true)]
async fn test_garbled_reads_do_not_stop_the_loop() {
    let transport = MockTransport::found_on_attempt(1).with_payloads(vec![
        payload("2048,2048,2048,2048,1"),
        payload("1,2,3"),
        payload("abc,1,2,3,0"),
        Ok(vec![0xff, 0x00]),
        payload("2048,2048,2048,2048,1"),
    ]);
    let counters = transport.counters();

    let shutdown = CancellationToken::new();
    let handle = acquire(&transport, "BLE-Arseni", &AcquirePolicy::default(), &mut NoProgress, &shutdown)
        .await
        .unwrap();

    let mut display = MockDisplay::new(MIN_COLS, MIN_ROWS);
    let mut dashboard = Dashboard::new(
        RenderSession::for_display(&display).unwrap(),
        Duration::from_millis(15),
    );
    dashboard.run(handle, &mut display, shutdown).await.unwrap();

    let stats = dashboard.stats();
    assert_eq!(stats.rendered, 2);
    assert_eq!(stats.dropped, 3);
    // Same point twice: nothing ever erased
    assert!(dot_writes(&display).iter().all(|(_, _, glyph, _)| glyph == "◉"));
    assert_eq!(counters.disconnects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_acquisition_timeout_never_connects() {
    let transport = MockTransport::never_found();
    let policy = AcquirePolicy {
        max_wait: Duration::from_secs(1),
        ..AcquirePolicy::default()
    };

    let result = acquire(&transport, "BLE-Arseni", &policy, &mut NoProgress, &CancellationToken::new()).await;

    match result {
        Err(joydash_rs::DashError::AcquisitionTimeout { device, waited }) => {
            assert_eq!(device, "BLE-Arseni");
            assert!(waited >= Duration::from_secs(1));
            assert!(waited < Duration::from_millis(1_500));
        }
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("device should not be found"),
    }
    assert_eq!(transport.counters().connects(), 0);
}
