//! Joydash-rs: live terminal dashboard for a dual-joystick BLE board
//!
//! This library finds the board over Bluetooth LE, polls its telemetry
//! characteristic and renders both sticks as tracking panels in the terminal.

pub mod acquire;
pub mod config;
pub mod dashboard;
pub mod display;
pub mod error;
pub mod link;
pub mod panel;
pub mod telemetry;

// Re-export commonly used items
pub use acquire::{acquire, AcquirePolicy, AcquireProgress, SearchScreen};
pub use config::DashboardConfig;
pub use dashboard::{Dashboard, LoopExit, LoopStats};
pub use display::{Display, MockDisplay, Style, TerminalDisplay};
pub use error::DashError;
pub use link::{ConnectionHandle, Link, Transport};
pub use panel::{RenderSession, ScreenPoint, Side};
pub use telemetry::{Sample, SampleError};
