//! Top-level error taxonomy
//!
//! Per-attempt and per-sample failures are absorbed inside their loops; only
//! the variants below ever leave the library.

use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;
use crate::display::DisplayError;
use crate::link::TransportError;

#[derive(Debug, Error)]
pub enum DashError {
    #[error("Device {device} not found within {waited:?}")]
    AcquisitionTimeout { device: String, waited: Duration },

    #[error("Search cancelled")]
    Cancelled,

    #[error("Transport lost: {0}")]
    TransportLost(#[source] TransportError),

    #[error(transparent)]
    Display(#[from] DisplayError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
