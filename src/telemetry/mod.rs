//! Joystick board telemetry
//!
//! This module covers the board side of the link:
//! - Protocol constants (name, UUIDs, ADC domain, timings)
//! - Sample decoding

pub mod constants;
pub mod sample;

// Re-export commonly used items
pub use constants::*;
pub use sample::*;
