//! Joystick board protocol constants
//!
//! This module contains the constants needed to talk to the joystick board:
//! - Advertised device name
//! - BLE service and characteristic UUIDs
//! - Raw ADC domain
//! - Timing defaults for acquisition and polling

use uuid::Uuid;

// ============================================================================
// BLE Discovery Constants
// ============================================================================

/// Complete local name advertised by the board firmware
pub const DEVICE_NAME: &str = "BLE-Arseni";

// ============================================================================
// BLE Service & Characteristic UUIDs
// ============================================================================

/// Device Information service (0x180A) hosting the telemetry characteristic
pub const TELEMETRY_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000180a_0000_1000_8000_00805f9b34fb);

/// Telemetry characteristic (0x2A29, Manufacturer Name String, repurposed by the firmware).
/// Every READ returns one ASCII record `x1,y1,x2,y2,sw1`.
pub const TELEMETRY_CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x00002a29_0000_1000_8000_00805f9b34fb);

// ============================================================================
// Sample Domain
// ============================================================================

/// Largest raw value a 12-bit ADC channel can report
pub const AXIS_MAX: u16 = 4095;

/// Number of comma-separated fields in one telemetry record
pub const SAMPLE_FIELDS: usize = 5;

// ============================================================================
// Timing Constants
// ============================================================================

/// Total acquisition budget (milliseconds)
pub const MAX_WAIT_MS: u64 = 30_000;

/// Single discovery-by-name attempt (milliseconds)
pub const DISCOVERY_TIMEOUT_MS: u64 = 1_000;

/// Backoff between unsuccessful discovery attempts (milliseconds)
pub const RETRY_BACKOFF_MS: u64 = 300;

/// Upper bound on one connect + service discovery (milliseconds)
pub const CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Minimum spacing between telemetry reads (milliseconds)
pub const POLL_INTERVAL_MS: u64 = 15;
