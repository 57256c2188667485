//! Telemetry sample decoding
//!
//! The board answers every characteristic read with a single ASCII record
//! `x1,y1,x2,y2,sw1`. This module turns that record into a [`Sample`] or a
//! [`SampleError`] describing why it was rejected. A sample is never partially
//! filled: either all five fields are valid or nothing is produced.

use thiserror::Error;

use crate::telemetry::constants::{AXIS_MAX, SAMPLE_FIELDS};

/// Reasons a raw telemetry record is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampleError {
    #[error("payload is not valid ASCII/UTF-8")]
    Encoding,

    #[error("expected {expected} fields, found {found}", expected = SAMPLE_FIELDS)]
    FieldCount { found: usize },

    #[error("field {field} is not an integer: {value:?}")]
    NotInteger { field: &'static str, value: String },

    #[error("field {field} out of range 0..={max}: {value}", max = AXIS_MAX)]
    AxisOutOfRange { field: &'static str, value: i64 },

    #[error("switch must be 0 or 1, got {value}")]
    InvalidSwitch { value: i64 },
}

/// One decoded reading of both joysticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Left stick horizontal axis (raw ADC, 0..=4095)
    pub x1: u16,
    /// Left stick vertical axis
    pub y1: u16,
    /// Right stick horizontal axis
    pub x2: u16,
    /// Right stick vertical axis
    pub y2: u16,
    /// Left stick switch
    pub sw1: bool,
}

const FIELD_NAMES: [&str; SAMPLE_FIELDS] = ["x1", "y1", "x2", "y2", "sw1"];

impl Sample {
    /// Parse one raw record as read from the telemetry characteristic
    pub fn parse(raw: &[u8]) -> Result<Self, SampleError> {
        let text = std::str::from_utf8(raw).map_err(|_| SampleError::Encoding)?;
        Self::parse_str(text)
    }

    /// Parse one record already decoded as text
    pub fn parse_str(text: &str) -> Result<Self, SampleError> {
        let fields: Vec<&str> = text.trim().split(',').collect();
        if fields.len() != SAMPLE_FIELDS {
            return Err(SampleError::FieldCount { found: fields.len() });
        }

        let mut values = [0i64; SAMPLE_FIELDS];
        for (i, field) in fields.iter().enumerate() {
            values[i] = field.trim().parse::<i64>().map_err(|_| SampleError::NotInteger {
                field: FIELD_NAMES[i],
                value: field.to_string(),
            })?;
        }

        let axis = |i: usize| -> Result<u16, SampleError> {
            let value = values[i];
            if (0..=AXIS_MAX as i64).contains(&value) {
                Ok(value as u16)
            } else {
                Err(SampleError::AxisOutOfRange { field: FIELD_NAMES[i], value })
            }
        };

        let sw1 = match values[4] {
            0 => false,
            1 => true,
            value => return Err(SampleError::InvalidSwitch { value }),
        };

        Ok(Self {
            x1: axis(0)?,
            y1: axis(1)?,
            x2: axis(2)?,
            y2: axis(3)?,
            sw1,
        })
    }

    /// Axis pair for the left stick
    pub fn left(&self) -> (u16, u16) {
        (self.x1, self.y1)
    }

    /// Axis pair for the right stick
    pub fn right(&self) -> (u16, u16) {
        (self.x2, self.y2)
    }
}
