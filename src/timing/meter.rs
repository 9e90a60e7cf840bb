// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Time signature parsing and beats-per-measure derivation.
//!
//! Beats are counted as pulses: simple meters pulse on every numerator unit,
//! compound eighth-note meters (6/8, 9/8, 12/8, 15/8) pulse on every dotted
//! quarter, so 6/8 has two beats per measure.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Time signatures a block may use
pub const WHITELIST: [&str; 17] = [
    "4/4", "3/4", "6/8", "2/4", "5/4", "7/8", "12/8", "9/8", "11/8", "15/8", "13/8", "10/4",
    "8/8", "14/8", "16/8", "7/4", "6/4",
];

/// Labels whose pulse count is fixed regardless of the simple/compound rule
const OVERRIDES: [(&str, u32); 1] = [("6/4", 6)];

/// Meter errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeterError {
    /// Label is malformed or not whitelisted
    #[error("Invalid time signature: {0}")]
    InvalidTimeSignature(String),
}

/// A parsed "N/D" time signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeSignature {
    /// Numerator (units per measure)
    pub numerator: u32,
    /// Denominator (unit note value)
    pub denominator: u32,
}

impl TimeSignature {
    /// Create a time signature without whitelist checks
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self { numerator, denominator }
    }

    /// Whether this is a compound eighth-note meter
    pub fn is_compound(&self) -> bool {
        self.denominator == 8 && self.numerator % 3 == 0
    }

    /// Pulses per measure for this signature
    pub fn beats_per_measure(&self) -> u32 {
        let label = self.to_string();
        if let Some((_, beats)) = OVERRIDES.iter().find(|(l, _)| *l == label) {
            return *beats;
        }
        if self.is_compound() {
            self.numerator / 3
        } else {
            self.numerator
        }
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for TimeSignature {
    type Err = MeterError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        if !is_supported(label) {
            return Err(MeterError::InvalidTimeSignature(label.to_string()));
        }
        let invalid = || MeterError::InvalidTimeSignature(label.to_string());
        let (num, denom) = label.split_once('/').ok_or_else(invalid)?;
        let numerator = num.parse::<u32>().map_err(|_| invalid())?;
        let denominator = denom.parse::<u32>().map_err(|_| invalid())?;
        Ok(Self::new(numerator, denominator))
    }
}

/// Check whether a label is in the whitelist
pub fn is_supported(label: &str) -> bool {
    WHITELIST.contains(&label)
}

/// Beats per measure for a whitelisted time signature label
pub fn beats_per_measure(label: &str) -> Result<u32, MeterError> {
    label.parse::<TimeSignature>().map(|ts| ts.beats_per_measure())
}
