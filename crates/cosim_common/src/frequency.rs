//! Clock frequency values with unit parsing and display.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unit suffixes, largest first.
const UNITS: [(&str, f64); 4] = [
    ("GHz", 1_000_000_000.0),
    ("MHz", 1_000_000.0),
    ("KHz", 1_000.0),
    ("Hz", 1.0),
];

/// The simulated clock rate, stored in Hertz.
///
/// Parsed from `clock.frequency` strings such as `"50MHz"` or `"25000000"`
/// and used to convert a baud rate into a tick period.
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frequency(f64);

impl Frequency {
    /// The tick rate the simulated SoC is designed for.
    pub const DESIGN_CLOCK: Frequency = Frequency(50_000_000.0);

    /// Creates a frequency from a value in Hertz.
    pub fn new(hz: f64) -> Self {
        Self(hz)
    }

    /// The frequency in Hertz.
    pub fn hz(&self) -> f64 {
        self.0
    }

    /// Returns how many whole clock cycles fit in one period of `rate_hz`,
    /// rounded to the nearest cycle.
    ///
    /// Returns `None` for a zero rate or a non-positive clock.
    pub fn cycles_per(&self, rate_hz: u32) -> Option<u64> {
        if rate_hz == 0 || self.0.is_nan() || self.0 <= 0.0 {
            return None;
        }
        let cycles = (self.0 / f64::from(rate_hz)).round();
        if cycles < 1.0 || cycles > u64::MAX as f64 {
            return None;
        }
        Some(cycles as u64)
    }
}

impl Default for Frequency {
    fn default() -> Self {
        Self::DESIGN_CLOCK
    }
}

impl fmt::Debug for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frequency({self})")
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (unit, scale) = UNITS
            .iter()
            .copied()
            .find(|&(_, scale)| self.0 >= scale)
            .unwrap_or(("Hz", 1.0));
        write!(f, "{}{unit}", self.0 / scale)
    }
}

/// A `clock.frequency` string that is not a positive number with an
/// optional unit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid frequency: '{input}'")]
pub struct ParseFrequencyError {
    /// The rejected text.
    pub input: String,
}

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseFrequencyError {
            input: s.to_string(),
        };

        let lower = s.to_ascii_lowercase();
        let (num, scale) = UNITS
            .iter()
            .find_map(|&(unit, scale)| {
                lower
                    .strip_suffix(unit.to_ascii_lowercase().as_str())
                    .map(|num| (num, scale))
            })
            .unwrap_or((lower.as_str(), 1.0));

        let val: f64 = num.trim().parse().map_err(|_| err())?;
        if !val.is_finite() || val <= 0.0 {
            return Err(err());
        }
        Ok(Frequency(val * scale))
    }
}
