//! Serial bit-time expressed in simulation ticks.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::frequency::Frequency;

/// Number of simulation ticks that make up one serial bit-time.
///
/// The SoC's baud register is 24 bits wide, so valid periods are
/// `1..=0xFF_FFFF`. A `BaudPeriod` can only be built through [`BaudPeriod::new`]
/// or [`BaudPeriod::from_rate`], both of which enforce that range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct BaudPeriod(u32);

/// Error returned when a baud period falls outside the supported range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("baud period {ticks} is outside 1..={max}", max = BaudPeriod::MAX)]
pub struct InvalidBaudPeriod {
    /// The rejected tick count.
    pub ticks: u64,
}

impl BaudPeriod {
    /// Largest period the 24-bit baud register can hold.
    pub const MAX: u32 = 0x00FF_FFFF;

    /// 440 ticks per bit: the SoC's "115200 bps" setting at 50 MHz.
    pub const DEFAULT: BaudPeriod = BaudPeriod(0x1B8);

    /// Creates a period of `ticks` simulation ticks per bit.
    pub fn new(ticks: u32) -> Result<Self, InvalidBaudPeriod> {
        if ticks == 0 || ticks > Self::MAX {
            return Err(InvalidBaudPeriod {
                ticks: u64::from(ticks),
            });
        }
        Ok(Self(ticks))
    }

    /// Derives the period for `baud_rate` bits per second at `clock`.
    pub fn from_rate(clock: Frequency, baud_rate: u32) -> Result<Self, InvalidBaudPeriod> {
        let ticks = clock
            .cycles_per(baud_rate)
            .ok_or(InvalidBaudPeriod { ticks: 0 })?;
        let ticks = u32::try_from(ticks).map_err(|_| InvalidBaudPeriod { ticks })?;
        Self::new(ticks)
    }

    /// Returns the tick count.
    pub fn ticks(self) -> u32 {
        self.0
    }

    /// Bits per second this period yields at `clock`.
    pub fn bit_rate(self, clock: Frequency) -> f64 {
        clock.hz() / f64::from(self.0)
    }

    /// Ticks from a start edge to the middle of the first data bit.
    pub fn first_sample_delay(self) -> u32 {
        self.0 + self.0 / 2
    }
}

impl Default for BaudPeriod {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for BaudPeriod {
    type Error = InvalidBaudPeriod;

    fn try_from(ticks: u32) -> Result<Self, Self::Error> {
        Self::new(ticks)
    }
}

impl From<BaudPeriod> for u32 {
    fn from(period: BaudPeriod) -> u32 {
        period.0
    }
}

impl fmt::Display for BaudPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ticks/bit", self.0)
    }
}
