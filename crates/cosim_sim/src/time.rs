//! Simulated clock time: tick index plus edge phase.
//!
//! One tick is a full clock period made of a rising-edge evaluation followed
//! by a falling-edge evaluation. Trace timestamps place the rising edge of
//! tick `n` at `n * 10` and its falling edge at `n * 10 + 5`, i.e. a 10 ns
//! period on a 1 ns timescale.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trace time units per tick.
pub const TRACE_UNITS_PER_TICK: u64 = 10;

/// Trace time offset of the falling edge within a tick.
pub const FALLING_EDGE_OFFSET: u64 = TRACE_UNITS_PER_TICK / 2;

/// Which half of a tick is being evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Clock input driven to 1.
    Rising,
    /// Clock input driven to 0.
    Falling,
}

impl Phase {
    /// The clock input level during this phase.
    pub fn clock_level(self) -> bool {
        matches!(self, Phase::Rising)
    }
}

/// A point in simulated time.
///
/// Ordered by tick, then by phase (rising before falling).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TickTime {
    /// Full clock periods elapsed.
    pub tick: u64,
    /// Active half of the current period.
    pub phase: Phase,
}

impl TickTime {
    /// The rising edge of `tick`.
    pub fn rising(tick: u64) -> Self {
        Self {
            tick,
            phase: Phase::Rising,
        }
    }

    /// The falling edge of `tick`.
    pub fn falling(tick: u64) -> Self {
        Self {
            tick,
            phase: Phase::Falling,
        }
    }

    /// The next edge after this one.
    pub fn next_edge(self) -> Self {
        match self.phase {
            Phase::Rising => Self::falling(self.tick),
            Phase::Falling => Self::rising(self.tick + 1),
        }
    }

    /// Timestamp handed to the trace sink for this edge.
    pub fn trace_timestamp(self) -> u64 {
        let base = self.tick * TRACE_UNITS_PER_TICK;
        match self.phase {
            Phase::Rising => base,
            Phase::Falling => base + FALLING_EDGE_OFFSET,
        }
    }
}

impl Default for TickTime {
    fn default() -> Self {
        Self::rising(0)
    }
}

impl Ord for TickTime {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.trace_timestamp().cmp(&other.trace_timestamp())
    }
}

impl PartialOrd for TickTime {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TickTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let edge = match self.phase {
            Phase::Rising => "rising",
            Phase::Falling => "falling",
        };
        write!(f, "tick {} ({edge})", self.tick)
    }
}
