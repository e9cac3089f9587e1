//! Simulation error types for the co-simulation driver.
//!
//! All errors that can occur during setup or while the tick loop runs are
//! represented as variants of [`SimError`]. Host console failures are not
//! errors at this level: the serial line logs them and keeps the clock going.
//! Bit periods are range-checked when a [`cosim_common::BaudPeriod`] is built,
//! so no run can start with an unusable one.

use std::io;

/// Errors that can occur during simulation setup or execution.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The DUT model failed to evaluate.
    #[error("evaluation error at tick {tick}: {reason}")]
    Eval {
        /// Tick index at which evaluation failed.
        tick: u64,
        /// Description of what went wrong during evaluation.
        reason: String,
    },

    /// An I/O error occurred while writing trace data.
    #[error("trace I/O error: {0}")]
    TraceIo(#[from] io::Error),

    /// The set of probed signals changed after the trace header was written.
    #[error("trace layout changed: {reason}")]
    TraceLayout {
        /// Description of the mismatch.
        reason: String,
    },

    /// The debug transport could not listen on its port.
    #[error("debug transport cannot listen on port {port}: {source}")]
    DebugBind {
        /// The requested TCP port.
        port: u16,
        /// The underlying socket error.
        source: io::Error,
    },
}

impl SimError {
    /// Shorthand for an evaluation failure.
    pub fn eval(tick: u64, reason: impl Into<String>) -> Self {
        Self::Eval {
            tick,
            reason: reason.into(),
        }
    }
}
