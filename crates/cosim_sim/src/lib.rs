//! Clock-accurate co-simulation driver with UART line emulation.
//!
//! This crate advances a simulated clock over a device-under-test model,
//! evaluating it on both edges of every tick, and attaches a bit-exact 8N1
//! serial line to the DUT's UART pins so firmware inside the simulated SoC
//! can exchange characters with the host console.
//!
//! # Architecture
//!
//! A [`ClockScheduler`] owns one run: the [`Dut`], a [`SerialLine`] bound to
//! a [`HostConsole`], any number of [`TraceSink`]s and one
//! [`DebugAdapter`]. The serial line is stepped once per full clock period
//! after the settle window; everything else is stepped per edge.
//!
//! # Usage
//!
//! ```ignore
//! use cosim_sim::{simulate, EchoSoc, RunConfig, StdConsole};
//!
//! let config = RunConfig::default();
//! let soc = EchoSoc::new(config.baud, "ready\r\n", 0x04);
//! let summary = simulate(soc, StdConsole::new(), &config)?;
//! eprintln!("{} ticks", summary.ticks);
//! ```
//!
//! # Modules
//!
//! - `error`: Simulation error types
//! - `time`: Tick index and edge phase
//! - `console`: Host console seam (stdin/stdout, in-memory)
//! - `serial`: Receive and transmit state machines
//! - `dut`: DUT pins, probes and the model trait
//! - `trace`: VCD and text trace sinks
//! - `debug`: Debug adapter seam
//! - `bitbang`: OpenOCD remote_bitbang server
//! - `echo`: Reference echo SoC model
//! - `scheduler`: The two-phase tick loop

#![warn(missing_docs)]

pub mod bitbang;
pub mod console;
pub mod debug;
pub mod dut;
pub mod echo;
pub mod error;
pub mod scheduler;
pub mod serial;
pub mod time;
pub mod trace;

use std::path::PathBuf;

use cosim_common::BaudPeriod;
use log::{info, warn};

pub use bitbang::RemoteBitbang;
pub use console::{BufferConsole, HostConsole, StdConsole};
pub use debug::{DebugAdapter, NoDebugAdapter};
pub use dut::{Dut, DutPins, Probe};
pub use echo::EchoSoc;
pub use error::SimError;
pub use scheduler::{ClockScheduler, ResetTiming, RunSummary};
pub use serial::{Receiver, RxState, SerialLine, Transmitter, TxState};
pub use time::{Phase, TickTime};
pub use trace::{TextTrace, TraceSink, VcdTrace};

/// Configuration for a simulation run.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Serial line bit period.
    pub baud: BaudPeriod,
    /// Reset and settle windows.
    pub timing: ResetTiming,
    /// VCD output file; no waveform when `None`.
    pub vcd_path: Option<PathBuf>,
    /// Plain-text trace log; not opened when `None`.
    pub text_trace_path: Option<PathBuf>,
    /// Local TCP port for the remote bitbang server; no debugger when `None`.
    pub debug_port: Option<u16>,
}

/// High-level entry point: runs `dut` against `console` until it finishes.
///
/// Binds the debug listener and opens the configured trace files, builds a
/// [`ClockScheduler`], and runs it to completion. Sinks opened before a
/// setup failure are closed before the error is returned.
pub fn simulate<D, C>(dut: D, console: C, config: &RunConfig) -> Result<RunSummary, SimError>
where
    D: Dut,
    C: HostConsole,
{
    let line = SerialLine::new(config.baud, console);
    let mut scheduler = ClockScheduler::new(dut, line, config.timing);

    if let Err(e) = attach(&mut scheduler, config) {
        if let Err(close_err) = scheduler.close_traces() {
            warn!("closing trace after setup failure: {close_err}");
        }
        return Err(e);
    }

    scheduler.run()
}

fn attach<D: Dut, C: HostConsole>(
    scheduler: &mut ClockScheduler<D, C>,
    config: &RunConfig,
) -> Result<(), SimError> {
    if let Some(port) = config.debug_port {
        scheduler.set_debug_adapter(Box::new(RemoteBitbang::bind(port)?));
    }
    if let Some(path) = &config.vcd_path {
        info!("writing waveform to {}", path.display());
        scheduler.add_trace(Box::new(VcdTrace::create(path)?));
    }
    if let Some(path) = &config.text_trace_path {
        scheduler.add_trace(Box::new(TextTrace::create(path)?));
    }
    Ok(())
}
