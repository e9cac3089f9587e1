//! Two-phase clock scheduler.
//!
//! [`ClockScheduler`] owns simulated time and everything attached to the DUT
//! for one run. Each call to [`ClockScheduler::step`] executes one full clock
//! period in a fixed order:
//!
//! 1. drive reset (active low) from the tick index;
//! 2. drive the clock high, run the debug adapter, evaluate, dump;
//! 3. once the settle window has passed, exchange one bit with the serial
//!    line;
//! 4. drive the clock low, evaluate, dump, flush;
//! 5. advance the tick index.

use log::{debug, info, warn};
use serde::Serialize;

use crate::console::HostConsole;
use crate::debug::{DebugAdapter, NoDebugAdapter};
use crate::dut::{Dut, Probe};
use crate::error::SimError;
use crate::serial::SerialLine;
use crate::time::{TickTime, TRACE_UNITS_PER_TICK};
use crate::trace::TraceSink;

/// Reset and serial start-up windows, in ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResetTiming {
    /// Ticks `0..reset_ticks` hold the DUT in reset.
    pub reset_ticks: u64,
    /// Ticks `0..settle_ticks` skip the serial line exchange.
    pub settle_ticks: u64,
}

impl ResetTiming {
    /// Ten ticks of reset, serial line live from tick 2.
    pub const DEFAULT: Self = Self {
        reset_ticks: 10,
        settle_ticks: 2,
    };
}

impl Default for ResetTiming {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Outcome of a completed run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Full clock periods executed.
    pub ticks: u64,
    /// Bytes the DUT transmitted to the host.
    pub bytes_from_dut: u64,
    /// Host bytes sent to the DUT.
    pub bytes_to_dut: u64,
    /// Simulated time at the end of the run, in trace units (ns).
    pub end_time: u64,
    /// Serial line bit period used for the run.
    pub baud_period: u32,
}

/// Drives a [`Dut`] through alternating clock edges and services its UART.
pub struct ClockScheduler<D, C> {
    dut: D,
    line: SerialLine<C>,
    traces: Vec<Box<dyn TraceSink>>,
    debug: Box<dyn DebugAdapter>,
    timing: ResetTiming,
    time: TickTime,
    reset_released_at: Option<u64>,
    probe_buf: Vec<Probe>,
}

impl<D: Dut, C: HostConsole> ClockScheduler<D, C> {
    /// Creates a scheduler at tick 0 with no traces and no debugger.
    pub fn new(dut: D, line: SerialLine<C>, timing: ResetTiming) -> Self {
        Self {
            dut,
            line,
            traces: Vec::new(),
            debug: Box::new(NoDebugAdapter),
            timing,
            time: TickTime::default(),
            reset_released_at: None,
            probe_buf: Vec::new(),
        }
    }

    /// Attaches a trace sink. Every sink sees every dump and flush.
    pub fn add_trace(&mut self, sink: Box<dyn TraceSink>) {
        self.traces.push(sink);
    }

    /// Replaces the debug adapter.
    pub fn set_debug_adapter(&mut self, adapter: Box<dyn DebugAdapter>) {
        self.debug = adapter;
    }

    /// Index of the next tick to execute.
    pub fn tick(&self) -> u64 {
        self.time.tick
    }

    /// The next edge to evaluate. Between calls to [`step`](Self::step) this
    /// is always a rising edge.
    pub fn time(&self) -> TickTime {
        self.time
    }

    /// Tick on which reset was first driven inactive, if it has been.
    pub fn reset_released_at(&self) -> Option<u64> {
        self.reset_released_at
    }

    /// The model under test.
    pub fn dut(&self) -> &D {
        &self.dut
    }

    /// The serial line.
    pub fn line(&self) -> &SerialLine<C> {
        &self.line
    }

    /// Whether the tick about to run holds the DUT in reset.
    pub fn reset_asserted(&self) -> bool {
        self.time.tick < self.timing.reset_ticks
    }

    /// Consumes the scheduler, returning the model and the line.
    pub fn into_parts(self) -> (D, SerialLine<C>) {
        (self.dut, self.line)
    }

    fn dump(&mut self, time: TickTime) -> Result<(), SimError> {
        if self.traces.is_empty() {
            return Ok(());
        }
        self.probe_buf.clear();
        self.dut.probes(&mut self.probe_buf);
        for sink in &mut self.traces {
            sink.dump(time, &self.probe_buf)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SimError> {
        for sink in &mut self.traces {
            sink.flush()?;
        }
        Ok(())
    }

    /// Closes every trace sink, reporting the first failure.
    pub fn close_traces(&mut self) -> Result<(), SimError> {
        let mut first_err = None;
        for sink in &mut self.traces {
            if let Err(e) = sink.close() {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Executes one full clock period.
    pub fn step(&mut self) -> Result<(), SimError> {
        let rising = self.time;
        let tick = rising.tick;

        let in_reset = self.reset_asserted();
        if !in_reset && self.reset_released_at.is_none() {
            self.reset_released_at = Some(tick);
            info!("reset released at tick {tick}");
        }
        self.dut.pins_mut().n_rst_i = !in_reset;

        let pins = self.dut.pins_mut();
        pins.clk_i = rising.phase.clock_level();
        let tdo = pins.jtag_tdo;
        pins.jtag_trst_n = self.debug.tick(
            &mut pins.jtag_tck,
            &mut pins.jtag_tms,
            &mut pins.jtag_tdi,
            tdo,
        );
        self.dut.eval()?;
        self.dump(rising)?;

        if tick >= self.timing.settle_ticks {
            let txd = self.dut.pins().uart_txd;
            let rxd = self.line.step(txd);
            self.dut.pins_mut().uart_rxd = rxd;
        }

        let falling = rising.next_edge();
        self.time = falling;
        self.dut.pins_mut().clk_i = falling.phase.clock_level();
        self.dut.eval()?;
        self.dump(falling)?;
        self.flush()?;

        self.time = falling.next_edge();
        Ok(())
    }

    /// Runs until the DUT requests the end of simulation.
    ///
    /// Trace sinks are closed on every exit path.
    pub fn run(&mut self) -> Result<RunSummary, SimError> {
        debug!(
            "clock scheduler starting: reset {} ticks, settle {} ticks, baud period {}",
            self.timing.reset_ticks,
            self.timing.settle_ticks,
            self.line.baud()
        );
        while !self.dut.got_finish() {
            if let Err(e) = self.step() {
                if let Err(close_err) = self.close_traces() {
                    warn!("closing trace after failure: {close_err}");
                }
                return Err(e);
            }
        }
        self.close_traces()?;
        Ok(self.summary())
    }

    /// Statistics for the run so far.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            ticks: self.time.tick,
            bytes_from_dut: self.line.bytes_received(),
            bytes_to_dut: self.line.bytes_sent(),
            end_time: self.time.tick * TRACE_UNITS_PER_TICK,
            baud_period: self.line.baud().ticks(),
        }
    }
}
