//! Trace sinks: waveform dumps keyed by simulated time.
//!
//! [`VcdTrace`] writes IEEE 1364 Value Change Dump text. The variable
//! definitions are taken from the first [`TraceSink::dump`] call; after that
//! only changed values are written. [`TextTrace`] is the plain-text log file,
//! which is kept open and flushed alongside the waveform but receives no
//! samples.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::dut::Probe;
use crate::error::SimError;
use crate::time::TickTime;

/// Receives signal samples from the scheduler.
pub trait TraceSink {
    /// Records the probe values at `time`.
    fn dump(&mut self, time: TickTime, probes: &[Probe]) -> Result<(), SimError>;

    /// Pushes buffered output to the underlying file.
    fn flush(&mut self) -> Result<(), SimError>;

    /// Finishes the trace. Further calls are no-ops.
    fn close(&mut self) -> Result<(), SimError>;
}

impl<T: TraceSink + ?Sized> TraceSink for Box<T> {
    fn dump(&mut self, time: TickTime, probes: &[Probe]) -> Result<(), SimError> {
        (**self).dump(time, probes)
    }

    fn flush(&mut self) -> Result<(), SimError> {
        (**self).flush()
    }

    fn close(&mut self) -> Result<(), SimError> {
        (**self).close()
    }
}

/// Creates `path`'s parent directory and opens the file for buffered writing.
fn create_file(path: &Path) -> Result<BufWriter<File>, SimError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(BufWriter::new(File::create(path)?))
}

struct VcdVar {
    name: &'static str,
    width: u32,
    id_code: String,
    last: u64,
}

/// Value Change Dump writer.
///
/// Identifier codes are printable ASCII starting at `!`; the timescale is
/// 1 ns so one tick spans 10 time units.
pub struct VcdTrace<W: Write> {
    writer: W,
    scope: String,
    vars: Vec<VcdVar>,
    header_written: bool,
    closed: bool,
}

impl VcdTrace<BufWriter<File>> {
    /// Opens a VCD file at `path`, creating its directory if needed.
    pub fn create(path: &Path) -> Result<Self, SimError> {
        Ok(Self::new(create_file(path)?, "tb"))
    }
}

impl<W: Write> VcdTrace<W> {
    /// Creates a writer that places all probes in module scope `scope`.
    pub fn new(writer: W, scope: impl Into<String>) -> Self {
        Self {
            writer,
            scope: scope.into(),
            vars: Vec::new(),
            header_written: false,
            closed: false,
        }
    }

    /// Consumes the trace and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Generates a VCD identifier code from a sequential index.
    fn make_id_code(index: usize) -> String {
        let mut result = String::new();
        let mut idx = index;
        loop {
            result.push(char::from(b'!' + (idx % 94) as u8));
            idx /= 94;
            if idx == 0 {
                break;
            }
            idx -= 1;
        }
        result
    }

    fn write_value(&mut self, index: usize) -> Result<(), SimError> {
        let var = &self.vars[index];
        if var.width == 1 {
            writeln!(self.writer, "{}{}", var.last & 1, var.id_code)?;
        } else {
            writeln!(self.writer, "b{:b} {}", var.last, var.id_code)?;
        }
        Ok(())
    }

    fn write_header(&mut self, time: u64, probes: &[Probe]) -> Result<(), SimError> {
        writeln!(self.writer, "$version")?;
        writeln!(self.writer, "  cosim {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$timescale")?;
        writeln!(self.writer, "  1ns")?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$scope module {} $end", self.scope)?;
        for (i, probe) in probes.iter().enumerate() {
            let id_code = Self::make_id_code(i);
            writeln!(
                self.writer,
                "$var wire {} {} {} $end",
                probe.width, id_code, probe.name
            )?;
            self.vars.push(VcdVar {
                name: probe.name,
                width: probe.width,
                id_code,
                last: probe.value,
            });
        }
        writeln!(self.writer, "$upscope $end")?;
        writeln!(self.writer, "$enddefinitions $end")?;
        self.header_written = true;

        writeln!(self.writer, "#{time}")?;
        writeln!(self.writer, "$dumpvars")?;
        for i in 0..self.vars.len() {
            self.write_value(i)?;
        }
        writeln!(self.writer, "$end")?;
        Ok(())
    }

    fn check_layout(&self, probes: &[Probe]) -> Result<(), SimError> {
        if probes.len() != self.vars.len() {
            return Err(SimError::TraceLayout {
                reason: format!(
                    "{} probes declared, {} dumped",
                    self.vars.len(),
                    probes.len()
                ),
            });
        }
        for (i, (var, probe)) in self.vars.iter().zip(probes).enumerate() {
            if var.name != probe.name || var.width != probe.width {
                return Err(SimError::TraceLayout {
                    reason: format!(
                        "probe {i} declared as {}[{}], dumped as {}[{}]",
                        var.name, var.width, probe.name, probe.width
                    ),
                });
            }
        }
        Ok(())
    }
}

impl<W: Write> TraceSink for VcdTrace<W> {
    fn dump(&mut self, time: TickTime, probes: &[Probe]) -> Result<(), SimError> {
        if self.closed {
            return Ok(());
        }
        let t = time.trace_timestamp();
        if !self.header_written {
            return self.write_header(t, probes);
        }
        self.check_layout(probes)?;

        let mut stamped = false;
        for (i, probe) in probes.iter().enumerate() {
            if self.vars[i].last == probe.value {
                continue;
            }
            if !stamped {
                writeln!(self.writer, "#{t}")?;
                stamped = true;
            }
            self.vars[i].last = probe.value;
            self.write_value(i)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SimError> {
        self.writer.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SimError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if !self.header_written {
            // No samples recorded: still leave a well-formed file.
            self.write_header(0, &[])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// The plain-text trace log.
pub struct TextTrace<W: Write> {
    writer: W,
    closed: bool,
}

impl TextTrace<BufWriter<File>> {
    /// Opens the log at `path`, creating its directory if needed.
    pub fn create(path: &Path) -> Result<Self, SimError> {
        Ok(Self::new(create_file(path)?))
    }
}

impl<W: Write> TextTrace<W> {
    /// Wraps an open writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            closed: false,
        }
    }
}

impl<W: Write> TraceSink for TextTrace<W> {
    fn dump(&mut self, _time: TickTime, _probes: &[Probe]) -> Result<(), SimError> {
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SimError> {
        if !self.closed {
            self.writer.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), SimError> {
        if !self.closed {
            self.closed = true;
            self.writer.flush()?;
        }
        Ok(())
    }
}
