//! The device-under-test seam.
//!
//! A DUT model exposes its top-level pins as plain fields in [`DutPins`]; the
//! scheduler writes inputs, calls [`Dut::eval`], and reads outputs back.

/// Top-level pins of the device under test.
///
/// Single-bit signals are modelled as `bool` with `true` meaning logic 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DutPins {
    /// Clock input.
    pub clk_i: bool,
    /// Active-low reset input.
    pub n_rst_i: bool,
    /// UART transmit output (DUT to host).
    pub uart_txd: bool,
    /// UART receive input (host to DUT).
    pub uart_rxd: bool,
    /// JTAG test clock input.
    pub jtag_tck: bool,
    /// JTAG mode select input.
    pub jtag_tms: bool,
    /// JTAG data input.
    pub jtag_tdi: bool,
    /// JTAG data output.
    pub jtag_tdo: bool,
    /// Active-low JTAG reset input.
    pub jtag_trst_n: bool,
}

impl Default for DutPins {
    /// Power-on state: clock low, reset asserted, UART lines idle high, JTAG
    /// out of reset.
    fn default() -> Self {
        Self {
            clk_i: false,
            n_rst_i: false,
            uart_txd: true,
            uart_rxd: true,
            jtag_tck: false,
            jtag_tms: false,
            jtag_tdi: false,
            jtag_tdo: false,
            jtag_trst_n: true,
        }
    }
}

impl DutPins {
    /// Appends one single-bit probe per pin, in declaration order.
    pub fn probes(&self, out: &mut Vec<Probe>) {
        out.extend([
            Probe::bit("clk_i", self.clk_i),
            Probe::bit("n_rst_i", self.n_rst_i),
            Probe::bit("uart_txd", self.uart_txd),
            Probe::bit("uart_rxd", self.uart_rxd),
            Probe::bit("jtag_tck", self.jtag_tck),
            Probe::bit("jtag_tms", self.jtag_tms),
            Probe::bit("jtag_tdi", self.jtag_tdi),
            Probe::bit("jtag_tdo", self.jtag_tdo),
            Probe::bit("jtag_trst_n", self.jtag_trst_n),
        ]);
    }
}

/// One traceable signal value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Probe {
    /// Signal name, unique within the DUT.
    pub name: &'static str,
    /// Width in bits, 1..=64.
    pub width: u32,
    /// Current value; bits above `width` are zero.
    pub value: u64,
}

impl Probe {
    /// A single-bit probe.
    pub fn bit(name: &'static str, level: bool) -> Self {
        Self {
            name,
            width: 1,
            value: u64::from(level),
        }
    }

    /// A multi-bit probe; `value` is masked to `width`.
    pub fn vector(name: &'static str, width: u32, value: u64) -> Self {
        let width = width.clamp(1, 64);
        let mask = if width == 64 {
            u64::MAX
        } else {
            (1u64 << width) - 1
        };
        Self {
            name,
            width,
            value: value & mask,
        }
    }
}

/// A clocked hardware model driven by the scheduler.
pub trait Dut {
    /// Current pin values.
    fn pins(&self) -> &DutPins;

    /// Mutable pin access for driving inputs.
    fn pins_mut(&mut self) -> &mut DutPins;

    /// Propagates the current inputs through the model.
    fn eval(&mut self) -> Result<(), crate::SimError>;

    /// Whether the model has requested the end of simulation.
    fn got_finish(&self) -> bool;

    /// Appends the signals to record in a waveform trace.
    ///
    /// The set of names and widths must not change over a run.
    fn probes(&self, out: &mut Vec<Probe>) {
        self.pins().probes(out);
    }
}

impl<D: Dut + ?Sized> Dut for Box<D> {
    fn pins(&self) -> &DutPins {
        (**self).pins()
    }

    fn pins_mut(&mut self) -> &mut DutPins {
        (**self).pins_mut()
    }

    fn eval(&mut self) -> Result<(), crate::SimError> {
        (**self).eval()
    }

    fn got_finish(&self) -> bool {
        (**self).got_finish()
    }

    fn probes(&self, out: &mut Vec<Probe>) {
        (**self).probes(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pins_idle_uart_and_reset_asserted() {
        let pins = DutPins::default();
        assert!(!pins.n_rst_i);
        assert!(pins.uart_txd);
        assert!(pins.uart_rxd);
        assert!(pins.jtag_trst_n);
    }

    #[test]
    fn pin_probes_in_order() {
        let mut out = Vec::new();
        DutPins::default().probes(&mut out);
        let names: Vec<_> = out.iter().map(|p| p.name).collect();
        assert_eq!(names[0], "clk_i");
        assert_eq!(names.len(), 9);
        assert!(out.iter().all(|p| p.width == 1));
        assert_eq!(out[2].value, 1);
    }

    #[test]
    fn vector_probe_masks() {
        let p = Probe::vector("count", 4, 0x1F);
        assert_eq!(p.value, 0xF);
        assert_eq!(Probe::vector("wide", 64, u64::MAX).value, u64::MAX);
        assert_eq!(Probe::vector("zero", 0, 3).width, 1);
    }
}
