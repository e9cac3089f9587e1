//! Debug-transport seam.
//!
//! Once per rising edge, before evaluation, the scheduler hands the DUT's
//! JTAG pins to a [`DebugAdapter`]. The adapter may rewrite TCK, TMS and TDI
//! and returns the level for the active-low JTAG reset.

/// Drives the auxiliary debug pins of the DUT.
pub trait DebugAdapter {
    /// Called once per tick before the rising-edge evaluation.
    ///
    /// `tdo` is the DUT's data output from the previous evaluation. The
    /// return value is the TRST level, `true` meaning not in reset.
    fn tick(&mut self, tck: &mut bool, tms: &mut bool, tdi: &mut bool, tdo: bool) -> bool;
}

impl<A: DebugAdapter + ?Sized> DebugAdapter for Box<A> {
    fn tick(&mut self, tck: &mut bool, tms: &mut bool, tdi: &mut bool, tdo: bool) -> bool {
        (**self).tick(tck, tms, tdi, tdo)
    }
}

/// Adapter for runs without a debugger: pins untouched, never in reset.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDebugAdapter;

impl DebugAdapter for NoDebugAdapter {
    fn tick(&mut self, _tck: &mut bool, _tms: &mut bool, _tdi: &mut bool, _tdo: bool) -> bool {
        true
    }
}
