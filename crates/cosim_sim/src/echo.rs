//! Behavioural reference SoC.
//!
//! [`EchoSoc`] stands in for a compiled hardware model: a UART with its own
//! bit timer that, once reset is released, transmits a banner, echoes every
//! byte it receives, and requests the end of simulation after it has seen
//! the finish byte and drained its transmit queue. A one-bit JTAG
//! shift path copies TDI to TDO on each TCK rising edge.

use std::collections::VecDeque;

use cosim_common::BaudPeriod;
use log::debug;

use crate::dut::{Dut, DutPins, Probe};
use crate::error::SimError;
use crate::serial::{Receiver, Transmitter};

/// End-of-transmission, the default finish byte.
pub const EOT: u8 = 0x04;

/// Reference DUT that echoes its UART input.
#[derive(Debug, Clone)]
pub struct EchoSoc {
    pins: DutPins,
    baud: BaudPeriod,
    banner: Vec<u8>,
    finish_byte: u8,
    rx: Receiver,
    tx: Transmitter,
    queue: VecDeque<u8>,
    finish_requested: bool,
    finished: bool,
    last_clk: bool,
    last_tck: bool,
    cycles: u64,
    rx_count: u64,
    tx_count: u64,
}

impl EchoSoc {
    /// Creates a model whose UART runs at `baud` ticks per bit.
    pub fn new(baud: BaudPeriod, banner: impl Into<Vec<u8>>, finish_byte: u8) -> Self {
        Self {
            pins: DutPins::default(),
            baud,
            banner: banner.into(),
            finish_byte,
            rx: Receiver::new(),
            tx: Transmitter::new(),
            queue: VecDeque::new(),
            finish_requested: false,
            finished: false,
            last_clk: false,
            last_tck: false,
            cycles: 0,
            rx_count: 0,
            tx_count: 0,
        }
    }

    /// Rising clock edges evaluated.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Bytes received on `uart_rxd`, including the finish byte.
    pub fn rx_count(&self) -> u64 {
        self.rx_count
    }

    /// Bytes whose transmission on `uart_txd` has started.
    pub fn tx_count(&self) -> u64 {
        self.tx_count
    }

    fn eval_jtag(&mut self) {
        let pins = &mut self.pins;
        if !pins.jtag_trst_n {
            pins.jtag_tdo = false;
        } else if pins.jtag_tck && !self.last_tck {
            pins.jtag_tdo = pins.jtag_tdi;
        }
        self.last_tck = pins.jtag_tck;
    }

    fn reset(&mut self) {
        self.rx = Receiver::new();
        self.tx = Transmitter::new();
        self.queue = self.banner.iter().copied().collect();
        self.finish_requested = false;
        self.pins.uart_txd = true;
    }

    fn clock(&mut self) {
        if let Some(byte) = self.rx.step(self.pins.uart_rxd, self.baud) {
            self.rx_count += 1;
            if byte == self.finish_byte {
                debug!("echo soc: finish byte received");
                self.finish_requested = true;
            } else {
                self.queue.push_back(byte);
            }
        }

        let queue = &mut self.queue;
        let tx_count = &mut self.tx_count;
        self.pins.uart_txd = self.tx.step(self.baud, || {
            let next = queue.pop_front();
            if next.is_some() {
                *tx_count += 1;
            }
            next
        });

        if self.finish_requested && self.queue.is_empty() && self.tx.is_idle() {
            self.finished = true;
        }
    }
}

impl Dut for EchoSoc {
    fn pins(&self) -> &DutPins {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut DutPins {
        &mut self.pins
    }

    fn eval(&mut self) -> Result<(), SimError> {
        self.eval_jtag();

        let rising = self.pins.clk_i && !self.last_clk;
        self.last_clk = self.pins.clk_i;
        if !rising {
            return Ok(());
        }
        if self.finished {
            return Err(SimError::eval(self.cycles, "clock edge after finish"));
        }
        self.cycles += 1;

        if self.pins.n_rst_i {
            self.clock();
        } else {
            self.reset();
        }
        Ok(())
    }

    fn got_finish(&self) -> bool {
        self.finished
    }

    fn probes(&self, out: &mut Vec<Probe>) {
        self.pins.probes(out);
        out.push(Probe::vector("rx_count", 32, self.rx_count));
        out.push(Probe::vector("tx_count", 32, self.tx_count));
        out.push(Probe::vector("tx_queue", 16, self.queue.len() as u64));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::IDLE_LEVEL;

    fn period(ticks: u32) -> BaudPeriod {
        BaudPeriod::new(ticks).unwrap()
    }

    /// One full clock cycle with the given reset and receive levels; returns
    /// the transmit pin after the rising edge.
    fn cycle(soc: &mut EchoSoc, n_rst: bool, rxd: bool) -> bool {
        let pins = soc.pins_mut();
        pins.n_rst_i = n_rst;
        pins.uart_rxd = rxd;
        pins.clk_i = true;
        soc.eval().unwrap();
        let txd = soc.pins().uart_txd;
        soc.pins_mut().clk_i = false;
        soc.eval().unwrap();
        txd
    }

    fn decode(levels: &[bool], baud: BaudPeriod) -> Vec<u8> {
        let mut rx = Receiver::new();
        levels.iter().filter_map(|&l| rx.step(l, baud)).collect()
    }

    fn frame(byte: u8, baud: BaudPeriod) -> Vec<bool> {
        let mut tx = Transmitter::new();
        let mut pending = Some(byte);
        let mut levels = vec![tx.step(baud, || pending.take())];
        while !tx.is_idle() {
            levels.push(tx.step(baud, || None));
        }
        levels
    }

    #[test]
    fn holds_line_idle_in_reset() {
        let mut soc = EchoSoc::new(period(4), b"hi".to_vec(), EOT);
        for _ in 0..20 {
            assert!(cycle(&mut soc, false, IDLE_LEVEL));
        }
        assert_eq!(soc.tx_count(), 0);
    }

    #[test]
    fn sends_banner_after_reset() {
        let baud = period(4);
        let mut soc = EchoSoc::new(baud, b"ok".to_vec(), EOT);
        cycle(&mut soc, false, IDLE_LEVEL);
        let levels: Vec<bool> = (0..120).map(|_| cycle(&mut soc, true, IDLE_LEVEL)).collect();
        assert_eq!(decode(&levels, baud), b"ok");
        assert!(!soc.got_finish());
    }

    #[test]
    fn echoes_and_finishes() {
        let baud = period(4);
        let mut soc = EchoSoc::new(baud, Vec::new(), EOT);
        cycle(&mut soc, false, IDLE_LEVEL);

        let mut input: Vec<bool> = frame(b'z', baud);
        input.extend(frame(EOT, baud));
        input.extend(std::iter::repeat(IDLE_LEVEL).take(100));

        let mut out = Vec::new();
        for level in input {
            out.push(cycle(&mut soc, true, level));
            if soc.got_finish() {
                break;
            }
        }
        assert!(soc.got_finish());
        assert_eq!(decode(&out, baud), b"z");
        assert_eq!(soc.rx_count(), 2);
        assert_eq!(soc.tx_count(), 1);
    }

    #[test]
    fn clocking_after_finish_is_an_error() {
        let baud = period(2);
        let mut soc = EchoSoc::new(baud, Vec::new(), EOT);
        cycle(&mut soc, false, IDLE_LEVEL);
        for level in frame(EOT, baud).into_iter().chain([IDLE_LEVEL; 8]) {
            cycle(&mut soc, true, level);
            if soc.got_finish() {
                break;
            }
        }
        assert!(soc.got_finish());
        soc.pins_mut().clk_i = true;
        let err = soc.eval().unwrap_err();
        assert!(matches!(err, SimError::Eval { .. }));
    }

    #[test]
    fn jtag_shifts_on_tck_rising() {
        let mut soc = EchoSoc::new(period(4), Vec::new(), EOT);
        soc.pins_mut().jtag_tdi = true;
        soc.eval().unwrap();
        assert!(!soc.pins().jtag_tdo);
        soc.pins_mut().jtag_tck = true;
        soc.eval().unwrap();
        assert!(soc.pins().jtag_tdo);

        soc.pins_mut().jtag_trst_n = false;
        soc.eval().unwrap();
        assert!(!soc.pins().jtag_tdo);
    }

    #[test]
    fn probes_extend_pins() {
        let soc = EchoSoc::new(period(4), Vec::new(), EOT);
        let mut out = Vec::new();
        soc.probes(&mut out);
        assert_eq!(out.len(), 12);
        assert_eq!(out.last().map(|p| p.name), Some("tx_queue"));
    }
}
