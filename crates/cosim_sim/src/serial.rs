//! Bit-exact model of a full-duplex asynchronous serial line (8N1).
//!
//! A [`SerialLine`] sits between the DUT's UART pins and a [`HostConsole`].
//! Once per clock tick it samples the DUT's transmit pin with a [`Receiver`]
//! and drives the DUT's receive pin from a [`Transmitter`]. The two halves are
//! independent state machines that share only the [`BaudPeriod`].
//!
//! Timing, with `P` ticks per bit:
//!
//! - the receiver arms on the 1→0 start edge and takes its first sample
//!   `P + P/2` ticks later (the middle of data bit 0), then one sample every
//!   `P` ticks; the expiry after the eighth sample (mid stop bit) delivers the
//!   byte;
//! - the transmitter drives the start bit on the same tick it picks up a host
//!   byte and holds every frame bit for exactly `P` ticks; after the stop bit
//!   it spends one more tick idle-high before it can poll for the next byte.

use cosim_common::BaudPeriod;
use log::{debug, trace, warn};

use crate::console::HostConsole;

/// Data bits per frame.
pub const DATA_BITS: u8 = 8;

/// Bit-times per frame: start, eight data bits, stop.
pub const FRAME_BITS: u8 = DATA_BITS + 2;

/// Line level while no frame is in flight.
pub const IDLE_LEVEL: bool = true;

/// Receive-side state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RxState {
    /// Waiting for a start edge.
    Idle,
    /// Sampling a frame.
    Receiving,
}

/// Transmit-side state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxState {
    /// No frame in flight; the host is polled every tick.
    Idle,
    /// Shifting out a frame.
    Sending,
}

/// Receive half: decodes frames from a line sampled once per tick.
#[derive(Clone, Debug)]
pub struct Receiver {
    state: RxState,
    countdown: u32,
    bits_collected: u8,
    data: u8,
    last_level: bool,
    stop_errors: u64,
}

impl Receiver {
    /// Creates an idle receiver that considers the line to have been high.
    pub fn new() -> Self {
        Self {
            state: RxState::Idle,
            countdown: 0,
            bits_collected: 0,
            data: 0,
            last_level: IDLE_LEVEL,
            stop_errors: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> RxState {
        self.state
    }

    /// Data bits sampled so far in the current frame.
    pub fn bits_collected(&self) -> u8 {
        self.bits_collected
    }

    /// Frames delivered while the line was low at the stop-bit sample point.
    pub fn stop_errors(&self) -> u64 {
        self.stop_errors
    }

    /// Advances one tick with the line at `level`; returns a byte when a
    /// frame completes.
    pub fn step(&mut self, level: bool, baud: BaudPeriod) -> Option<u8> {
        let mut delivered = None;
        match self.state {
            RxState::Idle => {
                if self.last_level && !level {
                    self.state = RxState::Receiving;
                    self.countdown = baud.first_sample_delay() - 1;
                    self.bits_collected = 0;
                    self.data = 0;
                }
            }
            RxState::Receiving if self.countdown == 0 => {
                if self.bits_collected < DATA_BITS {
                    if level {
                        self.data |= 1 << self.bits_collected;
                    }
                    self.bits_collected += 1;
                } else {
                    if !level {
                        self.stop_errors += 1;
                        debug!("serial rx: stop bit low for byte {:#04x}", self.data);
                    }
                    self.state = RxState::Idle;
                    delivered = Some(self.data);
                }
                self.countdown = baud.ticks() - 1;
            }
            RxState::Receiving => self.countdown -= 1,
        }
        self.last_level = level;
        delivered
    }
}

impl Default for Receiver {
    fn default() -> Self {
        Self::new()
    }
}

/// Transmit half: serialises one byte at a time onto the line.
#[derive(Clone, Debug)]
pub struct Transmitter {
    state: TxState,
    countdown: u32,
    /// Remaining frame bits, current bit in position 0.
    frame: u16,
    /// Frame bits not yet fully emitted, including the current one.
    bits_remaining: u8,
}

impl Transmitter {
    /// Creates an idle transmitter.
    pub fn new() -> Self {
        Self {
            state: TxState::Idle,
            countdown: 0,
            frame: 0,
            bits_remaining: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> TxState {
        self.state
    }

    /// Whether no frame is in flight.
    pub fn is_idle(&self) -> bool {
        self.state == TxState::Idle
    }

    /// Builds the 10-bit 8N1 frame for `byte`: start bit (0) in bit 0, data
    /// LSB first in bits 1..=8, stop bit (1) in bit 9.
    pub fn frame_for(byte: u8) -> u16 {
        (1 << (FRAME_BITS - 1)) | (u16::from(byte) << 1)
    }

    fn current_level(&self) -> bool {
        if self.bits_remaining == 0 {
            IDLE_LEVEL
        } else {
            self.frame & 1 != 0
        }
    }

    /// Advances one tick and returns the line level for this tick.
    ///
    /// `next_byte` is consulted only while idle; returning `None` keeps the
    /// line idle.
    pub fn step(&mut self, baud: BaudPeriod, next_byte: impl FnOnce() -> Option<u8>) -> bool {
        match self.state {
            TxState::Idle => match next_byte() {
                Some(byte) => {
                    self.frame = Self::frame_for(byte);
                    self.bits_remaining = FRAME_BITS;
                    self.countdown = baud.ticks() - 1;
                    self.state = TxState::Sending;
                    self.current_level()
                }
                None => IDLE_LEVEL,
            },
            TxState::Sending => {
                if self.countdown == 0 {
                    self.frame >>= 1;
                    self.bits_remaining -= 1;
                    if self.bits_remaining == 0 {
                        self.state = TxState::Idle;
                    } else {
                        self.countdown = baud.ticks() - 1;
                    }
                } else {
                    self.countdown -= 1;
                }
                self.current_level()
            }
        }
    }
}

impl Default for Transmitter {
    fn default() -> Self {
        Self::new()
    }
}

/// One full-duplex serial line between the DUT and a host console.
#[derive(Debug)]
pub struct SerialLine<C> {
    baud: BaudPeriod,
    console: C,
    rx: Receiver,
    tx: Transmitter,
    steps: u64,
    bytes_received: u64,
    bytes_sent: u64,
    host_read_errors: u64,
    host_write_errors: u64,
}

impl<C: HostConsole> SerialLine<C> {
    /// Creates a line with `baud` ticks per bit attached to `console`.
    pub fn new(baud: BaudPeriod, console: C) -> Self {
        Self {
            baud,
            console,
            rx: Receiver::new(),
            tx: Transmitter::new(),
            steps: 0,
            bytes_received: 0,
            bytes_sent: 0,
            host_read_errors: 0,
            host_write_errors: 0,
        }
    }

    /// Advances both halves by one tick.
    ///
    /// `line_in` is the DUT's transmit pin; the return value is the level to
    /// drive onto the DUT's receive pin.
    pub fn step(&mut self, line_in: bool) -> bool {
        self.steps += 1;

        if let Some(byte) = self.rx.step(line_in, self.baud) {
            self.bytes_received += 1;
            trace!("serial rx: {byte:#04x}");
            if let Err(e) = self.console.write_byte(byte) {
                self.host_write_errors += 1;
                warn!("uart console write failed: {e}");
            }
        }

        let console = &mut self.console;
        let bytes_sent = &mut self.bytes_sent;
        let read_errors = &mut self.host_read_errors;
        self.tx.step(self.baud, || match console.poll_byte() {
            Ok(Some(byte)) => {
                *bytes_sent += 1;
                trace!("serial tx: {byte:#04x}");
                Some(byte)
            }
            Ok(None) => None,
            Err(e) => {
                *read_errors += 1;
                warn!("uart console read failed: {e}");
                None
            }
        })
    }

    /// Ticks per bit.
    pub fn baud(&self) -> BaudPeriod {
        self.baud
    }

    /// Number of times [`step`](Self::step) has run.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Bytes decoded from the DUT and delivered to the console.
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Host bytes whose transmission has started.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Failed host reads.
    pub fn host_read_errors(&self) -> u64 {
        self.host_read_errors
    }

    /// Failed console writes.
    pub fn host_write_errors(&self) -> u64 {
        self.host_write_errors
    }

    /// Receive-side state.
    pub fn rx_state(&self) -> RxState {
        self.rx.state()
    }

    /// Transmit-side state.
    pub fn tx_state(&self) -> TxState {
        self.tx.state()
    }

    /// The attached console.
    pub fn console(&self) -> &C {
        &self.console
    }

    /// The attached console, mutably.
    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    /// Consumes the line, returning its console.
    pub fn into_console(self) -> C {
        self.console
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::BufferConsole;
    use std::io;

    fn period(ticks: u32) -> BaudPeriod {
        BaudPeriod::new(ticks).unwrap()
    }

    /// Line levels for one frame of `byte` followed by `idle_ticks` of idle,
    /// as produced by a transmitter.
    fn transmit(byte: u8, baud: BaudPeriod, idle_ticks: usize) -> Vec<bool> {
        let mut tx = Transmitter::new();
        let mut pending = Some(byte);
        let mut levels = Vec::new();
        levels.push(tx.step(baud, || pending.take()));
        while !tx.is_idle() {
            levels.push(tx.step(baud, || None));
        }
        levels.extend(std::iter::repeat(IDLE_LEVEL).take(idle_ticks));
        levels
    }

    #[test]
    fn frame_layout() {
        // 'A' = 0x41: start 0, data 1000_0010 (LSB first), stop 1.
        let frame = Transmitter::frame_for(0x41);
        let bits: Vec<u16> = (0..10).map(|i| (frame >> i) & 1).collect();
        assert_eq!(bits, vec![0, 1, 0, 0, 0, 0, 0, 1, 0, 1]);
    }

    #[test]
    fn transmitter_holds_each_bit_for_one_period() {
        let baud = period(4);
        let levels = transmit(0x41, baud, 0);
        // 10 bits * 4 ticks, plus the final idle tick on which the frame ends.
        assert_eq!(levels.len(), 41);
        let expected_bits = [0, 1, 0, 0, 0, 0, 0, 1, 0, 1];
        for (i, bit) in expected_bits.iter().enumerate() {
            for t in 0..4 {
                assert_eq!(levels[i * 4 + t], *bit == 1, "bit {i} tick {t}");
            }
        }
        assert!(levels[40]);
    }

    #[test]
    fn transmitter_idle_without_input() {
        let mut tx = Transmitter::new();
        for _ in 0..100 {
            assert!(tx.step(BaudPeriod::DEFAULT, || None));
            assert!(tx.is_idle());
        }
    }

    #[test]
    fn transmitter_ignores_host_while_sending() {
        let baud = period(3);
        let mut tx = Transmitter::new();
        assert!(!tx.step(baud, || Some(0x00)));
        let mut polled = false;
        // The frame ends on the 30th step after pickup.
        for _ in 0..30 {
            tx.step(baud, || {
                polled = true;
                Some(0xFF)
            });
        }
        assert!(!polled);
        assert!(tx.is_idle());
    }

    #[test]
    fn receiver_decodes_frame() {
        let baud = period(8);
        let mut rx = Receiver::new();
        let mut got = Vec::new();
        for level in transmit(0xA5, baud, 16) {
            if let Some(b) = rx.step(level, baud) {
                got.push(b);
            }
        }
        assert_eq!(got, vec![0xA5]);
        assert_eq!(rx.state(), RxState::Idle);
        assert_eq!(rx.stop_errors(), 0);
    }

    #[test]
    fn receiver_needs_eight_samples_before_delivery() {
        let baud = period(6);
        let mut rx = Receiver::new();
        let levels = transmit(0x00, baud, 8);
        let mut delivered_at = None;
        for (t, level) in levels.iter().enumerate() {
            if rx.step(*level, baud).is_some() {
                delivered_at = Some(t);
                break;
            }
            if rx.state() == RxState::Receiving {
                assert!(rx.bits_collected() <= DATA_BITS);
            }
        }
        // start edge at 0, first sample at 9, eighth at 9 + 7*6 = 51,
        // delivery one period later, mid stop bit.
        assert_eq!(delivered_at, Some(57));
    }

    #[test]
    fn receiver_ignores_falling_edge_mid_frame() {
        let baud = period(4);
        let mut rx = Receiver::new();
        // 0x55 has alternating data bits and therefore many falling edges.
        let mut got = Vec::new();
        for level in transmit(0x55, baud, 4) {
            if let Some(b) = rx.step(level, baud) {
                got.push(b);
            }
        }
        assert_eq!(got, vec![0x55]);
    }

    #[test]
    fn receiver_requires_a_falling_edge() {
        let baud = period(2);
        let mut rx = Receiver::new();
        assert_eq!(rx.step(false, baud), None);
        assert_eq!(rx.state(), RxState::Receiving);

        let mut held_low = Receiver::new();
        let mut count = 0;
        for _ in 0..200 {
            if held_low.step(false, baud).is_some() {
                count += 1;
            }
        }
        // A line stuck low yields one (break) frame, then no new start edge.
        assert_eq!(count, 1);
        assert_eq!(held_low.stop_errors(), 1);
    }

    #[test]
    fn line_loopback_through_two_instances() {
        let baud = period(5);
        let mut host = SerialLine::new(baud, BufferConsole::with_input(b"hi!"));
        let mut far = SerialLine::new(baud, BufferConsole::new());
        for _ in 0..400 {
            let level = host.step(IDLE_LEVEL);
            far.step(level);
        }
        assert_eq!(far.console().output(), b"hi!");
        assert_eq!(host.bytes_sent(), 3);
        assert_eq!(far.bytes_received(), 3);
    }

    #[test]
    fn line_counts_steps() {
        let mut line = SerialLine::new(BaudPeriod::DEFAULT, BufferConsole::new());
        for _ in 0..17 {
            assert!(line.step(true));
        }
        assert_eq!(line.steps(), 17);
        assert_eq!(line.tx_state(), TxState::Idle);
        assert_eq!(line.rx_state(), RxState::Idle);
    }

    struct FailingConsole {
        reads: u32,
        written: Vec<u8>,
    }

    impl HostConsole for FailingConsole {
        fn poll_byte(&mut self) -> io::Result<Option<u8>> {
            self.reads += 1;
            Err(io::Error::new(io::ErrorKind::Other, "console gone"))
        }

        fn write_byte(&mut self, byte: u8) -> io::Result<()> {
            self.written.push(byte);
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn host_read_errors_keep_line_idle() {
        let mut line = SerialLine::new(
            period(2),
            FailingConsole {
                reads: 0,
                written: Vec::new(),
            },
        );
        for _ in 0..10 {
            assert!(line.step(true));
        }
        assert_eq!(line.host_read_errors(), 10);
        assert_eq!(line.console().reads, 10);
        assert_eq!(line.tx_state(), TxState::Idle);
    }

    #[test]
    fn host_write_errors_do_not_stop_receiver() {
        let baud = period(3);
        let mut line = SerialLine::new(
            baud,
            FailingConsole {
                reads: 0,
                written: Vec::new(),
            },
        );
        for level in transmit(b'x', baud, 3)
            .into_iter()
            .chain(transmit(b'y', baud, 3))
        {
            line.step(level);
        }
        assert_eq!(line.bytes_received(), 2);
        assert_eq!(line.host_write_errors(), 2);
        assert_eq!(line.console().written, b"xy".to_vec());
    }
}
