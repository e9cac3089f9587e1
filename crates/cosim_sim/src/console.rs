//! Host side of the serial line.
//!
//! The [`HostConsole`] trait is the seam between the serial engine and the
//! outside world. [`StdConsole`] binds it to the process's stdin/stdout with a
//! zero-timeout poll; [`BufferConsole`] keeps everything in memory.

use std::collections::VecDeque;
use std::io::{self, Write};

/// Byte-level host endpoint of a simulated UART.
pub trait HostConsole {
    /// Returns the next host byte if one is available right now.
    ///
    /// Must never block. End of input is reported as `Ok(None)`.
    fn poll_byte(&mut self) -> io::Result<Option<u8>>;

    /// Delivers one byte decoded from the line.
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;
}

impl<C: HostConsole + ?Sized> HostConsole for &mut C {
    fn poll_byte(&mut self) -> io::Result<Option<u8>> {
        (**self).poll_byte()
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        (**self).write_byte(byte)
    }
}

/// Console bound to the process's standard input and output.
///
/// Input is polled on the raw file descriptor so that no bytes are hidden in
/// a userspace buffer between polls. Output is flushed after every byte.
#[derive(Debug)]
pub struct StdConsole {
    stdout: io::Stdout,
    eof: bool,
}

impl StdConsole {
    /// Creates a console on stdin/stdout.
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            eof: false,
        }
    }

    /// Whether stdin has reached end of input.
    pub fn at_eof(&self) -> bool {
        self.eof
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl HostConsole for StdConsole {
    fn poll_byte(&mut self) -> io::Result<Option<u8>> {
        if self.eof {
            return Ok(None);
        }
        match raw::poll_stdin()? {
            raw::Readiness::Idle => Ok(None),
            raw::Readiness::Closed => {
                self.eof = true;
                Ok(None)
            }
            raw::Readiness::Ready => match raw::read_stdin_byte()? {
                raw::Read::Byte(byte) => Ok(Some(byte)),
                raw::Read::Retry => Ok(None),
                raw::Read::Eof => {
                    self.eof = true;
                    Ok(None)
                }
            },
        }
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        let mut out = self.stdout.lock();
        out.write_all(&[byte])?;
        out.flush()
    }
}

#[cfg(unix)]
mod raw {
    use std::io;

    pub(super) enum Readiness {
        Idle,
        Ready,
        Closed,
    }

    /// Zero-timeout readiness check on fd 0.
    pub(super) fn poll_stdin() -> io::Result<Readiness> {
        let mut fds = libc::pollfd {
            fd: libc::STDIN_FILENO,
            events: libc::POLLIN,
            revents: 0,
        };
        // SAFETY: `fds` is a single valid pollfd that outlives the call.
        let rc = unsafe { libc::poll(&mut fds, 1, 0) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(Readiness::Idle);
            }
            return Err(err);
        }
        if rc == 0 {
            return Ok(Readiness::Idle);
        }
        if fds.revents & libc::POLLNVAL != 0 {
            return Ok(Readiness::Closed);
        }
        if fds.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0 {
            return Ok(Readiness::Ready);
        }
        Ok(Readiness::Idle)
    }

    pub(super) enum Read {
        Byte(u8),
        Retry,
        Eof,
    }

    /// Reads at most one byte from fd 0.
    pub(super) fn read_stdin_byte() -> io::Result<Read> {
        let mut byte = 0u8;
        // SAFETY: the destination is a live, writable single byte.
        let n = unsafe { libc::read(libc::STDIN_FILENO, (&mut byte as *mut u8).cast(), 1) };
        if n < 0 {
            let err = io::Error::last_os_error();
            return match err.kind() {
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock => Ok(Read::Retry),
                _ => Err(err),
            };
        }
        Ok(if n == 0 { Read::Eof } else { Read::Byte(byte) })
    }
}

#[cfg(not(unix))]
mod raw {
    use std::io;

    #[allow(dead_code)]
    pub(super) enum Readiness {
        Idle,
        Ready,
        Closed,
    }

    #[allow(dead_code)]
    pub(super) enum Read {
        Byte(u8),
        Retry,
        Eof,
    }

    // No portable zero-timeout poll on a console handle; host input is
    // treated as closed.
    pub(super) fn poll_stdin() -> io::Result<Readiness> {
        Ok(Readiness::Closed)
    }

    pub(super) fn read_stdin_byte() -> io::Result<Read> {
        Ok(Read::Eof)
    }
}

/// In-memory console: a queue of pending host input and a capture buffer
/// for line output.
#[derive(Debug, Default, Clone)]
pub struct BufferConsole {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl BufferConsole {
    /// Creates an empty console.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a console whose input queue holds `bytes`.
    pub fn with_input(bytes: &[u8]) -> Self {
        Self {
            input: bytes.iter().copied().collect(),
            output: Vec::new(),
        }
    }

    /// Appends bytes to the input queue.
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.input.extend(bytes);
    }

    /// Bytes not yet consumed by the line.
    pub fn pending_input(&self) -> usize {
        self.input.len()
    }

    /// Everything written so far.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Takes the captured output, leaving the buffer empty.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }
}

impl HostConsole for BufferConsole {
    fn poll_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.input.pop_front())
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.output.push(byte);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_console_fifo() {
        let mut c = BufferConsole::with_input(b"ab");
        assert_eq!(c.poll_byte().unwrap(), Some(b'a'));
        assert_eq!(c.poll_byte().unwrap(), Some(b'b'));
        assert_eq!(c.poll_byte().unwrap(), None);
    }

    #[test]
    fn buffer_console_captures_output() {
        let mut c = BufferConsole::new();
        c.write_byte(b'h').unwrap();
        c.write_byte(b'i').unwrap();
        assert_eq!(c.output(), b"hi");
        assert_eq!(c.take_output(), b"hi".to_vec());
        assert!(c.output().is_empty());
    }

    #[test]
    fn push_input_appends() {
        let mut c = BufferConsole::with_input(b"x");
        c.push_input(b"yz");
        assert_eq!(c.pending_input(), 3);
    }

    #[test]
    fn mutable_reference_is_a_console() {
        fn echo_one<C: HostConsole>(mut console: C) {
            if let Some(b) = console.poll_byte().unwrap() {
                console.write_byte(b).unwrap();
            }
        }

        let mut c = BufferConsole::with_input(b"q");
        echo_one(&mut c);
        assert_eq!(c.output(), b"q");
        assert_eq!(c.pending_input(), 0);
    }
}
