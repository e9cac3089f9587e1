//! OpenOCD `remote_bitbang` JTAG server.
//!
//! A debugger connects over TCP and streams single-byte commands. The server
//! never blocks the clock: the listener and the client socket are both
//! non-blocking, and at most one pin update is applied per tick so the DUT
//! observes every TCK level.
//!
//! Commands:
//!
//! | byte        | action                                        |
//! |-------------|-----------------------------------------------|
//! | `'0'..='7'` | drive TCK, TMS, TDI from bits 2, 1, 0         |
//! | `'R'`       | reply `'0'` or `'1'` with the current TDO     |
//! | `'B'`, `'b'`| blink on/off (ignored)                        |
//! | `'r'..='u'` | TRST/SRST: `r`,`s` release TRST, `t`,`u` assert it |
//! | `'Q'`       | close the connection                          |

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};

use log::{debug, info, warn};

use crate::debug::DebugAdapter;
use crate::error::SimError;

/// Port the debugger expects by default.
pub const DEFAULT_PORT: u16 = 9823;

const READ_CHUNK: usize = 64;

/// JTAG debug adapter backed by a `remote_bitbang` TCP connection.
#[derive(Debug)]
pub struct RemoteBitbang {
    listener: TcpListener,
    client: Option<TcpStream>,
    pending: VecDeque<u8>,
    trst_n: bool,
    srst_n: bool,
    connections: u64,
}

impl RemoteBitbang {
    /// Listens on `127.0.0.1:port`. Port 0 picks a free port.
    pub fn bind(port: u16) -> Result<Self, SimError> {
        let to_bind_error = |source| SimError::DebugBind { port, source };
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port)).map_err(to_bind_error)?;
        listener.set_nonblocking(true).map_err(to_bind_error)?;
        if let Ok(addr) = listener.local_addr() {
            info!("remote bitbang listening on {addr}");
        }
        Ok(Self {
            listener,
            client: None,
            pending: VecDeque::new(),
            trst_n: true,
            srst_n: true,
            connections: 0,
        })
    }

    /// The bound address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Whether a debugger is attached.
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Number of debugger connections accepted so far.
    pub fn connections(&self) -> u64 {
        self.connections
    }

    fn accept(&mut self) {
        match self.listener.accept() {
            Ok((stream, peer)) => {
                if let Err(e) = stream.set_nonblocking(true) {
                    warn!("remote bitbang: cannot configure client {peer}: {e}");
                    return;
                }
                if let Err(e) = stream.set_nodelay(true) {
                    debug!("remote bitbang: cannot disable Nagle for {peer}: {e}");
                }
                info!("remote bitbang: debugger connected from {peer}");
                self.connections += 1;
                self.client = Some(stream);
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => warn!("remote bitbang: accept failed: {e}"),
        }
    }

    fn disconnect(&mut self, why: &str) {
        if self.client.take().is_some() {
            info!("remote bitbang: debugger disconnected ({why})");
        }
        self.pending.clear();
    }

    fn fill(&mut self) {
        let Some(client) = self.client.as_mut() else {
            return;
        };
        let mut buf = [0u8; READ_CHUNK];
        match client.read(&mut buf) {
            Ok(0) => self.disconnect("end of stream"),
            Ok(n) => self.pending.extend(&buf[..n]),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) => {}
            Err(e) => {
                warn!("remote bitbang: read failed: {e}");
                self.disconnect("read error");
            }
        }
    }

    fn reply(&mut self, byte: u8) {
        let Some(client) = self.client.as_mut() else {
            return;
        };
        if let Err(e) = client.write_all(&[byte]) {
            warn!("remote bitbang: write failed: {e}");
            self.disconnect("write error");
        }
    }

    fn set_resets(&mut self, cmd: u8) {
        let bits = cmd - b'r';
        self.trst_n = bits & 0b10 == 0;
        let srst_n = bits & 0b01 == 0;
        if srst_n != self.srst_n {
            let state = if srst_n { "released" } else { "requested" };
            debug!("remote bitbang: system reset {state}");
            self.srst_n = srst_n;
        }
    }
}

impl DebugAdapter for RemoteBitbang {
    fn tick(&mut self, tck: &mut bool, tms: &mut bool, tdi: &mut bool, tdo: bool) -> bool {
        if self.client.is_none() {
            self.accept();
        }
        if self.pending.is_empty() {
            self.fill();
        }

        while let Some(cmd) = self.pending.pop_front() {
            match cmd {
                b'0'..=b'7' => {
                    let bits = cmd - b'0';
                    *tck = bits & 0b100 != 0;
                    *tms = bits & 0b010 != 0;
                    *tdi = bits & 0b001 != 0;
                    break;
                }
                b'R' => self.reply(if tdo { b'1' } else { b'0' }),
                b'B' | b'b' => {}
                b'r'..=b'u' => self.set_resets(cmd),
                b'Q' => {
                    self.disconnect("quit");
                    break;
                }
                other => warn!("remote bitbang: unknown command {:?}", char::from(other)),
            }
        }
        self.trst_n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[derive(Default)]
    struct Jtag {
        tck: bool,
        tms: bool,
        tdi: bool,
        tdo: bool,
        trst_n: bool,
    }

    impl Jtag {
        fn tick(&mut self, bb: &mut RemoteBitbang) {
            self.trst_n = bb.tick(&mut self.tck, &mut self.tms, &mut self.tdi, self.tdo);
        }
    }

    fn tick_until(
        bb: &mut RemoteBitbang,
        jtag: &mut Jtag,
        done: impl Fn(&Jtag, &RemoteBitbang) -> bool,
    ) {
        for _ in 0..500 {
            jtag.tick(bb);
            if done(jtag, bb) {
                return;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("condition not reached");
    }

    fn connect() -> (RemoteBitbang, TcpStream, Jtag) {
        let mut bb = RemoteBitbang::bind(0).unwrap();
        let addr = bb.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        client
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let mut jtag = Jtag::default();
        tick_until(&mut bb, &mut jtag, |_, bb| bb.is_connected());
        (bb, client, jtag)
    }

    #[test]
    fn idle_without_client() {
        let mut bb = RemoteBitbang::bind(0).unwrap();
        let mut jtag = Jtag::default();
        jtag.tick(&mut bb);
        assert!(jtag.trst_n);
        assert!(!bb.is_connected());
    }

    #[test]
    fn pin_writes_apply_one_per_tick() {
        let (mut bb, mut client, mut jtag) = connect();
        client.write_all(b"57").unwrap();
        tick_until(&mut bb, &mut jtag, |j, _| j.tck);
        assert_eq!((jtag.tck, jtag.tms, jtag.tdi), (true, false, true));
        jtag.tick(&mut bb);
        assert_eq!((jtag.tck, jtag.tms, jtag.tdi), (true, true, true));
    }

    #[test]
    fn read_replies_with_tdo() {
        let (mut bb, mut client, mut jtag) = connect();
        jtag.tdo = true;
        client.write_all(b"R").unwrap();
        for _ in 0..50 {
            jtag.tick(&mut bb);
            thread::sleep(Duration::from_millis(2));
        }
        let mut reply = [0u8; 1];
        client.read_exact(&mut reply).unwrap();
        assert_eq!(&reply, b"1");
    }

    #[test]
    fn reset_commands_drive_trst() {
        let (mut bb, mut client, mut jtag) = connect();
        client.write_all(b"t").unwrap();
        tick_until(&mut bb, &mut jtag, |j, _| !j.trst_n);
        client.write_all(b"s").unwrap();
        tick_until(&mut bb, &mut jtag, |j, _| j.trst_n);
    }

    #[test]
    fn quit_drops_client_and_accepts_again() {
        let (mut bb, mut client, mut jtag) = connect();
        client.write_all(b"Q").unwrap();
        tick_until(&mut bb, &mut jtag, |_, bb| !bb.is_connected());

        let mut buf = [0u8; 1];
        assert_eq!(client.read(&mut buf).unwrap(), 0);

        let _second = TcpStream::connect(bb.local_addr().unwrap()).unwrap();
        tick_until(&mut bb, &mut jtag, |_, bb| bb.is_connected());
        assert_eq!(bb.connections(), 2);
    }

    #[test]
    fn bind_conflict_reports_port() {
        let first = RemoteBitbang::bind(0).unwrap();
        let port = first.local_addr().unwrap().port();
        let err = RemoteBitbang::bind(port).unwrap_err();
        assert!(matches!(err, SimError::DebugBind { port: p, .. } if p == port));
    }
}
