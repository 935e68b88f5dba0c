//! Serial-over-TCP transport.
//!
//! For a modem whose UART is exposed by a network bridge (ser2net, a
//! development board's USB-to-TCP server, ...). The byte stream is passed
//! through unchanged.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use bg95_at::{AtResult, Transport};
use tracing::debug;

use crate::error::DriverResult;

/// Modem UART reached through a TCP bridge.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Connect to `address` (`host:port`).
    pub fn connect(address: impl ToSocketAddrs) -> DriverResult<Self> {
        let stream = TcpStream::connect(address)?;
        stream.set_nodelay(true)?;
        debug!("Connected to {}", stream.peer_addr()?);
        Ok(TcpTransport { stream })
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream) -> Self {
        TcpTransport { stream }
    }
}

impl Transport for TcpTransport {
    fn write(&mut self, data: &[u8]) -> AtResult<()> {
        self.stream.write_all(data)?;
        self.stream.flush()?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> AtResult<usize> {
        // A zero read timeout means "block forever" to the socket API
        let timeout = timeout.max(Duration::from_millis(1));
        self.stream.set_read_timeout(Some(timeout))?;

        match self.stream.read(buf) {
            Ok(0) => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "bridge closed the connection").into()),
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}
