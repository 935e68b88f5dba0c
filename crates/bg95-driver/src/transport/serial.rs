//! Serial port transport.

use std::io::{self, Read, Write};
use std::time::Duration;

use bg95_at::{AtResult, Transport};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::debug;

use crate::error::DriverResult;

/// Timeout applied when the port is opened; each read sets its own.
const OPEN_TIMEOUT: Duration = Duration::from_millis(100);

/// Modem UART reached through the OS serial driver (8N1, no flow control).
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    /// Timeout currently configured on the port.
    timeout: Duration,
}

impl SerialTransport {
    /// Open `path` at `baud_rate`.
    pub fn open(path: &str, baud_rate: u32) -> DriverResult<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .timeout(OPEN_TIMEOUT)
            .open()?;

        debug!("Opened {} at {} baud", path, baud_rate);
        Ok(SerialTransport {
            port,
            timeout: OPEN_TIMEOUT,
        })
    }

    /// Port name, if the OS reports one.
    pub fn name(&self) -> Option<String> {
        self.port.name()
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, data: &[u8]) -> AtResult<()> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> AtResult<usize> {
        if timeout != self.timeout {
            self.port.set_timeout(timeout).map_err(io::Error::from)?;
            self.timeout = timeout;
        }

        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}
