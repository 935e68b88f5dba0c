//! Byte transports to the modem.
//!
//! All three implement [`bg95_at::Transport`]: a blocking write plus a read
//! that waits at most the given timeout and returns `Ok(0)` when nothing
//! arrived.

mod mock;
mod serial;
mod tcp;

pub use mock::{scripted_modem, MockResponse, MockTransport};
pub use serial::SerialTransport;
pub use tcp::TcpTransport;

use bg95_at::Transport;
use tracing::info;

use crate::config::{DriverConfig, TransportConfig};
use crate::error::DriverResult;

/// Boxed transport chosen at runtime.
pub type DynTransport = Box<dyn Transport + Send>;

/// Open the transport selected by `config`.
pub fn open_transport(config: &DriverConfig) -> DriverResult<DynTransport> {
    let transport: DynTransport = match &config.transport {
        TransportConfig::Serial { port, baud_rate } => {
            info!("Opening serial port {} at {} baud", port, baud_rate);
            Box::new(SerialTransport::open(port, *baud_rate)?)
        }
        TransportConfig::Tcp { address } => {
            info!("Connecting to serial bridge at {}", address);
            Box::new(TcpTransport::connect(address)?)
        }
        TransportConfig::Mock => {
            info!("Using the built-in scripted modem");
            Box::new(scripted_modem(config))
        }
    };
    Ok(transport)
}
