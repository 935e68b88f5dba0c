//! BG95 driver: transports, the typed command handle and the
//! connect-and-publish workflow built on the `bg95-at` engine.
//!
//! ```no_run
//! use bg95_driver::{Bg95, DriverConfig, SerialTransport};
//!
//! # fn main() -> bg95_driver::DriverResult<()> {
//! let config = DriverConfig::default();
//! let transport = SerialTransport::open("/dev/ttyUSB0", 115_200)?;
//! let mut bg95 = Bg95::with_config(transport, &config.engine);
//! bg95.connect_to_network(&config.network)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod session;
pub mod transport;

pub use config::{DriverConfig, EngineConfig, MqttConfig, NetworkConfig, TransportConfig, WorkflowConfig};
pub use driver::Bg95;
pub use error::{DriverError, DriverResult};
pub use session::{CycleReport, Session, Telemetry};
pub use transport::{
    open_transport, scripted_modem, DynTransport, MockResponse, MockTransport, SerialTransport,
    TcpTransport,
};
