//! BG95 Command Set
//!
//! This crate provides typed command descriptors for the subset of the BG95
//! AT command set needed to bring up a data connection and exchange MQTT
//! messages. Each command module exposes:
//!
//! - `DESCRIPTOR`: the static [`CommandDescriptor`](bg95_at::CommandDescriptor)
//!   the engine uses for termination detection
//! - One `Operation` static per supported kind (`TEST`, `READ`, `WRITE`,
//!   `EXECUTE`) carrying the typed parser and formatter
//! - The parameter and response types, plus code enums for numeric fields
//!
//! # Command Groups
//!
//! - **Network**: `CPIN`, `CSQ`, `COPS`, `CGDCONT`, `CGACT`
//! - **MQTT**: `QMTCFG`, `QMTOPEN`, `QMTCLOSE`, `QMTCONN`, `QMTDISC`,
//!   `QMTSUB`, `QMTUNS`, `QMTPUB`
//!
//! # Example
//!
//! ```rust,ignore
//! use bg95_at::{dispatch_format, CommandBuffer};
//! use bg95_commands::mqtt::qmtopen;
//!
//! let params = qmtopen::OpenParams { client_idx: 0, host: "broker.example.com".into(), port: 1883 };
//! let mut buf = CommandBuffer::default();
//! dispatch_format(&qmtopen::WRITE, &params, &mut buf)?;
//! assert_eq!(buf.as_str(), "=0,\"broker.example.com\",1883");
//! ```

mod constants;
mod parse;
pub mod mqtt;
pub mod network;

pub use constants::*;

use bg95_at::CommandDescriptor;

/// Every command descriptor this crate provides.
pub static ALL_COMMANDS: &[&CommandDescriptor] = &[
    &network::cpin::DESCRIPTOR,
    &network::csq::DESCRIPTOR,
    &network::cops::DESCRIPTOR,
    &network::cgdcont::DESCRIPTOR,
    &network::cgact::DESCRIPTOR,
    &mqtt::qmtcfg::DESCRIPTOR,
    &mqtt::qmtopen::DESCRIPTOR,
    &mqtt::qmtclose::DESCRIPTOR,
    &mqtt::qmtconn::DESCRIPTOR,
    &mqtt::qmtdisc::DESCRIPTOR,
    &mqtt::qmtsub::DESCRIPTOR,
    &mqtt::qmtuns::DESCRIPTOR,
    &mqtt::qmtpub::DESCRIPTOR,
];

/// Look up a descriptor by mnemonic.
pub fn find_command(name: &str) -> Option<&'static CommandDescriptor> {
    ALL_COMMANDS.iter().copied().find(|desc| desc.name == name)
}
