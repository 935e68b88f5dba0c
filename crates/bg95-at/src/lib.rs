//! BG95 AT Command Protocol Engine
//!
//! This crate provides the generic engine for talking to a Quectel BG95
//! cellular modem over its AT command interface. It knows nothing about any
//! particular command; commands plug in through static [`CommandDescriptor`]
//! tables (see the `bg95-commands` crate).
//!
//! # Protocol Overview
//!
//! The AT interface is a line-based text protocol:
//!
//! - **Commands** (host → modem): `AT+<NAME><suffix>` terminated with `\r\n`
//! - **Final result codes** (modem → host): `OK`, `ERROR` or `+CME ERROR: <code>`
//! - **Data lines** (modem → host): `+<NAME>: <fields>`, before or after the
//!   final result code
//! - **URCs**: unsolicited `+<OTHER>: ...` lines that may arrive at any time
//!
//! # Command Kinds
//!
//! Every command supports a subset of four invocation forms:
//!
//! - **Test**: `AT+<NAME>=?` - supported parameter ranges
//! - **Read**: `AT+<NAME>?` - current values
//! - **Write**: `AT+<NAME>=<params>` - set values or start an action
//! - **Execute**: `AT+<NAME>` - run without parameters
//!
//! # Round Trip
//!
//! 1. [`dispatch_format`] serializes parameters into a bounded [`CommandBuffer`]
//! 2. The caller writes the encoded line through a [`Transport`]
//! 3. [`ResponseAccumulator`] reads until [`has_terminated`] is satisfied
//! 4. [`dispatch_parse`] checks the final result code and runs the parser
//!
//! # Example
//!
//! ```rust,ignore
//! use bg95_at::{dispatch_parse, encode_command, CommandKind, ResponseAccumulator};
//! use bg95_commands::network::csq;
//!
//! transport.write(&encode_command(csq::DESCRIPTOR.name, CommandKind::Execute.suffix()))?;
//! let mut acc = ResponseAccumulator::default();
//! let raw = acc.run(&mut transport, &csq::DESCRIPTOR, CommandKind::Execute)?;
//! let quality = dispatch_parse(&csq::EXECUTE, raw)?;
//! ```

mod accumulate;
mod codec;
mod commands;
mod dispatch;
mod enum_codec;
mod error;
mod fields;
mod format;
mod responses;
mod termination;

pub use accumulate::*;
pub use codec::*;
pub use commands::*;
pub use dispatch::*;
pub use enum_codec::*;
pub use error::*;
pub use fields::*;
pub use format::*;
pub use responses::*;
pub use termination::*;
