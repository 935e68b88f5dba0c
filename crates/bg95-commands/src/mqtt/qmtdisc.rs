//! `AT+QMTDISC`: disconnect a client from the MQTT server.

use bg95_at::{
    code_enum, AtResult, CodeRange, CommandBuffer, CommandDescriptor, CommandKind, Operation,
    ResponsePolicy,
};

use super::{client_and_code, parse_client_range};
use crate::constants::{CMD_QMTDISC, TIMEOUT_QMTDISC};
use crate::parse::check_client_idx;

code_enum! {
    /// Result of the disconnect.
    pub enum DisconnectResult {
        Sent = 0 => "Disconnect message sent successfully",
        FailedToSend = 2 => "Failed to send disconnect message",
    }
}

/// Parameters for `AT+QMTDISC=<client_idx>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisconnectParams {
    pub client_idx: u8,
}

/// Final report of `AT+QMTDISC=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisconnectReport {
    pub client_idx: Option<u8>,
    pub result: Option<DisconnectResult>,
}

fn parse_test(raw: &str) -> AtResult<CodeRange> {
    parse_client_range(raw, CMD_QMTDISC)
}

fn parse_write(raw: &str) -> AtResult<DisconnectReport> {
    Ok(match client_and_code(raw, CMD_QMTDISC)? {
        Some((client_idx, code)) => DisconnectReport {
            client_idx,
            result: code.and_then(DisconnectResult::from_code),
        },
        None => DisconnectReport::default(),
    })
}

fn format_write(params: &DisconnectParams, buf: &mut CommandBuffer) -> AtResult<()> {
    check_client_idx(params.client_idx)?;
    buf.push_value(params.client_idx)
}

/// `AT+QMTDISC=?`
pub static TEST: Operation<(), CodeRange> = Operation {
    command: CMD_QMTDISC,
    kind: CommandKind::Test,
    policy: ResponsePolicy::DataRequired,
    timeout: TIMEOUT_QMTDISC,
    parser: Some(parse_test),
    formatter: None,
};

/// `AT+QMTDISC=<client_idx>`
pub static WRITE: Operation<DisconnectParams, DisconnectReport> = Operation {
    command: CMD_QMTDISC,
    kind: CommandKind::Write,
    policy: ResponsePolicy::DataRequired,
    timeout: TIMEOUT_QMTDISC,
    parser: Some(parse_write),
    formatter: Some(format_write),
};

/// `AT+QMTDISC`
pub static DESCRIPTOR: CommandDescriptor = CommandDescriptor {
    name: CMD_QMTDISC,
    description: "Disconnect a Client from MQTT Server",
    test: Some(&TEST),
    read: None,
    write: Some(&WRITE),
    execute: None,
};
