//! `AT+QMTCLOSE`: close the network connection of an MQTT client.

use bg95_at::{
    code_enum, AtResult, CodeRange, CommandBuffer, CommandDescriptor, CommandKind, Operation,
    ResponsePolicy,
};

use super::{client_and_code, parse_client_range};
use crate::constants::{CMD_QMTCLOSE, TIMEOUT_QMTCLOSE};
use crate::parse::check_client_idx;

code_enum! {
    /// Result of closing the network connection.
    pub enum CloseResult {
        FailedToClose = -1 => "Failed to close network",
        Closed = 0 => "Network closed successfully",
    }
}

/// Parameters for `AT+QMTCLOSE=<client_idx>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseParams {
    pub client_idx: u8,
}

/// Final report of `AT+QMTCLOSE=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CloseReport {
    pub client_idx: Option<u8>,
    pub result: Option<CloseResult>,
}

fn parse_test(raw: &str) -> AtResult<CodeRange> {
    parse_client_range(raw, CMD_QMTCLOSE)
}

fn parse_write(raw: &str) -> AtResult<CloseReport> {
    Ok(match client_and_code(raw, CMD_QMTCLOSE)? {
        Some((client_idx, code)) => CloseReport {
            client_idx,
            result: code.and_then(CloseResult::from_code),
        },
        None => CloseReport::default(),
    })
}

fn format_write(params: &CloseParams, buf: &mut CommandBuffer) -> AtResult<()> {
    check_client_idx(params.client_idx)?;
    buf.push_value(params.client_idx)
}

/// `AT+QMTCLOSE=?`
pub static TEST: Operation<(), CodeRange> = Operation {
    command: CMD_QMTCLOSE,
    kind: CommandKind::Test,
    policy: ResponsePolicy::DataRequired,
    timeout: TIMEOUT_QMTCLOSE,
    parser: Some(parse_test),
    formatter: None,
};

/// `AT+QMTCLOSE=<client_idx>`
pub static WRITE: Operation<CloseParams, CloseReport> = Operation {
    command: CMD_QMTCLOSE,
    kind: CommandKind::Write,
    policy: ResponsePolicy::DataRequired,
    timeout: TIMEOUT_QMTCLOSE,
    parser: Some(parse_write),
    formatter: Some(format_write),
};

/// `AT+QMTCLOSE`
pub static DESCRIPTOR: CommandDescriptor = CommandDescriptor {
    name: CMD_QMTCLOSE,
    description: "Close a Network Connection for MQTT Client",
    test: Some(&TEST),
    read: None,
    write: Some(&WRITE),
    execute: None,
};
