//! `AT+QMTOPEN`: open a network connection for an MQTT client.

use bg95_at::{
    code_enum, parse_number, parse_number_in, payload, split_fields, unquote, AtResult,
    CommandBuffer, CommandDescriptor, CommandKind, Operation, ResponsePolicy,
};

use super::client_and_code;
use crate::constants::{CMD_QMTOPEN, TIMEOUT_QMTOPEN};
use crate::parse::{check_client_idx, check_not_empty, valid_client_idx};

code_enum! {
    /// Result of opening the network connection.
    pub enum OpenResult {
        FailedToOpen = -1 => "Failed to open network",
        Opened = 0 => "Network opened successfully",
        WrongParameter = 1 => "Wrong parameter",
        IdentifierOccupied = 2 => "MQTT client identifier is occupied",
        PdpActivationFailed = 3 => "Failed to activate PDP",
        DomainParseFailed = 4 => "Failed to parse domain name",
        ConnectionError = 5 => "Network connection error",
    }
}

/// Connection reported by `AT+QMTOPEN?`. All fields are absent when no
/// connection is open.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OpenConnection {
    pub client_idx: Option<u8>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl OpenConnection {
    /// Check whether this describes an open connection for `client_idx`.
    pub fn is_open_for(&self, client_idx: u8) -> bool {
        self.client_idx == Some(client_idx)
    }
}

/// Parameters for `AT+QMTOPEN=<client_idx>,"<host>",<port>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenParams {
    pub client_idx: u8,
    pub host: String,
    pub port: u16,
}

/// Final report of `AT+QMTOPEN=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenReport {
    pub client_idx: Option<u8>,
    pub result: Option<OpenResult>,
}

impl OpenReport {
    /// Check whether the connection was opened.
    pub fn is_success(&self) -> bool {
        self.result == Some(OpenResult::Opened)
    }
}

fn parse_read(raw: &str) -> AtResult<OpenConnection> {
    let Some(payload) = payload(raw, CMD_QMTOPEN) else {
        return Ok(OpenConnection::default());
    };

    let fields = split_fields(payload);
    Ok(OpenConnection {
        client_idx: parse_number_in(fields.first().copied(), valid_client_idx),
        host: fields
            .get(1)
            .map(|f| unquote(f))
            .filter(|host| !host.is_empty())
            .map(str::to_string),
        port: fields.get(2).and_then(|f| parse_number(f)),
    })
}

fn parse_write(raw: &str) -> AtResult<OpenReport> {
    Ok(match client_and_code(raw, CMD_QMTOPEN)? {
        Some((client_idx, code)) => OpenReport {
            client_idx,
            result: code.and_then(OpenResult::from_code),
        },
        None => OpenReport::default(),
    })
}

fn format_write(params: &OpenParams, buf: &mut CommandBuffer) -> AtResult<()> {
    check_client_idx(params.client_idx)?;
    check_not_empty("host", &params.host)?;

    buf.push_value(params.client_idx)?;
    buf.push_separator()?;
    buf.push_quoted(&params.host)?;
    buf.push_separator()?;
    buf.push_value(params.port)
}

/// `AT+QMTOPEN?`
pub static READ: Operation<(), OpenConnection> = Operation {
    command: CMD_QMTOPEN,
    kind: CommandKind::Read,
    policy: ResponsePolicy::DataOptional,
    timeout: TIMEOUT_QMTOPEN,
    parser: Some(parse_read),
    formatter: None,
};

/// `AT+QMTOPEN=<client_idx>,"<host>",<port>`
pub static WRITE: Operation<OpenParams, OpenReport> = Operation {
    command: CMD_QMTOPEN,
    kind: CommandKind::Write,
    policy: ResponsePolicy::DataRequired,
    timeout: TIMEOUT_QMTOPEN,
    parser: Some(parse_write),
    formatter: Some(format_write),
};

/// `AT+QMTOPEN`
pub static DESCRIPTOR: CommandDescriptor = CommandDescriptor {
    name: CMD_QMTOPEN,
    description: "Open a Network Connection for MQTT Client",
    test: None,
    read: Some(&READ),
    write: Some(&WRITE),
    execute: None,
};
