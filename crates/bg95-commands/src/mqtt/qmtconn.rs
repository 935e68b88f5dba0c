//! `AT+QMTCONN`: connect a client to the MQTT server.

use bg95_at::{
    code_enum, parse_number, parse_number_in, payload, split_fields, AtError, AtResult,
    CodeRange, CommandBuffer, CommandDescriptor, CommandKind, Operation, ResponsePolicy,
};

use super::{parse_client_range, PacketResult};
use crate::constants::{CMD_QMTCONN, TIMEOUT_QMTCONN};
use crate::parse::{check_client_idx, check_not_empty, non_empty_payload, valid_client_idx};

code_enum! {
    /// MQTT client state reported by `AT+QMTCONN?`.
    pub enum ConnectionState {
        Initializing = 1 => "MQTT is initializing",
        Connecting = 2 => "MQTT is connecting",
        Connected = 3 => "MQTT is connected",
        Disconnecting = 4 => "MQTT is disconnecting",
    }
}

code_enum! {
    /// CONNACK return code.
    pub enum ConnectReturnCode {
        Accepted = 0 => "Connection Accepted",
        UnacceptableProtocol = 1 => "Connection Refused: Unacceptable Protocol Version",
        IdentifierRejected = 2 => "Connection Refused: Identifier Rejected",
        ServerUnavailable = 3 => "Connection Refused: Server Unavailable",
        BadCredentials = 4 => "Connection Refused: Bad Username or Password",
        NotAuthorized = 5 => "Connection Refused: Not Authorized",
    }
}

/// Client state from `AT+QMTCONN?`; fields are absent when out of range or
/// when no client is connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientState {
    pub client_idx: Option<u8>,
    pub state: Option<ConnectionState>,
}

impl ClientState {
    /// Check whether `client_idx` is connected to the broker.
    pub fn is_connected(&self, client_idx: u8) -> bool {
        self.client_idx == Some(client_idx) && self.state == Some(ConnectionState::Connected)
    }
}

/// Parameters for `AT+QMTCONN=<client_idx>,"<client_id>"[,"<user>"[,"<pass>"]]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectParams {
    pub client_idx: u8,
    pub client_id: String,
    pub username: Option<String>,
    /// Only valid together with `username`.
    pub password: Option<String>,
}

/// Final report of `AT+QMTCONN=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectReport {
    pub client_idx: Option<u8>,
    pub result: Option<PacketResult>,
    pub ret_code: Option<ConnectReturnCode>,
}

impl ConnectReport {
    /// Check whether the broker accepted the connection.
    pub fn is_accepted(&self) -> bool {
        self.result == Some(PacketResult::Success)
            && self.ret_code == Some(ConnectReturnCode::Accepted)
    }
}

fn parse_test(raw: &str) -> AtResult<CodeRange> {
    parse_client_range(raw, CMD_QMTCONN)
}

fn parse_read(raw: &str) -> AtResult<ClientState> {
    if payload(raw, CMD_QMTCONN).is_none() {
        return Ok(ClientState::default());
    }
    let payload = non_empty_payload(raw, CMD_QMTCONN)?;

    let fields = split_fields(payload);
    Ok(ClientState {
        client_idx: parse_number_in(fields.first().copied(), valid_client_idx),
        state: fields
            .get(1)
            .and_then(|f| parse_number(f))
            .and_then(ConnectionState::from_code),
    })
}

fn parse_write(raw: &str) -> AtResult<ConnectReport> {
    if payload(raw, CMD_QMTCONN).is_none() {
        return Ok(ConnectReport::default());
    }
    let payload = non_empty_payload(raw, CMD_QMTCONN)?;

    let fields = split_fields(payload);
    let code = |i: usize| fields.get(i).and_then(|f| parse_number::<i32>(f));
    Ok(ConnectReport {
        client_idx: parse_number_in(fields.first().copied(), valid_client_idx),
        result: code(1).and_then(PacketResult::from_code),
        ret_code: code(2).and_then(ConnectReturnCode::from_code),
    })
}

fn format_write(params: &ConnectParams, buf: &mut CommandBuffer) -> AtResult<()> {
    check_client_idx(params.client_idx)?;
    check_not_empty("client id", &params.client_id)?;
    if params.password.is_some() && params.username.is_none() {
        return Err(AtError::invalid_argument("password given without a username"));
    }

    buf.push_value(params.client_idx)?;
    buf.push_separator()?;
    buf.push_quoted(&params.client_id)?;
    for credential in [&params.username, &params.password].into_iter().flatten() {
        buf.push_separator()?;
        buf.push_quoted(credential)?;
    }
    Ok(())
}

/// `AT+QMTCONN=?`
pub static TEST: Operation<(), CodeRange> = Operation {
    command: CMD_QMTCONN,
    kind: CommandKind::Test,
    policy: ResponsePolicy::DataRequired,
    timeout: TIMEOUT_QMTCONN,
    parser: Some(parse_test),
    formatter: None,
};

/// `AT+QMTCONN?`
pub static READ: Operation<(), ClientState> = Operation {
    command: CMD_QMTCONN,
    kind: CommandKind::Read,
    policy: ResponsePolicy::DataOptional,
    timeout: TIMEOUT_QMTCONN,
    parser: Some(parse_read),
    formatter: None,
};

/// `AT+QMTCONN=<client_idx>,"<client_id>"[,...]`
pub static WRITE: Operation<ConnectParams, ConnectReport> = Operation {
    command: CMD_QMTCONN,
    kind: CommandKind::Write,
    policy: ResponsePolicy::DataRequired,
    timeout: TIMEOUT_QMTCONN,
    parser: Some(parse_write),
    formatter: Some(format_write),
};

/// `AT+QMTCONN`
pub static DESCRIPTOR: CommandDescriptor = CommandDescriptor {
    name: CMD_QMTCONN,
    description: "Connect a Client to MQTT Server",
    test: Some(&TEST),
    read: Some(&READ),
    write: Some(&WRITE),
    execute: None,
};
