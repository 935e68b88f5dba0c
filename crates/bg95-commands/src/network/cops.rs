//! `AT+COPS`: operator selection.

use bg95_at::{
    code_enum, parse_number, split_fields, unquote, AtError, AtResult, CommandBuffer,
    CommandDescriptor, CommandKind, Operation, ResponsePolicy,
};

use crate::constants::{CMD_COPS, TIMEOUT_COPS};
use crate::parse::non_empty_payload;

code_enum! {
    /// Selection mode.
    pub enum CopsMode {
        Automatic = 0 => "Automatic mode",
        Manual = 1 => "Manual operator selection",
        Deregister = 2 => "Manual deregister from network",
        SetFormatOnly = 3 => "Set only format",
        ManualAutomatic = 4 => "Manual/automatic selection",
    }
}

code_enum! {
    /// Operator name format.
    pub enum CopsFormat {
        LongAlpha = 0 => "Long format alphanumeric",
        ShortAlpha = 1 => "Short format alphanumeric",
        Numeric = 2 => "Numeric",
    }
}

code_enum! {
    /// Radio access technology.
    pub enum CopsAct {
        Gsm = 0 => "GSM",
        Emtc = 8 => "eMTC",
        NbIot = 9 => "NB-IoT",
    }
}

code_enum! {
    /// Operator availability in a network scan.
    pub enum CopsStat {
        Unknown = 0 => "Unknown",
        Available = 1 => "Operator available",
        Current = 2 => "Current operator",
        Forbidden = 3 => "Operator forbidden",
    }
}

/// Current selection reported by `AT+COPS?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorInfo {
    pub mode: CopsMode,
    /// Absent when not reported or not a known format.
    pub format: Option<CopsFormat>,
    /// Operator name in `format`.
    pub operator: Option<String>,
    /// Absent when not reported or not a known technology.
    pub act: Option<CopsAct>,
}

/// Parameters for `AT+COPS=<mode>[,<format>[,"<oper>"[,<act>]]]`.
///
/// Trailing fields are emitted only up to the last one set; an operator
/// needs a format and an access technology needs an operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopsWriteParams {
    pub mode: CopsMode,
    pub format: Option<CopsFormat>,
    pub operator: Option<String>,
    pub act: Option<CopsAct>,
}

impl CopsWriteParams {
    /// Automatic operator selection.
    pub fn automatic() -> Self {
        CopsWriteParams {
            mode: CopsMode::Automatic,
            format: None,
            operator: None,
            act: None,
        }
    }
}

fn parse_read(raw: &str) -> AtResult<OperatorInfo> {
    let payload = non_empty_payload(raw, CMD_COPS)?;
    let fields = split_fields(payload);

    let mode = fields
        .first()
        .and_then(|f| parse_number::<i32>(f))
        .and_then(CopsMode::from_code)
        .ok_or_else(|| AtError::invalid_response(format!("invalid +COPS mode in {:?}", payload)))?;

    let format = fields
        .get(1)
        .and_then(|f| parse_number::<i32>(f))
        .and_then(CopsFormat::from_code);
    let operator = fields
        .get(2)
        .map(|f| unquote(f))
        .filter(|name| !name.is_empty())
        .map(str::to_string);
    let act = fields
        .get(3)
        .and_then(|f| parse_number::<i32>(f))
        .and_then(CopsAct::from_code);

    Ok(OperatorInfo {
        mode,
        format,
        operator,
        act,
    })
}

fn format_write(params: &CopsWriteParams, buf: &mut CommandBuffer) -> AtResult<()> {
    if params.operator.is_some() && params.format.is_none() {
        return Err(AtError::invalid_argument("operator given without a format"));
    }
    if params.act.is_some() && params.operator.is_none() {
        return Err(AtError::invalid_argument("access technology given without an operator"));
    }

    buf.push_value(params.mode.code())?;
    if let Some(format) = params.format {
        buf.push_separator()?;
        buf.push_value(format.code())?;
    }
    if let Some(operator) = &params.operator {
        buf.push_separator()?;
        buf.push_quoted(operator)?;
    }
    if let Some(act) = params.act {
        buf.push_separator()?;
        buf.push_value(act.code())?;
    }
    Ok(())
}

/// `AT+COPS?`
pub static READ: Operation<(), OperatorInfo> = Operation {
    command: CMD_COPS,
    kind: CommandKind::Read,
    policy: ResponsePolicy::DataRequired,
    timeout: TIMEOUT_COPS,
    parser: Some(parse_read),
    formatter: None,
};

/// `AT+COPS=<mode>[,...]`
pub static WRITE: Operation<CopsWriteParams, ()> = Operation {
    command: CMD_COPS,
    kind: CommandKind::Write,
    policy: ResponsePolicy::SimpleOnly,
    timeout: TIMEOUT_COPS,
    parser: None,
    formatter: Some(format_write),
};

/// `AT+COPS`
pub static DESCRIPTOR: CommandDescriptor = CommandDescriptor {
    name: CMD_COPS,
    description: "Operator Selection",
    test: None,
    read: Some(&READ),
    write: Some(&WRITE),
    execute: None,
};
