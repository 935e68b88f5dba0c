//! `AT+CPIN`: enter PIN / query SIM lock state.

use bg95_at::{
    code_enum, AtError, AtResult, CommandBuffer, CommandDescriptor, CommandKind, Operation,
    ResponsePolicy,
};

use crate::constants::{CMD_CPIN, TIMEOUT_CPIN};
use crate::parse::{check_not_empty, non_empty_payload};

code_enum! {
    /// SIM lock state reported by `AT+CPIN?`.
    pub enum CpinStatus {
        /// No password pending.
        Ready = 0 => "READY",
        /// Waiting for the SIM PIN.
        SimPin = 1 => "SIM PIN",
        /// Waiting for the SIM PUK.
        SimPuk = 2 => "SIM PUK",
        /// Waiting for the SIM PIN2.
        SimPin2 = 3 => "SIM PIN2",
        /// Waiting for the SIM PUK2.
        SimPuk2 = 4 => "SIM PUK2",
        /// Network personalization password.
        PhNetPin = 5 => "PH-NET PIN",
        /// Network personalization unblocking password.
        PhNetPuk = 6 => "PH-NET PUK",
        /// Network subset personalization password.
        PhNetsubPin = 7 => "PH-NETSUB PIN",
        /// Network subset personalization unblocking password.
        PhNetsubPuk = 8 => "PH-NETSUB PUK",
        /// Service provider personalization password.
        PhSpPin = 9 => "PH-SP PIN",
        /// Service provider personalization unblocking password.
        PhSpPuk = 10 => "PH-SP PUK",
        /// Corporate personalization password.
        PhCorpPin = 11 => "PH-CORP PIN",
        /// Corporate personalization unblocking password.
        PhCorpPuk = 12 => "PH-CORP PUK",
    }
}

impl CpinStatus {
    /// Check whether the SIM is unlocked.
    pub fn is_ready(self) -> bool {
        self == CpinStatus::Ready
    }
}

/// Parameters for `AT+CPIN=<pin>[,<new_pin>]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CpinWriteParams {
    /// PIN (or PUK when the SIM asks for one).
    pub pin: String,
    /// Replacement PIN, required when unlocking with a PUK.
    pub new_pin: Option<String>,
}

fn parse_read(raw: &str) -> AtResult<CpinStatus> {
    let code = non_empty_payload(raw, CMD_CPIN)?;
    CpinStatus::from_description(code)
        .ok_or_else(|| AtError::invalid_response(format!("unknown SIM status {:?}", code)))
}

fn format_write(params: &CpinWriteParams, buf: &mut CommandBuffer) -> AtResult<()> {
    check_not_empty("PIN", &params.pin)?;
    buf.push_quoted(&params.pin)?;

    if let Some(new_pin) = &params.new_pin {
        check_not_empty("new PIN", new_pin)?;
        buf.push_separator()?;
        buf.push_quoted(new_pin)?;
    }
    Ok(())
}

/// `AT+CPIN?`
pub static READ: Operation<(), CpinStatus> = Operation {
    command: CMD_CPIN,
    kind: CommandKind::Read,
    policy: ResponsePolicy::DataRequired,
    timeout: TIMEOUT_CPIN,
    parser: Some(parse_read),
    formatter: None,
};

/// `AT+CPIN=<pin>[,<new_pin>]`
pub static WRITE: Operation<CpinWriteParams, ()> = Operation {
    command: CMD_CPIN,
    kind: CommandKind::Write,
    policy: ResponsePolicy::SimpleOnly,
    timeout: TIMEOUT_CPIN,
    parser: None,
    formatter: Some(format_write),
};

/// `AT+CPIN`
pub static DESCRIPTOR: CommandDescriptor = CommandDescriptor {
    name: CMD_CPIN,
    description: "Enter PIN",
    test: None,
    read: Some(&READ),
    write: Some(&WRITE),
    execute: None,
};

#[cfg(test)]
mod tests {
    use super::*;
    use bg95_at::{dispatch_format, dispatch_parse, enum_to_str, str_to_enum, UNKNOWN};

    #[test]
    fn test_status_strings() {
        assert_eq!(enum_to_str(0, CpinStatus::TABLE), "READY");
        assert_eq!(CpinStatus::SimPin.description(), "SIM PIN");
        assert_eq!(enum_to_str(99, CpinStatus::TABLE), UNKNOWN);
        assert_eq!(str_to_enum("READY", CpinStatus::TABLE), Some(0));
        assert_eq!(str_to_enum("INVALID_STATUS", CpinStatus::TABLE), None);
    }

    #[test]
    fn test_read_parser() {
        assert_eq!(parse_read("\r\n+CPIN: READY\r\nOK\r\n").unwrap(), CpinStatus::Ready);
        assert_eq!(parse_read("\r\n+CPIN: SIM PIN\r\nOK\r\n").unwrap(), CpinStatus::SimPin);
        assert!(matches!(
            parse_read("\r\n+CPIN: INVALID_STATUS\r\nOK\r\n"),
            Err(AtError::InvalidResponse(_))
        ));
        assert!(matches!(parse_read("\r\n+CPIN:\r\nOK\r\n"), Err(AtError::InvalidResponse(_))));
    }

    #[test]
    fn test_read_dispatch_error() {
        assert!(matches!(
            dispatch_parse(&READ, b"\r\nERROR\r\n"),
            Err(AtError::CommandFailed(_))
        ));
    }

    #[test]
    fn test_write_formatter() {
        let mut buf = CommandBuffer::with_capacity(32);

        let params = CpinWriteParams { pin: "1234".into(), new_pin: None };
        dispatch_format(&WRITE, &params, &mut buf).unwrap();
        assert_eq!(buf.as_str(), "=\"1234\"");

        let params = CpinWriteParams { pin: "1234".into(), new_pin: Some("5678".into()) };
        dispatch_format(&WRITE, &params, &mut buf).unwrap();
        assert_eq!(buf.as_str(), "=\"1234\",\"5678\"");
    }

    #[test]
    fn test_write_formatter_errors() {
        let mut small = CommandBuffer::with_capacity(4);
        let params = CpinWriteParams { pin: "1234".into(), new_pin: None };
        assert!(matches!(
            dispatch_format(&WRITE, &params, &mut small),
            Err(AtError::InvalidSize { .. })
        ));
        assert!(small.is_empty());

        let mut buf = CommandBuffer::with_capacity(32);
        let empty = CpinWriteParams::default();
        assert!(matches!(
            dispatch_format(&WRITE, &empty, &mut buf),
            Err(AtError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_descriptor() {
        assert_eq!(DESCRIPTOR.name, "CPIN");
        assert!(!DESCRIPTOR.supports(CommandKind::Test));
        assert!(DESCRIPTOR.read.is_some_and(|op| op.has_parser() && !op.has_formatter()));
        assert!(DESCRIPTOR.write.is_some_and(|op| !op.has_parser() && op.has_formatter()));
    }
}
