//! `AT+CGACT`: activate or deactivate a PDP context.

use bg95_at::{
    code_enum, parse_number, parse_number_in, payloads, split_fields, AtError, AtResult,
    CommandBuffer, CommandDescriptor, CommandKind, Operation, ResponsePolicy,
};

use crate::constants::{CMD_CGACT, MAX_CID, MAX_PDP_CONTEXTS, MIN_CID, TIMEOUT_CGACT};

code_enum! {
    /// PDP context activation state.
    pub enum PdpState {
        Deactivated = 0 => "Deactivated",
        Activated = 1 => "Activated",
    }
}

/// One `+CGACT: <cid>,<state>` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextState {
    pub cid: u8,
    pub state: PdpState,
}

/// Parameters for `AT+CGACT=<state>,<cid>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CgactWriteParams {
    pub state: PdpState,
    pub cid: u8,
}

/// Find the state of `cid` in an `AT+CGACT?` listing.
pub fn state_of(contexts: &[ContextState], cid: u8) -> Option<PdpState> {
    contexts.iter().find(|c| c.cid == cid).map(|c| c.state)
}

fn valid_cid(cid: &u8) -> bool {
    (MIN_CID..=MAX_CID).contains(cid)
}

fn parse_read(raw: &str) -> AtResult<Vec<ContextState>> {
    let mut contexts = Vec::new();

    for payload in payloads(raw, CMD_CGACT).into_iter().filter(|p| !p.is_empty()) {
        let fields = split_fields(payload);
        let cid = parse_number_in(fields.first().copied(), valid_cid);
        let state = fields
            .get(1)
            .and_then(|f| parse_number::<i32>(f))
            .and_then(PdpState::from_code);

        match (cid, state) {
            (Some(cid), Some(state)) => contexts.push(ContextState { cid, state }),
            _ => {
                return Err(AtError::invalid_response(format!("malformed +CGACT: {:?}", payload)));
            }
        }
        if contexts.len() == MAX_PDP_CONTEXTS {
            break;
        }
    }

    Ok(contexts)
}

fn format_write(params: &CgactWriteParams, buf: &mut CommandBuffer) -> AtResult<()> {
    if !valid_cid(&params.cid) {
        return Err(AtError::invalid_argument(format!(
            "cid {} outside {}-{}",
            params.cid, MIN_CID, MAX_CID
        )));
    }
    buf.push_value(params.state.code())?;
    buf.push_separator()?;
    buf.push_value(params.cid)
}

/// `AT+CGACT?`
pub static READ: Operation<(), Vec<ContextState>> = Operation {
    command: CMD_CGACT,
    kind: CommandKind::Read,
    policy: ResponsePolicy::DataOptional,
    timeout: TIMEOUT_CGACT,
    parser: Some(parse_read),
    formatter: None,
};

/// `AT+CGACT=<state>,<cid>`
pub static WRITE: Operation<CgactWriteParams, ()> = Operation {
    command: CMD_CGACT,
    kind: CommandKind::Write,
    policy: ResponsePolicy::SimpleOnly,
    timeout: TIMEOUT_CGACT,
    parser: None,
    formatter: Some(format_write),
};

/// `AT+CGACT`
pub static DESCRIPTOR: CommandDescriptor = CommandDescriptor {
    name: CMD_CGACT,
    description: "PDP Context Activate or Deactivate",
    test: None,
    read: Some(&READ),
    write: Some(&WRITE),
    execute: None,
};

#[cfg(test)]
mod tests {
    use super::*;
    use bg95_at::{dispatch_format, dispatch_parse};

    #[test]
    fn test_read_parser() {
        let raw = "\r\n+CGACT: 1,1\r\n+CGACT: 2,0\r\n\r\nOK\r\n";
        let contexts = parse_read(raw).unwrap();
        assert_eq!(
            contexts,
            vec![
                ContextState { cid: 1, state: PdpState::Activated },
                ContextState { cid: 2, state: PdpState::Deactivated },
            ]
        );
        assert_eq!(state_of(&contexts, 1), Some(PdpState::Activated));
        assert_eq!(state_of(&contexts, 3), None);
    }

    #[test]
    fn test_read_parser_malformed() {
        assert!(matches!(
            parse_read("\r\n+CGACT: 1,5\r\nOK\r\n"),
            Err(AtError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_read("\r\n+CGACT: 16,1\r\nOK\r\n"),
            Err(AtError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_dispatch_without_contexts() {
        assert_eq!(dispatch_parse(&READ, b"\r\nOK\r\n").unwrap(), None);
    }

    #[test]
    fn test_write_formatter() {
        let mut buf = CommandBuffer::default();
        let params = CgactWriteParams { state: PdpState::Activated, cid: 1 };
        dispatch_format(&WRITE, &params, &mut buf).unwrap();
        assert_eq!(buf.as_str(), "=1,1");

        let params = CgactWriteParams { state: PdpState::Activated, cid: 0 };
        assert!(matches!(
            dispatch_format(&WRITE, &params, &mut buf),
            Err(AtError::InvalidArgument(_))
        ));
    }
}
