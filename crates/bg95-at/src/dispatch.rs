//! Command descriptor dispatch: routes a terminated response to its parser
//! and parameters to their formatter, under the operation's response policy.

use log::{debug, trace};

use crate::commands::{Operation, Parser, ResponsePolicy};
use crate::error::{AtError, AtResult, ModemError};
use crate::format::CommandBuffer;
use crate::responses::ParsedBaseResponse;

/// Parse a terminated response for an operation.
///
/// Returns `Ok(None)` when the policy yields no structured result (simple
/// operations, or optional data that did not arrive) and `Ok(Some(_))` with
/// the parser's output otherwise. The parser always receives the full raw
/// buffer so that it can collect repeated data lines.
pub fn dispatch_parse<P: 'static, R: 'static>(
    op: &Operation<P, R>,
    raw: &[u8],
) -> AtResult<Option<R>> {
    let parsed = ParsedBaseResponse::parse_for(raw, op.command)?;

    if !parsed.has_basic_response {
        return Err(AtError::invalid_response(format!(
            "AT+{} response has no final result code",
            op.command
        )));
    }

    if !parsed.basic_response_is_ok {
        let failure = parsed.failure.unwrap_or(ModemError::Error);
        debug!("AT+{} {} failed: {}", op.command, op.kind, failure);
        return Err(AtError::CommandFailed(failure));
    }

    match op.policy {
        ResponsePolicy::SimpleOnly => Ok(None),
        ResponsePolicy::DataRequired => {
            if !parsed.has_data_response() {
                return Err(AtError::invalid_response(format!(
                    "AT+{} {} response is missing its +{}: line",
                    op.command, op.kind, op.command
                )));
            }
            let parser = op.parser.ok_or_else(|| {
                AtError::InvalidState(format!(
                    "AT+{} {} requires data but has no parser",
                    op.command, op.kind
                ))
            })?;
            run_parser(op, parser, raw).map(Some)
        }
        ResponsePolicy::DataOptional => {
            if !parsed.has_data_response() {
                trace!("AT+{} {} returned no data", op.command, op.kind);
                return Ok(None);
            }
            let parser = op.parser.ok_or(AtError::NotSupported {
                command: op.command,
                kind: op.kind,
            })?;
            run_parser(op, parser, raw).map(Some)
        }
    }
}

fn run_parser<P: 'static, R: 'static>(
    op: &Operation<P, R>,
    parser: Parser<R>,
    raw: &[u8],
) -> AtResult<R> {
    let text = std::str::from_utf8(raw).map_err(|e| {
        AtError::invalid_response(format!("AT+{} response is not valid UTF-8: {}", op.command, e))
    })?;
    parser(text)
}

/// Format an operation's parameters into `buf`.
///
/// On success the buffer holds the full command suffix (`=<params>`) and
/// its length is returned. On any error the buffer is left empty so that a
/// truncated command can never be sent.
pub fn dispatch_format<P: 'static, R: 'static>(
    op: &Operation<P, R>,
    params: &P,
    buf: &mut CommandBuffer,
) -> AtResult<usize> {
    if buf.capacity() == 0 {
        return Err(AtError::invalid_argument("command buffer has zero capacity"));
    }

    let formatter = op.formatter.ok_or(AtError::NotSupported {
        command: op.command,
        kind: op.kind,
    })?;

    buf.clear();
    let result = buf
        .push_str(op.kind.suffix())
        .and_then(|()| formatter(params, buf));

    match result {
        Ok(()) => {
            trace!("AT+{}{}", op.command, buf.as_str());
            Ok(buf.len())
        }
        Err(e) => {
            buf.clear();
            Err(e)
        }
    }
}
