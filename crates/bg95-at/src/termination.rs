//! Termination detection: has enough of a response arrived to stop reading?

use crate::commands::{CommandDescriptor, CommandKind, ResponsePolicy};
use crate::responses::{data_line_state, validate, DataLineState};

/// Decide whether `raw` holds a complete response for `kind` of `descriptor`.
///
/// Pure; holds no state between calls. Returns `false` for an empty buffer
/// or an unsupported kind.
///
/// | policy        | needs final code | data started, incomplete | data complete | no data |
/// |---------------|------------------|--------------------------|---------------|---------|
/// | `SimpleOnly`  | yes              | ignored                  | ignored       | ignored |
/// | `DataRequired`| yes              | `false`                  | `true`        | `false` |
/// | `DataOptional`| yes              | `false`                  | `true`        | `true`  |
///
/// A failure code (`ERROR`, `+CME ERROR`) terminates under every policy:
/// the modem sends no data line after a failure.
///
/// Only `+<NAME>:` lines of the command itself count as data, so an
/// unrelated URC neither satisfies nor blocks termination.
pub fn has_terminated(raw: &[u8], descriptor: &CommandDescriptor, kind: CommandKind) -> bool {
    if raw.is_empty() {
        return false;
    }

    let Some(op) = descriptor.operation(kind) else {
        return false;
    };

    terminated_under(raw, descriptor.name, op.policy())
}

/// Apply the termination table for an explicit policy.
pub fn terminated_under(raw: &[u8], name: &str, policy: ResponsePolicy) -> bool {
    let basic = match validate(raw) {
        Ok(basic) => basic,
        Err(_) => return false,
    };
    if !basic.has_basic_response {
        return false;
    }
    if !basic.basic_response_is_ok {
        return true;
    }

    match policy {
        ResponsePolicy::SimpleOnly => true,
        ResponsePolicy::DataRequired => {
            matches!(data_line_state(raw, Some(name)), DataLineState::Complete(_))
        }
        ResponsePolicy::DataOptional => {
            !matches!(data_line_state(raw, Some(name)), DataLineState::Incomplete)
        }
    }
}
