//! Shared helpers for command parsers and formatters.

use bg95_at::{payload, AtError, AtResult};

use crate::constants::MAX_CLIENT_IDX;

/// Get the payload of the first `+<name>:` line, failing if absent.
pub(crate) fn required_payload<'a>(raw: &'a str, name: &str) -> AtResult<&'a str> {
    payload(raw, name).ok_or_else(|| AtError::invalid_response(format!("missing +{}: line", name)))
}

/// Get a non-empty payload of the first `+<name>:` line.
pub(crate) fn non_empty_payload<'a>(raw: &'a str, name: &str) -> AtResult<&'a str> {
    let payload = required_payload(raw, name)?;
    if payload.is_empty() {
        return Err(AtError::invalid_response(format!("empty +{}: line", name)));
    }
    Ok(payload)
}

/// Reject an MQTT client index above the supported range.
pub(crate) fn check_client_idx(client_idx: u8) -> AtResult<()> {
    if client_idx > MAX_CLIENT_IDX {
        return Err(AtError::invalid_argument(format!(
            "client index {} outside 0-{}",
            client_idx, MAX_CLIENT_IDX
        )));
    }
    Ok(())
}

/// Reject an empty text parameter.
pub(crate) fn check_not_empty(field: &str, value: &str) -> AtResult<()> {
    if value.is_empty() {
        return Err(AtError::invalid_argument(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Check whether a client index reported by the modem is in range.
pub(crate) fn valid_client_idx(idx: &u8) -> bool {
    *idx <= MAX_CLIENT_IDX
}
