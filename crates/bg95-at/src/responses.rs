//! Basic response validation and data segment classification.
//!
//! A modem response is a sequence of CRLF-terminated lines made of:
//! - A final result code: `OK`, `ERROR` or `+CME ERROR: <code>`
//! - Zero or more data lines: `+<NAME>: <fields>`
//! - Echoes, blank lines and unrelated URCs, which are ignored
//!
//! Data lines may arrive before or after the final result code. Only
//! complete lines (with their terminator) are ever reported.

use crate::codec::{lines, Line};
use crate::error::{AtError, AtResult, ModemError};

/// Final result code for success.
pub const OK_MARKER: &[u8] = b"OK";

/// Final result code for failure.
pub const ERROR_MARKER: &[u8] = b"ERROR";

/// Prefix of the extended failure result code.
pub const CME_ERROR_PREFIX: &[u8] = b"+CME ERROR:";

/// Outcome of scanning for a final result code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicResponse {
    /// A complete `OK`, `ERROR` or `+CME ERROR:` line is present.
    pub has_basic_response: bool,
    /// The first complete final result code is `OK`.
    pub basic_response_is_ok: bool,
    /// Failure detail when the final result code is not `OK`.
    pub failure: Option<ModemError>,
}

/// Where the first data line for a command stands in a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataLineState<'a> {
    /// No data line, complete or partial.
    Absent,
    /// A data line has started but its terminator has not arrived.
    Incomplete,
    /// The first data line, including its terminator.
    Complete(&'a [u8]),
}

impl<'a> DataLineState<'a> {
    /// Get the complete data line span, if any.
    pub fn span(&self) -> Option<&'a [u8]> {
        match self {
            DataLineState::Complete(span) => Some(span),
            _ => None,
        }
    }
}

/// Classify a line's text as a final result code.
///
/// Returns `Some(Ok(()))` for `OK`, `Some(Err(_))` for a failure code, and
/// `None` for anything else.
pub fn basic_marker(text: &[u8]) -> Option<Result<(), ModemError>> {
    if text == OK_MARKER {
        return Some(Ok(()));
    }

    if text == ERROR_MARKER {
        return Some(Err(ModemError::Error));
    }

    if let Some(rest) = text.strip_prefix(CME_ERROR_PREFIX) {
        let detail = String::from_utf8_lossy(rest).trim().to_string();
        if detail.is_empty() {
            return None;
        }
        return Some(Err(match detail.parse::<u16>() {
            Ok(code) => ModemError::Cme(code),
            Err(_) => ModemError::CmeVerbose(detail),
        }));
    }

    None
}

/// Scan a raw buffer for a complete final result code.
///
/// Absence of a result code is not an error; an empty buffer is.
pub fn validate(raw: &[u8]) -> AtResult<BasicResponse> {
    if raw.is_empty() {
        return Err(AtError::invalid_argument("empty response buffer"));
    }

    let marker = lines(raw)
        .filter(|line| line.complete)
        .find_map(|line| basic_marker(line.text));

    Ok(match marker {
        Some(Ok(())) => BasicResponse {
            has_basic_response: true,
            basic_response_is_ok: true,
            failure: None,
        },
        Some(Err(failure)) => BasicResponse {
            has_basic_response: true,
            basic_response_is_ok: false,
            failure: Some(failure),
        },
        None => BasicResponse::default(),
    })
}

/// Build the `+<NAME>:` prefix for a command's data lines.
pub fn data_prefix(name: &str) -> String {
    format!("+{}:", name)
}

/// Check whether a line can be a data line.
///
/// With a prefix, only lines for that command count. Without one, any `+X:`
/// line that is not an extended failure code counts.
fn is_data_line(line: &Line, prefix: Option<&[u8]>) -> bool {
    match prefix {
        Some(prefix) => line.starts_with(prefix),
        None => {
            line.starts_with(b"+")
                && !line.starts_with(CME_ERROR_PREFIX)
                && line.text.contains(&b':')
        }
    }
}

/// Check whether a partial trailing line may still become a data line.
fn may_become_data_line(line: &Line, prefix: Option<&[u8]>) -> bool {
    if line.text.is_empty() {
        return false;
    }
    match prefix {
        Some(prefix) => line.starts_with(prefix) || prefix.starts_with(line.text),
        None => line.starts_with(b"+") && !line.starts_with(CME_ERROR_PREFIX),
    }
}

/// Locate the first data line in a raw buffer.
///
/// `name` restricts the search to `+<name>:` lines; `None` accepts any
/// data line.
pub fn data_line_state<'a>(raw: &'a [u8], name: Option<&str>) -> DataLineState<'a> {
    let prefix = name.map(data_prefix);
    let prefix = prefix.as_deref().map(str::as_bytes);

    for line in lines(raw) {
        if line.complete {
            if is_data_line(&line, prefix) {
                return DataLineState::Complete(line.span);
            }
        } else if may_become_data_line(&line, prefix) {
            return DataLineState::Incomplete;
        }
    }

    DataLineState::Absent
}

/// Basic response plus the first data line, borrowed from the raw buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBaseResponse<'a> {
    /// A complete final result code is present.
    pub has_basic_response: bool,
    /// The final result code is `OK`.
    pub basic_response_is_ok: bool,
    /// Failure detail when the final result code is not `OK`.
    pub failure: Option<ModemError>,
    /// First complete data line, including its terminator.
    pub data_response: Option<&'a [u8]>,
}

impl<'a> ParsedBaseResponse<'a> {
    /// Parse a raw buffer, reporting the first complete `+X:` data line of
    /// any command.
    pub fn parse(raw: &'a [u8]) -> AtResult<Self> {
        Self::scan(raw, None)
    }

    /// Parse a raw buffer, reporting only `+<name>:` data lines.
    pub fn parse_for(raw: &'a [u8], name: &str) -> AtResult<Self> {
        Self::scan(raw, Some(name))
    }

    fn scan(raw: &'a [u8], name: Option<&str>) -> AtResult<Self> {
        let basic = validate(raw)?;
        let data_response = data_line_state(raw, name).span();

        Ok(ParsedBaseResponse {
            has_basic_response: basic.has_basic_response,
            basic_response_is_ok: basic.basic_response_is_ok,
            failure: basic.failure,
            data_response,
        })
    }

    /// Check whether a complete data line was found.
    pub fn has_data_response(&self) -> bool {
        self.data_response.is_some()
    }

    /// Length of the data line in bytes (0 when absent).
    pub fn data_response_len(&self) -> usize {
        self.data_response.map_or(0, <[u8]>::len)
    }

    /// Data line as text, without its terminator.
    pub fn data_text(&self) -> Option<String> {
        self.data_response.map(|span| {
            let text = span.strip_suffix(b"\r\n").unwrap_or(span);
            String::from_utf8_lossy(text).to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Basic response validation
    // ========================================================================

    #[test]
    fn test_validate_ok() {
        let basic = validate(b"\r\nOK\r\n").unwrap();
        assert!(basic.has_basic_response);
        assert!(basic.basic_response_is_ok);
        assert_eq!(basic.failure, None);
    }

    #[test]
    fn test_validate_error() {
        let basic = validate(b"\r\nERROR\r\n").unwrap();
        assert!(basic.has_basic_response);
        assert!(!basic.basic_response_is_ok);
        assert_eq!(basic.failure, Some(ModemError::Error));
    }

    #[test]
    fn test_validate_cme_error() {
        let basic = validate(b"\r\n+CME ERROR: 123\r\n").unwrap();
        assert!(basic.has_basic_response);
        assert!(!basic.basic_response_is_ok);
        assert_eq!(basic.failure, Some(ModemError::Cme(123)));

        let verbose = validate(b"\r\n+CME ERROR: SIM not inserted\r\n").unwrap();
        assert_eq!(
            verbose.failure,
            Some(ModemError::CmeVerbose("SIM not inserted".to_string()))
        );
    }

    #[test]
    fn test_validate_requires_terminator() {
        assert!(!validate(b"\r\nOK").unwrap().has_basic_response);
        assert!(!validate(b"\r\nERROR").unwrap().has_basic_response);
        assert!(!validate(b"\r\n+CME ERROR: 10").unwrap().has_basic_response);
    }

    #[test]
    fn test_validate_empty_is_invalid_argument() {
        assert!(matches!(validate(b""), Err(AtError::InvalidArgument(_))));
    }

    #[test]
    fn test_validate_ignores_echo_and_text() {
        let basic = validate(b"AT+CSQ\r\r\n+CSQ: 24,0\r\n").unwrap();
        assert!(!basic.has_basic_response);

        // OK embedded in a longer line is not a result code
        let basic = validate(b"\r\n+QMTRECV: 0,1,\"t\",\"OK\"\r\n").unwrap();
        assert!(!basic.has_basic_response);
    }

    // ========================================================================
    // Data segment classification
    // ========================================================================

    #[test]
    fn test_parse_ok_without_data() {
        let parsed = ParsedBaseResponse::parse(b"\r\nOK\r\n").unwrap();
        assert!(parsed.has_basic_response);
        assert!(parsed.basic_response_is_ok);
        assert!(!parsed.has_data_response());
        assert_eq!(parsed.data_response_len(), 0);
    }

    #[test]
    fn test_parse_data_after_ok() {
        let raw = b"\r\nOK\r\n+QMTOPEN: 0,0\r\n";
        let parsed = ParsedBaseResponse::parse(raw).unwrap();
        assert!(parsed.basic_response_is_ok);
        assert_eq!(parsed.data_response, Some(&b"+QMTOPEN: 0,0\r\n"[..]));
        assert_eq!(parsed.data_response_len(), 15);
    }

    #[test]
    fn test_parse_data_before_ok() {
        let raw = b"\r\n+QMTOPEN: 0,\"iot-as-mqtt.cn-shanghai.aliyuncs.com\",1883\r\nOK\r\n";
        let parsed = ParsedBaseResponse::parse(raw).unwrap();
        assert!(parsed.basic_response_is_ok);
        let text = parsed.data_text().unwrap();
        assert!(text.contains("iot-as-mqtt.cn-shanghai.aliyuncs.com"));
    }

    #[test]
    fn test_parse_partial_data_not_reported() {
        let parsed = ParsedBaseResponse::parse(b"\r\nOK\r\n+QMTCONN: 0,0,0").unwrap();
        assert!(parsed.basic_response_is_ok);
        assert!(!parsed.has_data_response());
    }

    #[test]
    fn test_parse_cme_error_is_not_data() {
        let parsed = ParsedBaseResponse::parse(b"\r\n+CME ERROR: 10\r\n").unwrap();
        assert!(parsed.has_basic_response);
        assert!(!parsed.has_data_response());
    }

    #[test]
    fn test_parse_for_skips_other_commands() {
        let raw = b"\r\n+QMTSTAT: 0,1\r\nOK\r\n+QMTCONN: 0,0,0\r\n";
        let parsed = ParsedBaseResponse::parse_for(raw, "QMTCONN").unwrap();
        assert_eq!(parsed.data_response, Some(&b"+QMTCONN: 0,0,0\r\n"[..]));

        let generic = ParsedBaseResponse::parse(raw).unwrap();
        assert_eq!(generic.data_response, Some(&b"+QMTSTAT: 0,1\r\n"[..]));
    }

    #[test]
    fn test_data_line_state_partial_prefix() {
        // A partial prefix may still turn into the awaited data line
        assert_eq!(data_line_state(b"OK\r\n+QMTO", Some("QMTOPEN")), DataLineState::Incomplete);
        assert_eq!(data_line_state(b"OK\r\n+QMTS", Some("QMTOPEN")), DataLineState::Absent);
        assert_eq!(data_line_state(b"OK\r\n+", None), DataLineState::Incomplete);
        assert_eq!(data_line_state(b"OK\r\n", Some("QMTOPEN")), DataLineState::Absent);
    }
}
