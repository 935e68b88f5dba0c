//! Line framing for AT command traffic.
//!
//! Every line the modem emits is terminated by `\r\n`. A line is only
//! *complete* once its full terminator has arrived; anything after the last
//! terminator is a partial line that may still grow.

/// Line terminator used in both directions.
pub const CRLF: &[u8] = b"\r\n";

/// Prefix of every extended command sent to the modem.
pub const COMMAND_PREFIX: &str = "AT+";

/// A single line inside a raw response buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// Line text without the terminator.
    pub text: &'a [u8],
    /// Line bytes including the terminator when complete.
    pub span: &'a [u8],
    /// Byte offset of the line start in the raw buffer.
    pub offset: usize,
    /// Whether the line ended with `\r\n`.
    pub complete: bool,
}

impl<'a> Line<'a> {
    /// Check whether the line text starts with the given prefix.
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.text.starts_with(prefix)
    }

    /// Check whether the line is empty (a bare terminator).
    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

/// Iterator over the lines of a raw buffer.
///
/// The final element may be incomplete; a buffer ending in `\r\n` yields no
/// trailing empty line.
#[derive(Debug, Clone)]
pub struct Lines<'a> {
    raw: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for Lines<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Line<'a>> {
        if self.pos >= self.raw.len() {
            return None;
        }

        let start = self.pos;
        let rest = &self.raw[start..];

        let line = match rest.iter().position(|&b| b == b'\n') {
            Some(lf) => {
                let end = start + lf + 1;
                let complete = lf > 0 && rest[lf - 1] == b'\r';
                let text_end = if complete { start + lf - 1 } else { start + lf };
                self.pos = end;
                Line {
                    text: &self.raw[start..text_end],
                    span: &self.raw[start..end],
                    offset: start,
                    complete,
                }
            }
            None => {
                self.pos = self.raw.len();
                Line {
                    text: rest,
                    span: rest,
                    offset: start,
                    complete: false,
                }
            }
        };

        Some(line)
    }
}

/// Split a raw buffer into lines.
pub fn lines(raw: &[u8]) -> Lines<'_> {
    Lines { raw, pos: 0 }
}

/// Encode a full command line: `AT+<name><suffix>\r\n`.
///
/// The suffix is the kind-specific tail (`=?`, `?`, `=<params>` or nothing).
pub fn encode_command(name: &str, suffix: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(COMMAND_PREFIX.len() + name.len() + suffix.len() + CRLF.len());
    buf.extend_from_slice(COMMAND_PREFIX.as_bytes());
    buf.extend_from_slice(name.as_bytes());
    buf.extend_from_slice(suffix.as_bytes());
    buf.extend_from_slice(CRLF);
    buf
}

/// Render bytes for a log line, escaping control characters.
pub fn escape_for_log(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() + 8);
    for &byte in data {
        match byte {
            b'\r' => out.push_str("\\r"),
            b'\n' => out.push_str("\\n"),
            0x20..=0x7e => out.push(byte as char),
            _ => out.push_str(&format!("\\x{:02x}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_command() {
        assert_eq!(encode_command("CSQ", ""), b"AT+CSQ\r\n");
        assert_eq!(encode_command("CPIN", "?"), b"AT+CPIN?\r\n");
        assert_eq!(encode_command("QMTCLOSE", "=3"), b"AT+QMTCLOSE=3\r\n");
    }

    #[test]
    fn test_lines_complete_and_partial() {
        let raw = b"\r\n+CSQ: 24,0\r\nOK\r\n+QMT";
        let all: Vec<Line> = lines(raw).collect();

        assert_eq!(all.len(), 4);
        assert!(all[0].is_blank() && all[0].complete);
        assert_eq!(all[1].text, b"+CSQ: 24,0");
        assert_eq!(all[1].span, b"+CSQ: 24,0\r\n");
        assert_eq!(all[1].offset, 2);
        assert_eq!(all[2].text, b"OK");
        assert!(all[2].complete);
        assert_eq!(all[3].text, b"+QMT");
        assert!(!all[3].complete);
    }

    #[test]
    fn test_lines_bare_lf_is_incomplete() {
        let all: Vec<Line> = lines(b"OK\nOK\r").collect();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].text, b"OK");
        assert!(!all[0].complete);
        // Carriage return without line feed is still pending
        assert_eq!(all[1].text, b"OK\r");
        assert!(!all[1].complete);
    }

    #[test]
    fn test_lines_empty_buffer() {
        assert_eq!(lines(b"").count(), 0);
    }

    #[test]
    fn test_escape_for_log() {
        assert_eq!(escape_for_log(b"AT+CSQ\r\n"), "AT+CSQ\\r\\n");
        assert_eq!(escape_for_log(&[0x1a]), "\\x1a");
    }
}
