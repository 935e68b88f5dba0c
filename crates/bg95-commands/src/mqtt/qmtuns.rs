//! `AT+QMTUNS`: unsubscribe from topics.

use bg95_at::{
    parse_range, split_fields, AtError, AtResult, CodeRange, CommandBuffer, CommandDescriptor,
    CommandKind, Operation, ResponsePolicy,
};

use super::{parse_packet_outcome, PacketOutcome};
use crate::constants::{CMD_QMTUNS, MAX_TOPICS, TIMEOUT_QMTUNS};
use crate::parse::{check_client_idx, check_not_empty, required_payload};

/// Ranges reported by `AT+QMTUNS=?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsubscribeRanges {
    pub client_idx: CodeRange,
    pub msgid: CodeRange,
}

/// Parameters for `AT+QMTUNS=<client_idx>,<msgid>,"<topic>"[,...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsubscribeParams {
    pub client_idx: u8,
    /// Packet identifier, 1-65535.
    pub msgid: u16,
    /// One to five topics.
    pub topics: Vec<String>,
}

fn parse_test(raw: &str) -> AtResult<UnsubscribeRanges> {
    let payload = required_payload(raw, CMD_QMTUNS)?;
    let fields = split_fields(payload);
    let range = |i: usize| fields.get(i).and_then(|f| parse_range(f));

    match (range(0), range(1)) {
        (Some(client_idx), Some(msgid)) => Ok(UnsubscribeRanges { client_idx, msgid }),
        _ => Err(AtError::invalid_response(format!(
            "malformed +QMTUNS test response: {:?}",
            payload
        ))),
    }
}

fn parse_write(raw: &str) -> AtResult<PacketOutcome> {
    // No retransmission count in the unsubscribe report
    parse_packet_outcome(raw, CMD_QMTUNS).map(|outcome| PacketOutcome { value: None, ..outcome })
}

fn format_write(params: &UnsubscribeParams, buf: &mut CommandBuffer) -> AtResult<()> {
    check_client_idx(params.client_idx)?;
    if params.msgid == 0 {
        return Err(AtError::invalid_argument("msgid must be 1-65535"));
    }
    if params.topics.is_empty() || params.topics.len() > MAX_TOPICS {
        return Err(AtError::invalid_argument(format!(
            "{} topics given, expected 1-{}",
            params.topics.len(),
            MAX_TOPICS
        )));
    }
    for topic in &params.topics {
        check_not_empty("topic", topic)?;
    }

    buf.push_value(params.client_idx)?;
    buf.push_separator()?;
    buf.push_value(params.msgid)?;
    for topic in &params.topics {
        buf.push_separator()?;
        buf.push_quoted(topic)?;
    }
    Ok(())
}

/// `AT+QMTUNS=?`
pub static TEST: Operation<(), UnsubscribeRanges> = Operation {
    command: CMD_QMTUNS,
    kind: CommandKind::Test,
    policy: ResponsePolicy::DataRequired,
    timeout: TIMEOUT_QMTUNS,
    parser: Some(parse_test),
    formatter: None,
};

/// `AT+QMTUNS=<client_idx>,<msgid>,...`
pub static WRITE: Operation<UnsubscribeParams, PacketOutcome> = Operation {
    command: CMD_QMTUNS,
    kind: CommandKind::Write,
    policy: ResponsePolicy::DataRequired,
    timeout: TIMEOUT_QMTUNS,
    parser: Some(parse_write),
    formatter: Some(format_write),
};

/// `AT+QMTUNS`
pub static DESCRIPTOR: CommandDescriptor = CommandDescriptor {
    name: CMD_QMTUNS,
    description: "Unsubscribe from Topics",
    test: Some(&TEST),
    read: None,
    write: Some(&WRITE),
    execute: None,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt::PacketResult;
    use bg95_at::{dispatch_format, dispatch_parse};

    fn params(client_idx: u8, msgid: u16, topics: &[&str]) -> UnsubscribeParams {
        UnsubscribeParams {
            client_idx,
            msgid,
            topics: topics.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_test_parser() {
        let ranges = parse_test("\r\n+QMTUNS: (0-5),(1-65535)\r\nOK\r\n").unwrap();
        assert_eq!(ranges.client_idx, CodeRange { min: 0, max: 5 });
        assert_eq!(ranges.msgid, CodeRange { min: 1, max: 65535 });

        assert!(matches!(parse_test("\r\nOK\r\n"), Err(AtError::InvalidResponse(_))));
        assert!(matches!(
            parse_test("\r\n+QMTUNS: invalid\r\nOK\r\n"),
            Err(AtError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_write_formatter() {
        let mut buf = CommandBuffer::with_capacity(128);
        let cases: &[(UnsubscribeParams, &str)] = &[
            (params(0, 42, &["test/topic"]), "=0,42,\"test/topic\""),
            (
                params(2, 100, &["test/topic1", "test/topic2", "test/topic3"]),
                "=2,100,\"test/topic1\",\"test/topic2\",\"test/topic3\"",
            ),
            (params(0, 1, &["a"]), "=0,1,\"a\""),
            (params(3, 65535, &["test/topic"]), "=3,65535,\"test/topic\""),
            (
                params(1, 500, &["topic1", "topic2", "topic3", "topic4", "topic5"]),
                "=1,500,\"topic1\",\"topic2\",\"topic3\",\"topic4\",\"topic5\"",
            ),
        ];

        for (p, expected) in cases {
            dispatch_format(&WRITE, p, &mut buf).unwrap();
            assert_eq!(buf.as_str(), *expected);
        }
    }

    #[test]
    fn test_write_formatter_rejects_bad_params() {
        let mut buf = CommandBuffer::with_capacity(128);
        for bad in [
            params(6, 42, &["test/topic"]),
            params(0, 0, &["test/topic"]),
            params(0, 42, &[]),
            params(0, 42, &["a", "b", "c", "d", "e", "f"]),
            params(0, 42, &[""]),
        ] {
            assert!(matches!(
                dispatch_format(&WRITE, &bad, &mut buf),
                Err(AtError::InvalidArgument(_))
            ));
        }

        let mut small = CommandBuffer::with_capacity(8);
        assert!(matches!(
            dispatch_format(&WRITE, &params(0, 42, &["test/topic"]), &mut small),
            Err(AtError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_write_parser() {
        assert_eq!(parse_write("\r\nOK\r\n").unwrap(), PacketOutcome::default());

        let ok = parse_write("\r\nOK\r\n+QMTUNS: 0,42,0\r\n").unwrap();
        assert_eq!((ok.client_idx, ok.msgid), (Some(0), Some(42)));
        assert!(ok.is_success());

        let retrans = parse_write("\r\nOK\r\n+QMTUNS: 2,100,1\r\n").unwrap();
        assert_eq!(retrans.result, Some(PacketResult::Retransmission));

        let failed = parse_write("\r\nOK\r\n+QMTUNS: 5,1000,2\r\n").unwrap();
        assert_eq!(failed.msgid, Some(1000));
        assert_eq!(failed.result, Some(PacketResult::Failed));

        assert_eq!(
            parse_write("\r\nOK\r\n+QMTUNS: 99,99999,99\r\n").unwrap(),
            PacketOutcome::default()
        );
        assert!(matches!(
            parse_write("\r\nOK\r\n+QMTUNS: \r\n"),
            Err(AtError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_dispatch_integration() {
        let outcome = dispatch_parse(&WRITE, b"\r\nOK\r\n+QMTUNS: 0,42,0\r\n").unwrap().unwrap();
        assert_eq!(outcome.msgid, Some(42));
        assert_eq!(DESCRIPTOR.description, "Unsubscribe from Topics");
    }
}
