//! `AT+QMTPUB`: publish a fixed-length message.
//!
//! The exchange has two stages. The write command is answered with a `>`
//! prompt; the host then sends exactly `length` payload bytes, after which
//! the modem replies `OK` and, once the broker acknowledges, the
//! `+QMTPUB:` report.

use bg95_at::{
    code_enum, terminated_under, AtError, AtResult, CommandBuffer, CommandDescriptor, CommandKind,
    Operation, ResponsePolicy,
};

use super::{parse_packet_outcome, PacketOutcome, Qos};
use crate::constants::{CMD_QMTPUB, MAX_PUBLISH_LEN, TIMEOUT_QMTPUB};
use crate::parse::{check_client_idx, check_not_empty};

code_enum! {
    /// Whether the broker keeps the message for future subscribers.
    pub enum Retain {
        No = 0 => "Do not retain",
        Yes = 1 => "Retain message",
    }
}

/// Parameters for `AT+QMTPUB=<client_idx>,<msgid>,<qos>,<retain>,"<topic>",<length>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishParams {
    pub client_idx: u8,
    /// Packet identifier; 0 is reserved for QoS 0.
    pub msgid: u16,
    pub qos: Qos,
    pub retain: Retain,
    pub topic: String,
    /// Payload length in bytes, 1-4096.
    pub length: usize,
}

impl PublishParams {
    /// Parameters for publishing `message` as-is.
    pub fn for_message(client_idx: u8, msgid: u16, qos: Qos, topic: impl Into<String>, message: &[u8]) -> Self {
        PublishParams {
            client_idx,
            msgid,
            qos,
            retain: Retain::No,
            topic: topic.into(),
            length: message.len(),
        }
    }
}

/// Check whether the modem is ready for the payload, or refused the command.
///
/// Stops the first stage of a publish: either the `>` prompt arrived or a
/// final result code (normally an error) did.
pub fn awaiting_payload(raw: &[u8]) -> bool {
    is_prompt(raw) || terminated_under(raw, CMD_QMTPUB, ResponsePolicy::SimpleOnly)
}

/// Check whether `raw` ends with the `>` payload prompt.
pub fn is_prompt(raw: &[u8]) -> bool {
    raw.iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .is_some_and(|i| raw[i] == b'>')
}

fn parse_write(raw: &str) -> AtResult<PacketOutcome> {
    parse_packet_outcome(raw, CMD_QMTPUB)
}

fn format_write(params: &PublishParams, buf: &mut CommandBuffer) -> AtResult<()> {
    check_client_idx(params.client_idx)?;
    check_not_empty("topic", &params.topic)?;
    if params.length == 0 || params.length > MAX_PUBLISH_LEN {
        return Err(AtError::invalid_argument(format!(
            "publish length {} outside 1-{}",
            params.length, MAX_PUBLISH_LEN
        )));
    }

    buf.push_value(params.client_idx)?;
    buf.push_separator()?;
    buf.push_value(params.msgid)?;
    buf.push_separator()?;
    buf.push_value(params.qos.code())?;
    buf.push_separator()?;
    buf.push_value(params.retain.code())?;
    buf.push_separator()?;
    buf.push_quoted(&params.topic)?;
    buf.push_separator()?;
    buf.push_value(params.length)
}

/// `AT+QMTPUB=<client_idx>,<msgid>,<qos>,<retain>,"<topic>",<length>`
pub static WRITE: Operation<PublishParams, PacketOutcome> = Operation {
    command: CMD_QMTPUB,
    kind: CommandKind::Write,
    policy: ResponsePolicy::DataRequired,
    timeout: TIMEOUT_QMTPUB,
    parser: Some(parse_write),
    formatter: Some(format_write),
};

/// `AT+QMTPUB`
pub static DESCRIPTOR: CommandDescriptor = CommandDescriptor {
    name: CMD_QMTPUB,
    description: "Publish Messages to MQTT Server",
    test: None,
    read: None,
    write: Some(&WRITE),
    execute: None,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt::PacketResult;
    use bg95_at::dispatch_format;

    fn params(client_idx: u8, msgid: u16, qos: Qos, retain: Retain, topic: &str, length: usize) -> PublishParams {
        PublishParams {
            client_idx,
            msgid,
            qos,
            retain,
            topic: topic.to_string(),
            length,
        }
    }

    // ========================================================================
    // Formatter
    // ========================================================================

    #[test]
    fn test_write_formatter() {
        let mut buf = CommandBuffer::with_capacity(128);
        let cases = [
            (params(0, 1, Qos::AtMostOnce, Retain::No, "test/topic", 10), "=0,1,0,0,\"test/topic\",10"),
            (params(2, 42, Qos::AtLeastOnce, Retain::Yes, "device/status", 15), "=2,42,1,1,\"device/status\",15"),
            (params(5, 65535, Qos::ExactlyOnce, Retain::No, "important/data", 100), "=5,65535,2,0,\"important/data\",100"),
            (params(0, 0, Qos::AtMostOnce, Retain::No, "a", 1), "=0,0,0,0,\"a\",1"),
        ];

        for (p, expected) in &cases {
            dispatch_format(&WRITE, p, &mut buf).unwrap();
            assert_eq!(buf.as_str(), *expected);
        }

        let p = PublishParams::for_message(1, 7, Qos::AtLeastOnce, "t", b"{\"v\":1}");
        dispatch_format(&WRITE, &p, &mut buf).unwrap();
        assert_eq!(buf.as_str(), "=1,7,1,0,\"t\",7");
    }

    #[test]
    fn test_write_formatter_rejects_bad_params() {
        let mut buf = CommandBuffer::with_capacity(128);
        for bad in [
            params(6, 1, Qos::AtMostOnce, Retain::No, "test/topic", 10),
            params(0, 1, Qos::AtMostOnce, Retain::No, "", 10),
            params(0, 1, Qos::AtMostOnce, Retain::No, "test/topic", 0),
            params(0, 1, Qos::AtMostOnce, Retain::No, "test/topic", 4097),
        ] {
            assert!(matches!(
                dispatch_format(&WRITE, &bad, &mut buf),
                Err(AtError::InvalidArgument(_))
            ));
            assert!(buf.is_empty());
        }

        let mut max = CommandBuffer::with_capacity(128);
        dispatch_format(&WRITE, &params(0, 1, Qos::AtMostOnce, Retain::No, "t", 4096), &mut max).unwrap();
        assert_eq!(max.as_str(), "=0,1,0,0,\"t\",4096");

        let mut small = CommandBuffer::with_capacity(10);
        assert!(matches!(
            dispatch_format(&WRITE, &params(0, 1, Qos::AtMostOnce, Retain::No, "test/topic", 10), &mut small),
            Err(AtError::InvalidSize { .. })
        ));
        assert!(small.is_empty());
    }

    #[test]
    fn test_write_formatter_rejects_topic_carrying_a_command() {
        let mut buf = CommandBuffer::with_capacity(128);
        let topic = "t\",0\r\nAT+QMTDISC=0\r\nAT+X=\"";
        assert!(matches!(
            dispatch_format(&WRITE, &params(0, 1, Qos::AtLeastOnce, Retain::No, topic, 5), &mut buf),
            Err(AtError::InvalidArgument(_))
        ));
        assert!(buf.is_empty());
    }

    // ========================================================================
    // Prompt and response
    // ========================================================================

    #[test]
    fn test_prompt_detection() {
        assert!(is_prompt(b"\r\n> "));
        assert!(is_prompt(b"\r\n>"));
        assert!(!is_prompt(b"\r\n"));
        assert!(awaiting_payload(b"\r\n> "));
        assert!(awaiting_payload(b"\r\nERROR\r\n"));
        assert!(awaiting_payload(b"\r\n+CME ERROR: 3\r\n"));
        assert!(!awaiting_payload(b"\r\n"));
    }

    #[test]
    fn test_write_parser() {
        let sent = parse_write("\r\nOK\r\n\r\n+QMTPUB: 0,1,0\r\n").unwrap();
        assert_eq!((sent.client_idx, sent.msgid), (Some(0), Some(1)));
        assert!(sent.is_success());
        assert_eq!(sent.value, None);

        let retrans = parse_write("\r\nOK\r\n+QMTPUB: 2,10,1,3\r\n").unwrap();
        assert_eq!(retrans.result, Some(PacketResult::Retransmission));
        assert_eq!(retrans.value, Some(3));

        assert!(matches!(
            parse_write("\r\nOK\r\n+QMTPUB: \r\n"),
            Err(AtError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_enum_strings() {
        assert_eq!(Retain::No.description(), "Do not retain");
        assert_eq!(Retain::Yes.description(), "Retain message");
        assert_eq!(DESCRIPTOR.description, "Publish Messages to MQTT Server");
        assert!(!DESCRIPTOR.supports(CommandKind::Test));
    }
}
