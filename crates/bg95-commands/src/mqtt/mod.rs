//! MQTT command set (`AT+QMT*`).
//!
//! Most write operations are answered twice: an immediate `OK`, then a
//! `+QMTxxx:` line once the broker exchange finishes. The write operations
//! are therefore `DataRequired`, so accumulation waits for the second line.
//!
//! Response parsers accept a buffer without the data line (`OK` only) and
//! report every field as absent; a data line with no payload is malformed.

pub mod qmtcfg;
pub mod qmtclose;
pub mod qmtconn;
pub mod qmtdisc;
pub mod qmtopen;
pub mod qmtpub;
pub mod qmtsub;
pub mod qmtuns;

use bg95_at::{
    code_enum, parse_number, parse_number_in, parse_range, payload, split_fields, AtError,
    AtResult, CodeRange,
};

use crate::parse::{required_payload, valid_client_idx};

code_enum! {
    /// MQTT quality of service level.
    pub enum Qos {
        AtMostOnce = 0 => "At most once",
        AtLeastOnce = 1 => "At least once",
        ExactlyOnce = 2 => "Exactly once",
    }
}

code_enum! {
    /// Outcome of a packet exchange with the broker.
    pub enum PacketResult {
        /// Packet sent successfully and ACK received.
        Success = 0 => "Packet sent successfully and ACK received",
        /// Packet retransmission.
        Retransmission = 1 => "Packet retransmission",
        /// Failed to send a packet.
        Failed = 2 => "Failed to send a packet",
    }
}

/// Final report of a subscribe, unsubscribe or publish.
///
/// Each field is absent when missing or out of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketOutcome {
    pub client_idx: Option<u8>,
    pub msgid: Option<u16>,
    pub result: Option<PacketResult>,
    /// Granted QoS on success (subscribe) or the retransmission count.
    pub value: Option<u16>,
}

impl PacketOutcome {
    /// Check whether the broker acknowledged the packet.
    pub fn is_success(&self) -> bool {
        self.result == Some(PacketResult::Success)
    }
}

/// Client index range reported by a test command, e.g. `+QMTCLOSE: (0-5)`.
///
/// The range is accepted as reported, even outside the usable indices.
pub(crate) fn parse_client_range(raw: &str, name: &str) -> AtResult<CodeRange> {
    let payload = required_payload(raw, name)?;
    split_fields(payload)
        .first()
        .and_then(|field| parse_range(field))
        .ok_or_else(|| {
            AtError::invalid_response(format!("malformed +{} test response: {:?}", name, payload))
        })
}

/// Split `<client_idx>,<code>` from a `+<name>:` line.
///
/// Returns `Ok(None)` when no data line arrived.
pub(crate) fn client_and_code(raw: &str, name: &str) -> AtResult<Option<(Option<u8>, Option<i32>)>> {
    let Some(payload) = payload(raw, name) else {
        return Ok(None);
    };
    if payload.is_empty() {
        return Err(AtError::invalid_response(format!("empty +{}: line", name)));
    }

    let fields = split_fields(payload);
    let client_idx = parse_number_in(fields.first().copied(), valid_client_idx);
    let code = fields.get(1).and_then(|f| parse_number(f));
    Ok(Some((client_idx, code)))
}

/// Parse `<client_idx>,<msgid>,<result>[,<value>]`.
pub(crate) fn parse_packet_outcome(raw: &str, name: &str) -> AtResult<PacketOutcome> {
    let Some(payload) = payload(raw, name) else {
        return Ok(PacketOutcome::default());
    };
    if payload.is_empty() {
        return Err(AtError::invalid_response(format!("empty +{}: line", name)));
    }

    let fields = split_fields(payload);
    let field = |i: usize| fields.get(i).copied();

    let result = field(2)
        .and_then(parse_number::<i32>)
        .and_then(PacketResult::from_code);
    let value = match result {
        Some(PacketResult::Success | PacketResult::Retransmission) => {
            field(3).and_then(parse_number::<u16>)
        }
        _ => None,
    };

    Ok(PacketOutcome {
        client_idx: parse_number_in(field(0), valid_client_idx),
        msgid: field(1).and_then(parse_number::<u16>),
        result,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bg95_at::{enum_to_str, UNKNOWN};

    #[test]
    fn test_shared_enum_strings() {
        assert_eq!(Qos::AtMostOnce.description(), "At most once");
        assert_eq!(Qos::ExactlyOnce.description(), "Exactly once");
        assert_eq!(enum_to_str(99, Qos::TABLE), UNKNOWN);
        assert_eq!(PacketResult::Retransmission.description(), "Packet retransmission");
        assert_eq!(enum_to_str(99, PacketResult::TABLE), UNKNOWN);
    }

    #[test]
    fn test_packet_outcome() {
        let outcome = parse_packet_outcome("\r\nOK\r\n+QMTSUB: 2,42,1,3\r\n", "QMTSUB").unwrap();
        assert_eq!(outcome.client_idx, Some(2));
        assert_eq!(outcome.msgid, Some(42));
        assert_eq!(outcome.result, Some(PacketResult::Retransmission));
        assert_eq!(outcome.value, Some(3));

        let outcome = parse_packet_outcome("\r\nOK\r\n+QMTSUB: 5,100,2,7\r\n", "QMTSUB").unwrap();
        assert_eq!(outcome.result, Some(PacketResult::Failed));
        assert_eq!(outcome.value, None);

        assert_eq!(
            parse_packet_outcome("\r\nOK\r\n", "QMTSUB").unwrap(),
            PacketOutcome::default()
        );
    }

    #[test]
    fn test_client_range() {
        let range = parse_client_range("\r\n+QMTDISC: (0-5)\r\nOK\r\n", "QMTDISC").unwrap();
        assert_eq!((range.min, range.max), (0, 5));
        assert!(parse_client_range("\r\n+QMTDISC: \r\nOK\r\n", "QMTDISC").is_err());
    }
}
