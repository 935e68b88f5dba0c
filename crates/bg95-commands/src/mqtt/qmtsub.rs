//! `AT+QMTSUB`: subscribe to topics.

use bg95_at::{
    parse_range, split_fields, AtError, AtResult, CodeRange, CommandBuffer, CommandDescriptor,
    CommandKind, Operation, ResponsePolicy,
};

use super::{parse_packet_outcome, PacketOutcome, Qos};
use crate::constants::{CMD_QMTSUB, MAX_TOPICS, TIMEOUT_QMTSUB};
use crate::parse::{check_client_idx, check_not_empty, required_payload};

/// Ranges reported by `AT+QMTSUB=?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeRanges {
    pub client_idx: CodeRange,
    pub msgid: CodeRange,
    pub qos: CodeRange,
}

/// One topic filter and its requested QoS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicFilter {
    pub topic: String,
    pub qos: Qos,
}

impl TopicFilter {
    pub fn new(topic: impl Into<String>, qos: Qos) -> Self {
        TopicFilter { topic: topic.into(), qos }
    }
}

/// Parameters for `AT+QMTSUB=<client_idx>,<msgid>,"<topic>",<qos>[,...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeParams {
    pub client_idx: u8,
    /// Packet identifier, 1-65535.
    pub msgid: u16,
    /// One to five topic filters.
    pub topics: Vec<TopicFilter>,
}

fn parse_test(raw: &str) -> AtResult<SubscribeRanges> {
    let payload = required_payload(raw, CMD_QMTSUB)?;
    let fields = split_fields(payload);
    let range = |i: usize| fields.get(i).and_then(|f| parse_range(f));

    match (range(0), range(1), range(3)) {
        (Some(client_idx), Some(msgid), Some(qos)) => Ok(SubscribeRanges { client_idx, msgid, qos }),
        _ => Err(AtError::invalid_response(format!(
            "malformed +QMTSUB test response: {:?}",
            payload
        ))),
    }
}

fn parse_write(raw: &str) -> AtResult<PacketOutcome> {
    parse_packet_outcome(raw, CMD_QMTSUB)
}

fn format_write(params: &SubscribeParams, buf: &mut CommandBuffer) -> AtResult<()> {
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
    for filter in &params.topics {
        check_not_empty("topic", &filter.topic)?;
    }

    buf.push_value(params.client_idx)?;
    buf.push_separator()?;
    buf.push_value(params.msgid)?;
    for filter in &params.topics {
        buf.push_separator()?;
        buf.push_quoted(&filter.topic)?;
        buf.push_separator()?;
        buf.push_value(filter.qos.code())?;
    }
    Ok(())
}

/// `AT+QMTSUB=?`
pub static TEST: Operation<(), SubscribeRanges> = Operation {
    command: CMD_QMTSUB,
    kind: CommandKind::Test,
    policy: ResponsePolicy::DataRequired,
    timeout: TIMEOUT_QMTSUB,
    parser: Some(parse_test),
    formatter: None,
};

/// `AT+QMTSUB=<client_idx>,<msgid>,...`
pub static WRITE: Operation<SubscribeParams, PacketOutcome> = Operation {
    command: CMD_QMTSUB,
    kind: CommandKind::Write,
    policy: ResponsePolicy::DataRequired,
    timeout: TIMEOUT_QMTSUB,
    parser: Some(parse_write),
    formatter: Some(format_write),
};

/// `AT+QMTSUB`
pub static DESCRIPTOR: CommandDescriptor = CommandDescriptor {
    name: CMD_QMTSUB,
    description: "Subscribe to Topics",
    test: Some(&TEST),
    read: None,
    write: Some(&WRITE),
    execute: None,
};
