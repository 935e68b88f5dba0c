//! `AT+QMTCFG`: configure optional parameters of an MQTT client.
//!
//! Each write names one configuration type (`"version"`, `"will"`, ...)
//! and either sets it or, with the values omitted, queries it. A query is
//! answered with a `+QMTCFG: "<type>",...` line; a set with `OK` only.

use bg95_at::{
    code_enum, parse_number, parse_number_in, parse_range, parse_range_list, payload, payloads,
    split_fields, unquote, AtError, AtResult, CodeRange, CommandBuffer, CommandDescriptor,
    CommandKind, EnumEntry, Operation, ResponsePolicy,
};
use log::trace;

use super::Qos;
use crate::constants::{CMD_QMTCFG, TIMEOUT_QMTCFG};
use crate::parse::{check_client_idx, check_not_empty, required_payload};

const TYPE_VERSION: &str = "version";
const TYPE_PDPCID: &str = "pdpcid";
const TYPE_SSL: &str = "ssl";
const TYPE_KEEPALIVE: &str = "keepalive";
const TYPE_SESSION: &str = "session";
const TYPE_TIMEOUT: &str = "timeout";
const TYPE_WILL: &str = "will";
const TYPE_RECV_MODE: &str = "recv/mode";

const PDP_CID_RANGE: (u8, u8) = (1, 16);
const SSL_CTX_MAX: u8 = 5;
const KEEPALIVE_MAX: u16 = 3600;
const PKT_TIMEOUT_RANGE: (u8, u8) = (1, 60);
const RETRY_TIMES_MAX: u8 = 10;

// ============================================================================
// Value Enums
// ============================================================================

code_enum! {
    /// MQTT protocol version.
    pub enum MqttVersion {
        V3_1 = 3 => "MQTT v3.1",
        V3_1_1 = 4 => "MQTT v3.1.1",
    }
}

code_enum! {
    /// Transport security of the broker connection.
    pub enum SslMode {
        Normal = 0 => "Normal TCP",
        Ssl = 1 => "SSL TCP",
    }
}

code_enum! {
    /// Clean-session flag.
    pub enum CleanSession {
        Store = 0 => "Store subscriptions",
        Discard = 1 => "Discard information",
    }
}

code_enum! {
    /// Whether a packet timeout is reported with a URC.
    pub enum TimeoutNotice {
        Off = 0 => "Do not report",
        On = 1 => "Report",
    }
}

code_enum! {
    /// Will flag.
    pub enum WillFlag {
        Ignore = 0 => "Ignore",
        Require = 1 => "Require",
    }
}

code_enum! {
    /// Retain flag of the will message.
    pub enum WillRetain {
        No = 0 => "Don't retain",
        Yes = 1 => "Retain",
    }
}

code_enum! {
    /// Where received message payloads are delivered.
    pub enum RecvMode {
        InUrc = 0 => "Contained in URC",
        NotInUrc = 1 => "Not contained in URC",
    }
}

code_enum! {
    /// Whether the receive URC carries the payload length.
    pub enum LenMode {
        NotContained = 0 => "Length not contained",
        Contained = 1 => "Length contained",
    }
}

// ============================================================================
// Settings
// ============================================================================

/// SSL mode and SSL context index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SslConfig {
    pub mode: SslMode,
    /// SSL context, 0-5.
    pub ctx_idx: u8,
}

/// Packet delivery timeout settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Seconds, 1-60.
    pub pkt_timeout: u8,
    /// Retries, 0-10.
    pub retry_times: Option<u8>,
    /// Requires `retry_times`.
    pub notice: Option<TimeoutNotice>,
}

/// Will message configuration.
///
/// With [`WillFlag::Require`] every other field must be set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WillConfig {
    pub flag: WillFlag,
    pub qos: Option<Qos>,
    pub retain: Option<WillRetain>,
    pub topic: Option<String>,
    pub message: Option<String>,
}

impl WillConfig {
    /// No will message.
    pub fn ignore() -> Self {
        WillConfig {
            flag: WillFlag::Ignore,
            qos: None,
            retain: None,
            topic: None,
            message: None,
        }
    }

    /// A will message published on unexpected disconnect.
    pub fn require(qos: Qos, retain: WillRetain, topic: impl Into<String>, message: impl Into<String>) -> Self {
        WillConfig {
            flag: WillFlag::Require,
            qos: Some(qos),
            retain: Some(retain),
            topic: Some(topic.into()),
            message: Some(message.into()),
        }
    }
}

/// Receive mode settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecvModeConfig {
    pub mode: RecvMode,
    pub len: Option<LenMode>,
}

/// One configuration type and its value.
///
/// As a write parameter, `None` queries the current value. As a response,
/// `None` means the value was missing or out of range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSetting {
    Version(Option<MqttVersion>),
    /// PDP context, 1-16.
    PdpCid(Option<u8>),
    Ssl(Option<SslConfig>),
    /// Keep-alive interval in seconds, 0-3600.
    KeepAlive(Option<u16>),
    Session(Option<CleanSession>),
    Timeout(Option<TimeoutConfig>),
    Will(Option<WillConfig>),
    RecvMode(Option<RecvModeConfig>),
}

impl ConfigSetting {
    /// Configuration type name as sent on the wire.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigSetting::Version(_) => TYPE_VERSION,
            ConfigSetting::PdpCid(_) => TYPE_PDPCID,
            ConfigSetting::Ssl(_) => TYPE_SSL,
            ConfigSetting::KeepAlive(_) => TYPE_KEEPALIVE,
            ConfigSetting::Session(_) => TYPE_SESSION,
            ConfigSetting::Timeout(_) => TYPE_TIMEOUT,
            ConfigSetting::Will(_) => TYPE_WILL,
            ConfigSetting::RecvMode(_) => TYPE_RECV_MODE,
        }
    }

    /// Check whether this is a query (no value given).
    pub fn is_query(&self) -> bool {
        match self {
            ConfigSetting::Version(v) => v.is_none(),
            ConfigSetting::PdpCid(v) => v.is_none(),
            ConfigSetting::Ssl(v) => v.is_none(),
            ConfigSetting::KeepAlive(v) => v.is_none(),
            ConfigSetting::Session(v) => v.is_none(),
            ConfigSetting::Timeout(v) => v.is_none(),
            ConfigSetting::Will(v) => v.is_none(),
            ConfigSetting::RecvMode(v) => v.is_none(),
        }
    }
}

/// Parameters for `AT+QMTCFG="<type>",<client_idx>[,...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigParams {
    pub client_idx: u8,
    pub setting: ConfigSetting,
}

/// Value ranges reported by `AT+QMTCFG=?`.
///
/// Enum lists hold the values both the modem and this crate know.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigRanges {
    pub client_idx: Option<CodeRange>,
    pub versions: Vec<MqttVersion>,
    pub pdp_cid: Option<CodeRange>,
    pub ssl_modes: Vec<SslMode>,
    pub ssl_ctx_idx: Option<CodeRange>,
    pub keep_alive: Option<CodeRange>,
    pub clean_session: Vec<CleanSession>,
    pub pkt_timeout: Option<CodeRange>,
    pub retry_times: Option<CodeRange>,
    pub timeout_notice: Vec<TimeoutNotice>,
    pub will_flags: Vec<WillFlag>,
    pub will_qos: Vec<Qos>,
    pub will_retain: Vec<WillRetain>,
    pub recv_modes: Vec<RecvMode>,
    pub len_modes: Vec<LenMode>,
}

// ============================================================================
// Parsers
// ============================================================================

/// Values of `table` covered by a range list field such as `(0-2)`.
fn supported<E>(field: Option<&str>, table: &[EnumEntry], from_code: fn(i32) -> Option<E>) -> Vec<E> {
    let Some(ranges) = field.and_then(parse_range_list) else {
        return Vec::new();
    };
    table
        .iter()
        .filter(|entry| ranges.iter().any(|r| r.contains(i64::from(entry.code))))
        .filter_map(|entry| from_code(entry.code))
        .collect()
}

fn parse_test(raw: &str) -> AtResult<ConfigRanges> {
    let mut ranges = ConfigRanges::default();
    let mut recognised = 0;

    for line in payloads(raw, CMD_QMTCFG) {
        let fields = split_fields(line);
        let field = |i: usize| fields.get(i).copied();
        let range = |i: usize| field(i).and_then(parse_range);

        match field(0).map(unquote) {
            Some(TYPE_VERSION) => ranges.versions = supported(field(2), MqttVersion::TABLE, MqttVersion::from_code),
            Some(TYPE_PDPCID) => ranges.pdp_cid = range(2),
            Some(TYPE_SSL) => {
                ranges.ssl_modes = supported(field(2), SslMode::TABLE, SslMode::from_code);
                ranges.ssl_ctx_idx = range(3);
            }
            Some(TYPE_KEEPALIVE) => ranges.keep_alive = range(2),
            Some(TYPE_SESSION) => {
                ranges.clean_session = supported(field(2), CleanSession::TABLE, CleanSession::from_code)
            }
            Some(TYPE_TIMEOUT) => {
                ranges.pkt_timeout = range(2);
                ranges.retry_times = range(3);
                ranges.timeout_notice = supported(field(4), TimeoutNotice::TABLE, TimeoutNotice::from_code);
            }
            Some(TYPE_WILL) => {
                ranges.will_flags = supported(field(2), WillFlag::TABLE, WillFlag::from_code);
                ranges.will_qos = supported(field(3), Qos::TABLE, Qos::from_code);
                ranges.will_retain = supported(field(4), WillRetain::TABLE, WillRetain::from_code);
            }
            Some(TYPE_RECV_MODE) => {
                ranges.recv_modes = supported(field(2), RecvMode::TABLE, RecvMode::from_code);
                ranges.len_modes = supported(field(3), LenMode::TABLE, LenMode::from_code);
            }
            other => {
                trace!("skipping +QMTCFG test line for {:?}", other);
                continue;
            }
        }

        recognised += 1;
        if ranges.client_idx.is_none() {
            ranges.client_idx = range(1);
        }
    }

    if recognised == 0 {
        return Err(AtError::invalid_response("no known +QMTCFG configuration types"));
    }
    Ok(ranges)
}

fn code<E>(field: Option<&str>, from_code: fn(i32) -> Option<E>) -> Option<E> {
    field.and_then(parse_number::<i32>).and_then(from_code)
}

fn parse_write(raw: &str) -> AtResult<ConfigSetting> {
    let payload = required_payload(raw, CMD_QMTCFG)?;
    let fields = split_fields(payload);
    let field = |i: usize| fields.get(i).copied();
    let text = |i: usize| field(i).map(|f| unquote(f).to_string());

    let setting = match field(0).map(unquote) {
        Some(TYPE_VERSION) => ConfigSetting::Version(code(field(1), MqttVersion::from_code)),
        Some(TYPE_PDPCID) => ConfigSetting::PdpCid(parse_number_in(field(1), |cid: &u8| {
            (PDP_CID_RANGE.0..=PDP_CID_RANGE.1).contains(cid)
        })),
        Some(TYPE_SSL) => ConfigSetting::Ssl(
            code(field(1), SslMode::from_code)
                .zip(parse_number_in(field(2), |ctx: &u8| *ctx <= SSL_CTX_MAX))
                .map(|(mode, ctx_idx)| SslConfig { mode, ctx_idx }),
        ),
        Some(TYPE_KEEPALIVE) => {
            ConfigSetting::KeepAlive(parse_number_in(field(1), |s: &u16| *s <= KEEPALIVE_MAX))
        }
        Some(TYPE_SESSION) => ConfigSetting::Session(code(field(1), CleanSession::from_code)),
        Some(TYPE_TIMEOUT) => ConfigSetting::Timeout(
            parse_number_in(field(1), |t: &u8| (PKT_TIMEOUT_RANGE.0..=PKT_TIMEOUT_RANGE.1).contains(t)).map(
                |pkt_timeout| TimeoutConfig {
                    pkt_timeout,
                    retry_times: parse_number_in(field(2), |r: &u8| *r <= RETRY_TIMES_MAX),
                    notice: code(field(3), TimeoutNotice::from_code),
                },
            ),
        ),
        Some(TYPE_WILL) => ConfigSetting::Will(code(field(1), WillFlag::from_code).map(|flag| WillConfig {
            flag,
            qos: code(field(2), Qos::from_code),
            retain: code(field(3), WillRetain::from_code),
            topic: text(4),
            message: text(5),
        })),
        Some(TYPE_RECV_MODE) => ConfigSetting::RecvMode(
            code(field(1), RecvMode::from_code).map(|mode| RecvModeConfig {
                mode,
                len: code(field(2), LenMode::from_code),
            }),
        ),
        _ => {
            return Err(AtError::invalid_response(format!(
                "unknown +QMTCFG configuration type: {:?}",
                payload
            )))
        }
    };
    Ok(setting)
}

// ============================================================================
// Formatter
// ============================================================================

fn check_range<T: PartialOrd + std::fmt::Display>(name: &str, value: T, min: T, max: T) -> AtResult<()> {
    if value < min || value > max {
        return Err(AtError::invalid_argument(format!(
            "{} {} outside {}-{}",
            name, value, min, max
        )));
    }
    Ok(())
}

fn format_will(will: &WillConfig, buf: &mut CommandBuffer) -> AtResult<()> {
    buf.push_separator()?;
    buf.push_value(will.flag.code())?;
    if will.flag == WillFlag::Ignore {
        return Ok(());
    }

    let (Some(qos), Some(retain), Some(topic), Some(message)) =
        (will.qos, will.retain, will.topic.as_deref(), will.message.as_deref())
    else {
        return Err(AtError::invalid_argument(
            "will flag requires qos, retain, topic and message",
        ));
    };
    check_not_empty("will topic", topic)?;

    buf.push_separator()?;
    buf.push_value(qos.code())?;
    buf.push_separator()?;
    buf.push_value(retain.code())?;
    buf.push_separator()?;
    buf.push_quoted(topic)?;
    buf.push_separator()?;
    buf.push_quoted(message)
}

fn format_write(params: &ConfigParams, buf: &mut CommandBuffer) -> AtResult<()> {
    check_client_idx(params.client_idx)?;

    buf.push_quoted(params.setting.type_name())?;
    buf.push_separator()?;
    buf.push_value(params.client_idx)?;

    match &params.setting {
        ConfigSetting::Version(Some(version)) => {
            buf.push_separator()?;
            buf.push_value(version.code())?;
        }
        ConfigSetting::PdpCid(Some(cid)) => {
            check_range("pdp cid", *cid, PDP_CID_RANGE.0, PDP_CID_RANGE.1)?;
            buf.push_separator()?;
            buf.push_value(cid)?;
        }
        ConfigSetting::Ssl(Some(ssl)) => {
            check_range("ssl context", ssl.ctx_idx, 0, SSL_CTX_MAX)?;
            buf.push_separator()?;
            buf.push_value(ssl.mode.code())?;
            buf.push_separator()?;
            buf.push_value(ssl.ctx_idx)?;
        }
        ConfigSetting::KeepAlive(Some(seconds)) => {
            check_range("keep-alive", *seconds, 0, KEEPALIVE_MAX)?;
            buf.push_separator()?;
            buf.push_value(seconds)?;
        }
        ConfigSetting::Session(Some(clean)) => {
            buf.push_separator()?;
            buf.push_value(clean.code())?;
        }
        ConfigSetting::Timeout(Some(timeout)) => {
            check_range("packet timeout", timeout.pkt_timeout, PKT_TIMEOUT_RANGE.0, PKT_TIMEOUT_RANGE.1)?;
            if timeout.notice.is_some() && timeout.retry_times.is_none() {
                return Err(AtError::invalid_argument("timeout notice requires retry times"));
            }
            buf.push_separator()?;
            buf.push_value(timeout.pkt_timeout)?;
            if let Some(retry) = timeout.retry_times {
                check_range("retry times", retry, 0, RETRY_TIMES_MAX)?;
                buf.push_separator()?;
                buf.push_value(retry)?;
            }
            if let Some(notice) = timeout.notice {
                buf.push_separator()?;
                buf.push_value(notice.code())?;
            }
        }
        ConfigSetting::Will(Some(will)) => format_will(will, buf)?,
        ConfigSetting::RecvMode(Some(recv)) => {
            buf.push_separator()?;
            buf.push_value(recv.mode.code())?;
            if let Some(len) = recv.len {
                buf.push_separator()?;
                buf.push_value(len.code())?;
            }
        }
        // Query
        _ => {}
    }
    Ok(())
}

// ============================================================================
// Operations
// ============================================================================

/// `AT+QMTCFG=?`
pub static TEST: Operation<(), ConfigRanges> = Operation {
    command: CMD_QMTCFG,
    kind: CommandKind::Test,
    policy: ResponsePolicy::DataRequired,
    timeout: TIMEOUT_QMTCFG,
    parser: Some(parse_test),
    formatter: None,
};

/// `AT+QMTCFG="<type>",<client_idx>[,...]`
///
/// Yields the current value for a query and nothing for a set.
pub static WRITE: Operation<ConfigParams, ConfigSetting> = Operation {
    command: CMD_QMTCFG,
    kind: CommandKind::Write,
    policy: ResponsePolicy::DataOptional,
    timeout: TIMEOUT_QMTCFG,
    parser: Some(parse_write),
    formatter: Some(format_write),
};

/// `AT+QMTCFG`
pub static DESCRIPTOR: CommandDescriptor = CommandDescriptor {
    name: CMD_QMTCFG,
    description: "Configure Optional Parameters of MQTT",
    test: Some(&TEST),
    read: None,
    write: Some(&WRITE),
    execute: None,
};

/// Check whether a raw buffer carries a value for `setting`'s type.
pub fn reports_type(raw: &str, setting: &ConfigSetting) -> bool {
    payload(raw, CMD_QMTCFG)
        .and_then(|p| split_fields(p).first().map(|f| unquote(f) == setting.type_name()))
        .unwrap_or(false)
}
