//! `AT+CGDCONT`: define PDP context.

use bg95_at::{
    code_enum, parse_number_in, payloads, split_fields, unquote, AtError, AtResult, CommandBuffer,
    CommandDescriptor, CommandKind, Operation, ResponsePolicy,
};
use log::warn;

use crate::constants::{CMD_CGDCONT, MAX_CID, MAX_PDP_CONTEXTS, MIN_CID, TIMEOUT_CGDCONT};

code_enum! {
    /// Packet data protocol type.
    pub enum PdpType {
        Ip = 0 => "IP",
        Ppp = 1 => "PPP",
        Ipv6 = 2 => "IPV6",
        Ipv4v6 = 3 => "IPV4V6",
        NonIp = 4 => "Non-IP",
    }
}

code_enum! {
    /// PDP data compression.
    pub enum DataComp {
        Off = 0 => "OFF",
        On = 1 => "ON",
        V42bis = 2 => "V.42bis",
    }
}

code_enum! {
    /// PDP header compression.
    pub enum HeadComp {
        Off = 0 => "OFF",
        On = 1 => "ON",
        Rfc1144 = 2 => "RFC1144",
        Rfc2507 = 3 => "RFC2507",
        Rfc3095 = 4 => "RFC 3095",
    }
}

code_enum! {
    /// IPv4 address allocation method.
    pub enum Ipv4AddrAlloc {
        Nas = 0 => "NAS",
    }
}

/// One context from `AT+CGDCONT?`. Fields outside their valid range are
/// absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PdpContext {
    pub cid: Option<u8>,
    pub pdp_type: Option<PdpType>,
    pub apn: Option<String>,
    pub pdp_addr: Option<String>,
    pub data_comp: Option<DataComp>,
    pub head_comp: Option<HeadComp>,
    pub ipv4_addr_alloc: Option<Ipv4AddrAlloc>,
}

/// Parameters for `AT+CGDCONT=<cid>[,...]`.
///
/// Only `cid` set resets the context. Fields after the last one set are
/// omitted; unset fields before it are sent as empty positions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PdpContextParams {
    pub cid: u8,
    pub pdp_type: Option<PdpType>,
    pub apn: Option<String>,
    pub pdp_addr: Option<String>,
    pub data_comp: Option<DataComp>,
    pub head_comp: Option<HeadComp>,
    pub ipv4_addr_alloc: Option<Ipv4AddrAlloc>,
}

impl PdpContextParams {
    /// IP context with an APN, the common bring-up case.
    pub fn ip(cid: u8, apn: impl Into<String>) -> Self {
        PdpContextParams {
            cid,
            pdp_type: Some(PdpType::Ip),
            apn: Some(apn.into()),
            ..Default::default()
        }
    }
}

fn valid_cid(cid: &u8) -> bool {
    (MIN_CID..=MAX_CID).contains(cid)
}

fn parse_context(payload: &str) -> PdpContext {
    let fields = split_fields(payload);
    let field = |i: usize| fields.get(i).copied();
    let code = |i: usize| field(i).and_then(|f| f.trim().parse::<i32>().ok());
    let text = |i: usize| field(i).map(|f| unquote(f).to_string());

    PdpContext {
        cid: parse_number_in(field(0), valid_cid),
        pdp_type: field(1).and_then(|f| PdpType::from_description(unquote(f))),
        apn: text(2),
        pdp_addr: text(3),
        data_comp: code(4).and_then(DataComp::from_code),
        head_comp: code(5).and_then(HeadComp::from_code),
        ipv4_addr_alloc: code(6).and_then(Ipv4AddrAlloc::from_code),
    }
}

fn parse_read(raw: &str) -> AtResult<Vec<PdpContext>> {
    let lines = payloads(raw, CMD_CGDCONT);
    if lines.len() > MAX_PDP_CONTEXTS {
        warn!(
            "+CGDCONT listed {} contexts, keeping the first {}",
            lines.len(),
            MAX_PDP_CONTEXTS
        );
    }

    Ok(lines
        .into_iter()
        .filter(|payload| !payload.is_empty())
        .take(MAX_PDP_CONTEXTS)
        .map(parse_context)
        .collect())
}

fn format_write(params: &PdpContextParams, buf: &mut CommandBuffer) -> AtResult<()> {
    if !valid_cid(&params.cid) {
        return Err(AtError::invalid_argument(format!(
            "cid {} outside {}-{}",
            params.cid, MIN_CID, MAX_CID
        )));
    }

    let positions: [Option<Field<'_>>; 6] = [
        params.pdp_type.map(|t| Field::Quoted(t.description())),
        params.apn.as_deref().map(Field::Quoted),
        params.pdp_addr.as_deref().map(Field::Quoted),
        params.data_comp.map(|c| Field::Code(c.code())),
        params.head_comp.map(|c| Field::Code(c.code())),
        params.ipv4_addr_alloc.map(|a| Field::Code(a.code())),
    ];
    let used = positions.iter().rposition(Option::is_some).map_or(0, |last| last + 1);

    buf.push_value(params.cid)?;
    for position in &positions[..used] {
        buf.push_separator()?;
        match position {
            Some(Field::Quoted(text)) => buf.push_quoted(text)?,
            Some(Field::Code(code)) => buf.push_value(code)?,
            None => {}
        }
    }
    Ok(())
}

/// One positional write parameter.
enum Field<'a> {
    Quoted(&'a str),
    Code(i32),
}

/// `AT+CGDCONT?`
pub static READ: Operation<(), Vec<PdpContext>> = Operation {
    command: CMD_CGDCONT,
    kind: CommandKind::Read,
    policy: ResponsePolicy::DataOptional,
    timeout: TIMEOUT_CGDCONT,
    parser: Some(parse_read),
    formatter: None,
};

/// `AT+CGDCONT=<cid>[,...]`
pub static WRITE: Operation<PdpContextParams, ()> = Operation {
    command: CMD_CGDCONT,
    kind: CommandKind::Write,
    policy: ResponsePolicy::SimpleOnly,
    timeout: TIMEOUT_CGDCONT,
    parser: None,
    formatter: Some(format_write),
};

/// `AT+CGDCONT`
pub static DESCRIPTOR: CommandDescriptor = CommandDescriptor {
    name: CMD_CGDCONT,
    description: "Define PDP Context",
    test: None,
    read: Some(&READ),
    write: Some(&WRITE),
    execute: None,
};
