//! `AT+CSQ`: signal quality report.

use bg95_at::{
    code_enum, parse_number, parse_range_list, split_fields, AtError, AtResult, CodeRange,
    CommandDescriptor, CommandKind, Operation, ResponsePolicy,
};
use log::debug;

use crate::constants::{CMD_CSQ, CSQ_BER_MAX, CSQ_RSSI_MAX, CSQ_UNKNOWN, TIMEOUT_CSQ};
use crate::parse::required_payload;

code_enum! {
    /// Channel bit error rate class.
    pub enum Ber {
        /// Class 0.
        Ber0 = 0 => "BER < 0.2%",
        /// Class 1.
        Ber1 = 1 => "0.2% <= BER < 0.4%",
        /// Class 2.
        Ber2 = 2 => "0.4% <= BER < 0.8%",
        /// Class 3.
        Ber3 = 3 => "0.8% <= BER < 1.6%",
        /// Class 4.
        Ber4 = 4 => "1.6% <= BER < 3.2%",
        /// Class 5.
        Ber5 = 5 => "3.2% <= BER < 6.4%",
        /// Class 6.
        Ber6 = 6 => "6.4% <= BER < 12.8%",
        /// Class 7.
        Ber7 = 7 => "12.8% <= BER",
        /// Not known or not detectable.
        Unknown = 99 => "Unknown or not detectable",
    }
}

/// Response to `AT+CSQ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalQuality {
    /// RSSI index 0-31, or 99 when unknown.
    pub rssi: u8,
    /// Bit error rate class 0-7, or 99 when unknown.
    pub ber: u8,
}

impl SignalQuality {
    /// Received signal strength in dBm, 0 when unknown.
    pub fn dbm(&self) -> i16 {
        rssi_to_dbm(self.rssi)
    }

    /// Check whether the modem reported a usable signal.
    pub fn is_known(&self) -> bool {
        self.rssi != CSQ_UNKNOWN
    }

    /// Bit error rate class.
    pub fn ber_class(&self) -> Ber {
        Ber::from_code(i32::from(self.ber)).unwrap_or(Ber::Unknown)
    }
}

/// Response to `AT+CSQ=?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CsqRanges {
    /// Lowest reportable RSSI.
    pub rssi_min: u8,
    /// Highest reportable RSSI.
    pub rssi_max: u8,
    /// Whether 99 (unknown) may be reported for RSSI.
    pub rssi_unknown: bool,
    /// Lowest reportable BER class.
    pub ber_min: u8,
    /// Highest reportable BER class.
    pub ber_max: u8,
    /// Whether 99 (unknown) may be reported for BER.
    pub ber_unknown: bool,
}

/// Convert an RSSI index to dBm.
///
/// 0 is -113 dBm or less, 31 is -51 dBm or more; anything outside 0-31
/// yields 0.
pub fn rssi_to_dbm(rssi: u8) -> i16 {
    match rssi {
        0 => -113,
        1 => -111,
        2..=30 => -109 + (i16::from(rssi) - 2) * 2,
        31 => -51,
        _ => 0,
    }
}

/// Convert dBm to the nearest RSSI index, or 99 between steps.
pub fn dbm_to_rssi(dbm: i16) -> u8 {
    match dbm {
        i16::MIN..=-113 => 0,
        -111 => 1,
        -109..=-53 if dbm % 2 != 0 => (2 + (dbm + 109) / 2) as u8,
        -51..=i16::MAX => CSQ_RSSI_MAX,
        _ => CSQ_UNKNOWN,
    }
}

fn parse_execute(raw: &str) -> AtResult<SignalQuality> {
    let payload = required_payload(raw, CMD_CSQ)?;
    let fields = split_fields(payload);

    let (rssi, ber) = match fields.as_slice() {
        [rssi, ber] => (parse_number::<u16>(rssi), parse_number::<u16>(ber)),
        _ => return Err(AtError::invalid_response(format!("malformed +CSQ: {:?}", payload))),
    };
    let (Some(rssi), Some(ber)) = (rssi, ber) else {
        return Err(AtError::invalid_response(format!("malformed +CSQ: {:?}", payload)));
    };

    let rssi = if rssi <= u16::from(CSQ_RSSI_MAX) {
        rssi as u8
    } else {
        if rssi != u16::from(CSQ_UNKNOWN) {
            debug!("out of range rssi {} recorded as unknown", rssi);
        }
        CSQ_UNKNOWN
    };
    let ber = if ber <= u16::from(CSQ_BER_MAX) {
        ber as u8
    } else {
        if ber != u16::from(CSQ_UNKNOWN) {
            debug!("out of range ber {} recorded as unknown", ber);
        }
        CSQ_UNKNOWN
    };

    Ok(SignalQuality { rssi, ber })
}

/// Split `(0-31,99)` into the main range and the "99 supported" flag.
fn parse_class_list(field: &str) -> Option<(CodeRange, bool)> {
    let items = parse_range_list(field)?;
    let unknown = items
        .iter()
        .any(|r| r.min == i64::from(CSQ_UNKNOWN) && r.max == i64::from(CSQ_UNKNOWN));
    let range = items.into_iter().find(|r| r.min != i64::from(CSQ_UNKNOWN))?;
    Some((range, unknown))
}

fn parse_test(raw: &str) -> AtResult<CsqRanges> {
    let payload = required_payload(raw, CMD_CSQ)?;
    let fields = split_fields(payload);

    let malformed = || AtError::invalid_response(format!("malformed +CSQ test response: {:?}", payload));
    let [rssi, ber] = fields.as_slice() else {
        return Err(malformed());
    };
    let (rssi, rssi_unknown) = parse_class_list(rssi).ok_or_else(malformed)?;
    let (ber, ber_unknown) = parse_class_list(ber).ok_or_else(malformed)?;

    let narrow = |v: i64| u8::try_from(v).map_err(|_| malformed());
    Ok(CsqRanges {
        rssi_min: narrow(rssi.min)?,
        rssi_max: narrow(rssi.max)?,
        rssi_unknown,
        ber_min: narrow(ber.min)?,
        ber_max: narrow(ber.max)?,
        ber_unknown,
    })
}

/// `AT+CSQ=?`
pub static TEST: Operation<(), CsqRanges> = Operation {
    command: CMD_CSQ,
    kind: CommandKind::Test,
    policy: ResponsePolicy::DataRequired,
    timeout: TIMEOUT_CSQ,
    parser: Some(parse_test),
    formatter: None,
};

/// `AT+CSQ`
pub static EXECUTE: Operation<(), SignalQuality> = Operation {
    command: CMD_CSQ,
    kind: CommandKind::Execute,
    policy: ResponsePolicy::DataRequired,
    timeout: TIMEOUT_CSQ,
    parser: Some(parse_execute),
    formatter: None,
};

/// `AT+CSQ`
pub static DESCRIPTOR: CommandDescriptor = CommandDescriptor {
    name: CMD_CSQ,
    description: "Signal Quality Report",
    test: Some(&TEST),
    read: None,
    write: None,
    execute: Some(&EXECUTE),
};

#[cfg(test)]
mod tests {
    use super::*;
    use bg95_at::{dispatch_parse, enum_to_str, ParsedBaseResponse, UNKNOWN};

    // ========================================================================
    // Conversions
    // ========================================================================

    #[test]
    fn test_rssi_to_dbm() {
        assert_eq!(rssi_to_dbm(0), -113);
        assert_eq!(rssi_to_dbm(1), -111);
        assert_eq!(rssi_to_dbm(2), -109);
        assert_eq!(rssi_to_dbm(30), -53);
        assert_eq!(rssi_to_dbm(31), -51);
        for i in 2..=30u8 {
            assert_eq!(rssi_to_dbm(i), -109 + (i16::from(i) - 2) * 2);
        }
        assert_eq!(rssi_to_dbm(99), 0);
        assert_eq!(rssi_to_dbm(32), 0);
        assert_eq!(rssi_to_dbm(255), 0);
    }

    #[test]
    fn test_dbm_to_rssi() {
        assert_eq!(dbm_to_rssi(-113), 0);
        assert_eq!(dbm_to_rssi(-114), 0);
        assert_eq!(dbm_to_rssi(-111), 1);
        assert_eq!(dbm_to_rssi(-109), 2);
        assert_eq!(dbm_to_rssi(-53), 30);
        assert_eq!(dbm_to_rssi(-51), 31);
        assert_eq!(dbm_to_rssi(-50), 31);
        for dbm in (-109..=-53i16).step_by(2) {
            assert_eq!(dbm_to_rssi(dbm), (2 + (dbm + 109) / 2) as u8);
        }
        assert_eq!(dbm_to_rssi(-112), CSQ_UNKNOWN);
        assert_eq!(dbm_to_rssi(-110), CSQ_UNKNOWN);
        assert_eq!(dbm_to_rssi(-52), CSQ_UNKNOWN);
    }

    #[test]
    fn test_ber_strings() {
        assert_eq!(Ber::Ber0.description(), "BER < 0.2%");
        assert_eq!(Ber::Ber3.description(), "0.8% <= BER < 1.6%");
        assert_eq!(Ber::Ber7.description(), "12.8% <= BER");
        assert_eq!(enum_to_str(99, Ber::TABLE), "Unknown or not detectable");
        assert_eq!(enum_to_str(8, Ber::TABLE), UNKNOWN);
    }

    // ========================================================================
    // Parsers
    // ========================================================================

    #[test]
    fn test_execute_parser() {
        let q = parse_execute("\r\n+CSQ: 24,0\r\nOK\r\n").unwrap();
        assert_eq!(q, SignalQuality { rssi: 24, ber: 0 });
        assert_eq!(q.dbm(), -65);
        assert_eq!(q.ber_class(), Ber::Ber0);

        let q = parse_execute("\r\n+CSQ: 99,99\r\nOK\r\n").unwrap();
        assert_eq!(q, SignalQuality { rssi: 99, ber: 99 });
        assert!(!q.is_known());
    }

    #[test]
    fn test_execute_parser_out_of_range_becomes_unknown() {
        let q = parse_execute("\r\n+CSQ: 32,8\r\nOK\r\n").unwrap();
        assert_eq!(q, SignalQuality { rssi: 99, ber: 99 });
    }

    #[test]
    fn test_execute_parser_malformed() {
        assert!(matches!(
            parse_execute("\r\n+CSQ: 24\r\nOK\r\n"),
            Err(AtError::InvalidResponse(_))
        ));
        assert!(matches!(parse_execute("\r\nOK\r\n"), Err(AtError::InvalidResponse(_))));
    }

    #[test]
    fn test_test_parser() {
        let ranges = parse_test("\r\n+CSQ: (0-31,99),(0-7,99)\r\nOK\r\n").unwrap();
        assert_eq!(
            ranges,
            CsqRanges {
                rssi_min: 0,
                rssi_max: 31,
                rssi_unknown: true,
                ber_min: 0,
                ber_max: 7,
                ber_unknown: true,
            }
        );
    }

    #[test]
    fn test_dispatch_integration() {
        let raw = b"\r\n+CSQ: 24,0\r\nOK\r\n";
        let parsed = ParsedBaseResponse::parse(raw).unwrap();
        assert!(parsed.has_basic_response && parsed.basic_response_is_ok);
        assert!(parsed.has_data_response());

        let q = dispatch_parse(&EXECUTE, raw).unwrap();
        assert_eq!(q, Some(SignalQuality { rssi: 24, ber: 0 }));
    }

    #[test]
    fn test_descriptor() {
        assert_eq!(DESCRIPTOR.name, "CSQ");
        assert!(DESCRIPTOR.supports(CommandKind::Test));
        assert!(DESCRIPTOR.supports(CommandKind::Execute));
        assert!(!DESCRIPTOR.supports(CommandKind::Read));
        assert!(!DESCRIPTOR.supports(CommandKind::Write));
    }
}
