//! Integration tests over the whole command table.

use std::time::Duration;

use bg95_at::{dispatch_format, dispatch_parse, has_terminated, CommandBuffer, CommandKind, ResponsePolicy};
use bg95_commands::mqtt::{qmtcfg, qmtconn, qmtopen, qmtsub};
use bg95_commands::network::{cgact, cgdcont, csq};
use bg95_commands::*;

const KINDS: [CommandKind; 4] = [
    CommandKind::Test,
    CommandKind::Read,
    CommandKind::Write,
    CommandKind::Execute,
];

// ============================================================================
// Table shape
// ============================================================================

#[test]
fn test_names_are_unique() {
    for (i, a) in ALL_COMMANDS.iter().enumerate() {
        for b in &ALL_COMMANDS[i + 1..] {
            assert_ne!(a.name, b.name);
        }
        assert!(!a.description.is_empty(), "AT+{} has no description", a.name);
    }
}

#[test]
fn test_timeouts_per_command() {
    let expected: &[(&str, Duration)] = &[
        (CMD_CPIN, TIMEOUT_CPIN),
        (CMD_CSQ, TIMEOUT_CSQ),
        (CMD_COPS, TIMEOUT_COPS),
        (CMD_CGDCONT, TIMEOUT_CGDCONT),
        (CMD_CGACT, TIMEOUT_CGACT),
        (CMD_QMTCFG, TIMEOUT_QMTCFG),
        (CMD_QMTOPEN, TIMEOUT_QMTOPEN),
        (CMD_QMTCLOSE, TIMEOUT_QMTCLOSE),
        (CMD_QMTCONN, TIMEOUT_QMTCONN),
        (CMD_QMTDISC, TIMEOUT_QMTDISC),
        (CMD_QMTSUB, TIMEOUT_QMTSUB),
        (CMD_QMTUNS, TIMEOUT_QMTUNS),
        (CMD_QMTPUB, TIMEOUT_QMTPUB),
    ];

    for (name, timeout) in expected {
        let desc = find_command(name).unwrap_or_else(|| panic!("AT+{} missing", name));
        for kind in KINDS {
            if desc.supports(kind) {
                assert_eq!(desc.timeout(kind), Some(*timeout), "AT+{} {}", name, kind);
            }
        }
    }
}

#[test]
fn test_failure_terminates_every_supported_operation() {
    for desc in ALL_COMMANDS {
        for kind in KINDS {
            if !desc.supports(kind) {
                assert!(!has_terminated(b"\r\nERROR\r\n", desc, kind));
                continue;
            }
            assert!(has_terminated(b"\r\nERROR\r\n", desc, kind), "AT+{} {}", desc.name, kind);
            assert!(has_terminated(b"\r\n+CME ERROR: 3\r\n", desc, kind), "AT+{} {}", desc.name, kind);
        }
    }
}

#[test]
fn test_bare_ok_terminates_unless_data_required() {
    for desc in ALL_COMMANDS {
        for kind in KINDS {
            if let Some(policy) = desc.policy(kind) {
                let expected = policy != ResponsePolicy::DataRequired;
                assert_eq!(
                    has_terminated(b"\r\nOK\r\n", desc, kind),
                    expected,
                    "AT+{} {}",
                    desc.name,
                    kind
                );
            }
        }
    }
}

// ============================================================================
// Command lines
// ============================================================================

#[test]
fn test_workflow_command_lines() {
    let mut buf = CommandBuffer::with_capacity(128);

    dispatch_format(&cgdcont::WRITE, &cgdcont::PdpContextParams::ip(1, "internet"), &mut buf).unwrap();
    assert_eq!(buf.as_str(), "=1,\"IP\",\"internet\"");

    let activate = cgact::CgactWriteParams {
        state: cgact::PdpState::Activated,
        cid: 1,
    };
    dispatch_format(&cgact::WRITE, &activate, &mut buf).unwrap();
    assert_eq!(buf.as_str(), "=1,1");

    let keepalive = qmtcfg::ConfigParams {
        client_idx: 0,
        setting: qmtcfg::ConfigSetting::KeepAlive(Some(120)),
    };
    dispatch_format(&qmtcfg::WRITE, &keepalive, &mut buf).unwrap();
    assert_eq!(buf.as_str(), "=\"keepalive\",0,120");

    let connect = qmtconn::ConnectParams {
        client_idx: 0,
        client_id: "dev".to_string(),
        username: Some("user".to_string()),
        password: Some("pass".to_string()),
    };
    dispatch_format(&qmtconn::WRITE, &connect, &mut buf).unwrap();
    assert_eq!(buf.as_str(), "=0,\"dev\",\"user\",\"pass\"");

    let subscribe = qmtsub::SubscribeParams {
        client_idx: 0,
        msgid: 2,
        topics: vec![
            qmtsub::TopicFilter::new("a/#", mqtt::Qos::AtLeastOnce),
            qmtsub::TopicFilter::new("b", mqtt::Qos::AtMostOnce),
        ],
    };
    dispatch_format(&qmtsub::WRITE, &subscribe, &mut buf).unwrap();
    assert_eq!(buf.as_str(), "=0,2,\"a/#\",1,\"b\",0");
}

// ============================================================================
// Responses
// ============================================================================

#[test]
fn test_urc_interleaved_with_response() {
    let raw = b"\r\n+QMTSTAT: 0,1\r\n\r\nOK\r\n\r\n+QMTOPEN: 0,0\r\n";
    assert!(has_terminated(raw, &qmtopen::DESCRIPTOR, CommandKind::Write));
    let report = dispatch_parse(&qmtopen::WRITE, raw).unwrap().unwrap();
    assert!(report.is_success());
}

#[test]
fn test_signal_quality_from_raw() {
    let raw = b"\r\n+CSQ: 99,99\r\n\r\nOK\r\n";
    let quality = dispatch_parse(&csq::EXECUTE, raw).unwrap().unwrap();
    assert!(!quality.is_known());
    assert_eq!(quality.ber_class(), csq::Ber::Unknown);
}
