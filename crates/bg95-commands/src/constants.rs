//! Command constants
//!
//! Mnemonics, response deadlines and field limits for the commands this
//! crate describes. Deadlines follow the maximum response times documented
//! for the BG95.

use std::time::Duration;

// ============================================================================
// Command Mnemonics
// ============================================================================

/// Enter PIN.
pub const CMD_CPIN: &str = "CPIN";
/// Signal quality report.
pub const CMD_CSQ: &str = "CSQ";
/// Operator selection.
pub const CMD_COPS: &str = "COPS";
/// Define PDP context.
pub const CMD_CGDCONT: &str = "CGDCONT";
/// Activate or deactivate PDP context.
pub const CMD_CGACT: &str = "CGACT";
/// Configure optional MQTT parameters.
pub const CMD_QMTCFG: &str = "QMTCFG";
/// Open a network connection for an MQTT client.
pub const CMD_QMTOPEN: &str = "QMTOPEN";
/// Close a network connection for an MQTT client.
pub const CMD_QMTCLOSE: &str = "QMTCLOSE";
/// Connect a client to the MQTT server.
pub const CMD_QMTCONN: &str = "QMTCONN";
/// Disconnect a client from the MQTT server.
pub const CMD_QMTDISC: &str = "QMTDISC";
/// Subscribe to topics.
pub const CMD_QMTSUB: &str = "QMTSUB";
/// Unsubscribe from topics.
pub const CMD_QMTUNS: &str = "QMTUNS";
/// Publish messages.
pub const CMD_QMTPUB: &str = "QMTPUB";

// ============================================================================
// Response Deadlines
// ============================================================================

/// AT+CPIN.
pub const TIMEOUT_CPIN: Duration = Duration::from_secs(5);
/// AT+CSQ.
pub const TIMEOUT_CSQ: Duration = Duration::from_millis(300);
/// AT+COPS (network scan can take minutes).
pub const TIMEOUT_COPS: Duration = Duration::from_secs(180);
/// AT+CGDCONT.
pub const TIMEOUT_CGDCONT: Duration = Duration::from_millis(300);
/// AT+CGACT.
pub const TIMEOUT_CGACT: Duration = Duration::from_secs(150);
/// AT+QMTCFG.
pub const TIMEOUT_QMTCFG: Duration = Duration::from_millis(300);
/// AT+QMTOPEN.
pub const TIMEOUT_QMTOPEN: Duration = Duration::from_secs(75);
/// AT+QMTCLOSE.
pub const TIMEOUT_QMTCLOSE: Duration = Duration::from_millis(300);
/// AT+QMTCONN.
pub const TIMEOUT_QMTCONN: Duration = Duration::from_millis(5000);
/// AT+QMTDISC.
pub const TIMEOUT_QMTDISC: Duration = Duration::from_millis(5000);
/// AT+QMTSUB.
pub const TIMEOUT_QMTSUB: Duration = Duration::from_millis(15000);
/// AT+QMTUNS.
pub const TIMEOUT_QMTUNS: Duration = Duration::from_millis(15000);
/// AT+QMTPUB.
pub const TIMEOUT_QMTPUB: Duration = Duration::from_millis(15000);

// ============================================================================
// Field Limits
// ============================================================================

/// Highest PDP context identifier.
pub const MAX_CID: u8 = 15;
/// Lowest PDP context identifier.
pub const MIN_CID: u8 = 1;
/// Most PDP contexts kept from one AT+CGDCONT? listing.
pub const MAX_PDP_CONTEXTS: usize = 16;
/// Highest MQTT client index.
pub const MAX_CLIENT_IDX: u8 = 5;
/// Most topics in one subscribe or unsubscribe.
pub const MAX_TOPICS: usize = 5;
/// Longest fixed-length publish payload.
pub const MAX_PUBLISH_LEN: usize = 4096;
/// Highest valid RSSI index.
pub const CSQ_RSSI_MAX: u8 = 31;
/// Highest valid bit error rate index.
pub const CSQ_BER_MAX: u8 = 7;
/// RSSI/BER value meaning "not known or not detectable".
pub const CSQ_UNKNOWN: u8 = 99;
