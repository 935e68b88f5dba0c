//! Scripted modem for tests and the `--mock` mode.
//!
//! Each written command is matched against the script by prefix; the first
//! matching entry supplies the response bytes, which are then handed out in
//! chunks of at most `chunk_size` bytes. An entry can carry a follow-up that
//! is released by the next write, which models the `>` prompt of a
//! fixed-length publish: the command gets the prompt, the payload gets the
//! final result.

use std::collections::VecDeque;
use std::io;
use std::thread;
use std::time::{Duration, Instant};

use bg95_at::{escape_for_log, AtResult, Transport};
use tracing::{trace, warn};

use crate::config::DriverConfig;

/// One scripted exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    /// Command prefix to match, without CRLF (e.g. `AT+CSQ`).
    pub expected: String,
    pub response: Vec<u8>,
    /// Delay before the first response byte is readable.
    pub delay: Duration,
    /// Bytes released by the write that follows the command.
    pub follow_up: Option<Vec<u8>>,
    /// Remove the entry after its first match.
    pub once: bool,
}

impl MockResponse {
    pub fn new(expected: impl Into<String>, response: impl AsRef<[u8]>) -> Self {
        MockResponse {
            expected: expected.into(),
            response: response.as_ref().to_vec(),
            delay: Duration::ZERO,
            follow_up: None,
            once: false,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_follow_up(mut self, follow_up: impl AsRef<[u8]>) -> Self {
        self.follow_up = Some(follow_up.as_ref().to_vec());
        self
    }

    /// Match only once; later writes fall through to the next entry.
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }
}

/// Transport backed by a response script.
#[derive(Debug)]
pub struct MockTransport {
    script: Vec<MockResponse>,
    pending: VecDeque<u8>,
    ready_at: Option<Instant>,
    follow_up: Option<Vec<u8>>,
    /// Command with no script entry; reported by the next read.
    unmatched: Option<String>,
    chunk_size: usize,
    writes: Vec<Vec<u8>>,
}

impl MockTransport {
    pub fn new(script: Vec<MockResponse>) -> Self {
        MockTransport {
            script,
            pending: VecDeque::new(),
            ready_at: None,
            follow_up: None,
            unmatched: None,
            chunk_size: usize::MAX,
            writes: Vec::new(),
        }
    }

    /// Hand out at most `chunk_size` bytes per read.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Every write so far, in order.
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }

    /// Written command lines as text, CRLF stripped.
    pub fn commands(&self) -> Vec<String> {
        self.writes
            .iter()
            .map(|w| String::from_utf8_lossy(w).trim_end().to_string())
            .collect()
    }

    /// Number of script entries left.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    fn queue(&mut self, bytes: &[u8], delay: Duration) {
        self.pending.clear();
        self.pending.extend(bytes);
        self.ready_at = Some(Instant::now() + delay);
    }
}

impl Transport for MockTransport {
    fn write(&mut self, data: &[u8]) -> AtResult<()> {
        self.writes.push(data.to_vec());

        if let Some(follow_up) = self.follow_up.take() {
            trace!("mock releasing follow-up after {} byte write", data.len());
            self.queue(&follow_up, Duration::ZERO);
            return Ok(());
        }

        let command = String::from_utf8_lossy(data);
        let command = command.trim_end();
        match self.script.iter().position(|entry| command.starts_with(&entry.expected)) {
            Some(index) => {
                let entry = if self.script[index].once {
                    self.script.remove(index)
                } else {
                    self.script[index].clone()
                };
                self.queue(&entry.response, entry.delay);
                self.follow_up = entry.follow_up;
                self.unmatched = None;
            }
            None => {
                warn!("mock has no response for {}", escape_for_log(data));
                self.pending.clear();
                self.unmatched = Some(command.to_string());
            }
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> AtResult<usize> {
        if let Some(command) = self.unmatched.take() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no scripted response for {}", command),
            )
            .into());
        }

        if self.pending.is_empty() {
            thread::sleep(timeout);
            return Ok(0);
        }

        if let Some(ready_at) = self.ready_at {
            let now = Instant::now();
            if now < ready_at {
                let wait = ready_at - now;
                thread::sleep(wait.min(timeout));
                if wait > timeout {
                    return Ok(0);
                }
            }
        }

        let n = self.chunk_size.min(buf.len()).min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

/// A modem that answers the whole connect-and-publish workflow for
/// `config`.
///
/// The first cycle finds the PDP context inactive and the MQTT network
/// closed; later cycles find both up and only reconnect to the broker.
pub fn scripted_modem(config: &DriverConfig) -> MockTransport {
    let mqtt = &config.mqtt;
    let cid = config.network.cid;
    let idx = mqtt.client_idx;
    let ok = "\r\nOK\r\n";

    let script = vec![
        MockResponse::new("AT+CGACT?", format!("\r\n+CGACT: {},0\r\n{}", cid, ok)).once(),
        MockResponse::new("AT+CGACT?", format!("\r\n+CGACT: {},1\r\n{}", cid, ok)),
        MockResponse::new("AT+CPIN?", format!("\r\n+CPIN: READY\r\n{}", ok)),
        MockResponse::new("AT+CSQ", format!("\r\n+CSQ: 24,0\r\n{}", ok)),
        MockResponse::new("AT+COPS?", format!("\r\n+COPS: 0,0,\"Mock Mobile\",8\r\n{}", ok)),
        MockResponse::new("AT+CGDCONT=", ok),
        MockResponse::new("AT+CGACT=", ok).with_delay(Duration::from_millis(20)),
        MockResponse::new("AT+QMTCFG=", ok),
        MockResponse::new("AT+QMTOPEN?", ok).once(),
        MockResponse::new(
            "AT+QMTOPEN?",
            format!("\r\n+QMTOPEN: {},\"{}\",{}\r\n{}", idx, mqtt.host, mqtt.port, ok),
        ),
        MockResponse::new("AT+QMTOPEN=", format!("{}\r\n+QMTOPEN: {},0\r\n", ok, idx))
            .with_delay(Duration::from_millis(20)),
        MockResponse::new("AT+QMTCONN?", ok),
        MockResponse::new("AT+QMTCONN=", format!("{}\r\n+QMTCONN: {},0,0\r\n", ok, idx)),
        MockResponse::new(
            "AT+QMTSUB=",
            format!("{}\r\n+QMTSUB: {},{},0,{}\r\n", ok, idx, mqtt.subscribe_msgid, mqtt.subscribe_qos),
        ),
        MockResponse::new("AT+QMTPUB=", "\r\n> ")
            .with_follow_up(format!("{}\r\n+QMTPUB: {},{},0\r\n", ok, idx, mqtt.publish_msgid)),
        MockResponse::new(
            "AT+QMTUNS=",
            format!("{}\r\n+QMTUNS: {},{},0\r\n", ok, idx, mqtt.unsubscribe_msgid),
        ),
        MockResponse::new("AT+QMTDISC=", format!("{}\r\n+QMTDISC: {},0\r\n", ok, idx)),
        MockResponse::new("AT+QMTCLOSE=", format!("{}\r\n+QMTCLOSE: {},0\r\n", ok, idx)),
    ];

    MockTransport::new(script).with_chunk_size(16)
}
