//! The BG95 driver handle.
//!
//! [`Bg95`] owns its transport, a response accumulator and a command
//! buffer. Every round-trip is the same four steps: format, write,
//! accumulate until the operation's termination rule holds, dispatch the
//! parser. Typed helpers below wrap the operations the workflow needs.

use std::time::Duration;

use bg95_at::{
    dispatch_format, dispatch_parse, encode_command, escape_for_log, terminated_under, AtError,
    CommandBuffer, CommandKind, Operation, ResponseAccumulator, ResponsePolicy, Transport,
    DEFAULT_READ_SLICE, DEFAULT_RESPONSE_CAPACITY,
};
use bg95_commands::mqtt::qmtcfg::{self, ConfigParams, ConfigSetting};
use bg95_commands::mqtt::qmtclose::{self, CloseParams, CloseReport};
use bg95_commands::mqtt::qmtconn::{self, ClientState, ConnectParams, ConnectReport};
use bg95_commands::mqtt::qmtdisc::{self, DisconnectParams, DisconnectReport};
use bg95_commands::mqtt::qmtopen::{self, OpenConnection, OpenParams, OpenReport};
use bg95_commands::mqtt::qmtpub::{self, PublishParams};
use bg95_commands::mqtt::qmtsub::{self, SubscribeParams};
use bg95_commands::mqtt::qmtuns::{self, UnsubscribeParams};
use bg95_commands::mqtt::PacketOutcome;
use bg95_commands::network::cgact::{self, CgactWriteParams, ContextState, PdpState};
use bg95_commands::network::cgdcont::{self, PdpContext, PdpContextParams};
use bg95_commands::network::cops::{self, OperatorInfo};
use bg95_commands::network::cpin::{self, CpinStatus};
use bg95_commands::network::csq::{self, SignalQuality};
use bg95_commands::{CMD_QMTPUB, TIMEOUT_QMTPUB};
use tracing::{debug, info, trace, warn};

use crate::config::{EngineConfig, NetworkConfig, DEFAULT_COMMAND_CAPACITY};
use crate::error::{DriverError, DriverResult};

/// Timeout of each read that clears leftover input before a command.
const DRAIN_SLICE: Duration = Duration::from_millis(1);

const DRAIN_CHUNK: usize = 256;

/// Driver for one BG95 modem.
pub struct Bg95<T: Transport> {
    transport: T,
    accumulator: ResponseAccumulator,
    command: CommandBuffer,
}

impl<T: Transport> Bg95<T> {
    /// Create a driver with default buffer sizes.
    pub fn new(transport: T) -> Self {
        Bg95 {
            transport,
            accumulator: ResponseAccumulator::new(DEFAULT_RESPONSE_CAPACITY)
                .with_read_slice(DEFAULT_READ_SLICE),
            command: CommandBuffer::with_capacity(DEFAULT_COMMAND_CAPACITY),
        }
    }

    /// Create a driver with the configured buffer sizes.
    pub fn with_config(transport: T, engine: &EngineConfig) -> Self {
        Bg95 {
            transport,
            accumulator: ResponseAccumulator::new(engine.response_buffer_size)
                .with_read_slice(engine.read_slice()),
            command: CommandBuffer::with_capacity(engine.command_buffer_size),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Release the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    // ========================================================================
    // Round trips
    // ========================================================================

    /// Run a parameterless operation (test, read or execute).
    pub fn execute<R: 'static>(&mut self, op: &Operation<(), R>) -> DriverResult<Option<R>> {
        if op.kind == CommandKind::Write {
            return Err(AtError::InvalidState(format!("AT+{} write needs parameters", op.command)).into());
        }
        let line = encode_command(op.command, op.kind.suffix());
        self.round_trip(op, &line)
    }

    /// Run a write operation with `params`.
    pub fn write<P: 'static, R: 'static>(
        &mut self,
        op: &Operation<P, R>,
        params: &P,
    ) -> DriverResult<Option<R>> {
        dispatch_format(op, params, &mut self.command)?;
        let line = encode_command(op.command, self.command.as_str());
        self.round_trip(op, &line)
    }

    fn round_trip<P: 'static, R: 'static>(
        &mut self,
        op: &Operation<P, R>,
        line: &[u8],
    ) -> DriverResult<Option<R>> {
        self.discard_stale_input()?;
        self.send(line)?;
        let raw = self.receive(op.timeout, |raw| terminated_under(raw, op.command, op.policy))?;
        Ok(dispatch_parse(op, raw)?)
    }

    /// Read and drop whatever is already waiting on the line, such as a
    /// response that arrived after its command timed out.
    fn discard_stale_input(&mut self) -> DriverResult<()> {
        let mut chunk = [0u8; DRAIN_CHUNK];
        let mut discarded = Vec::new();
        while discarded.len() < self.accumulator.capacity() {
            let n = self.transport.read(&mut chunk, DRAIN_SLICE)?;
            if n == 0 {
                break;
            }
            discarded.extend_from_slice(&chunk[..n]);
        }
        if !discarded.is_empty() {
            debug!("Discarded {} stale bytes: {}", discarded.len(), escape_for_log(&discarded));
        }
        Ok(())
    }

    fn send(&mut self, data: &[u8]) -> DriverResult<()> {
        trace!("tx {}", escape_for_log(data));
        self.transport.write(data)?;
        Ok(())
    }

    fn receive<F>(&mut self, timeout: Duration, complete: F) -> DriverResult<&[u8]>
    where
        F: Fn(&[u8]) -> bool,
    {
        self.accumulator.reset();
        Ok(self.accumulator.run_until(&mut self.transport, timeout, complete)?)
    }

    // ========================================================================
    // Network
    // ========================================================================

    /// Query the SIM lock state.
    pub fn sim_status(&mut self) -> DriverResult<CpinStatus> {
        required(self.execute(&cpin::READ)?, &cpin::READ)
    }

    pub fn signal_quality(&mut self) -> DriverResult<SignalQuality> {
        required(self.execute(&csq::EXECUTE)?, &csq::EXECUTE)
    }

    /// Query the registered operator.
    pub fn operator(&mut self) -> DriverResult<OperatorInfo> {
        required(self.execute(&cops::READ)?, &cops::READ)
    }

    /// List the defined PDP contexts.
    pub fn pdp_contexts(&mut self) -> DriverResult<Vec<PdpContext>> {
        Ok(self.execute(&cgdcont::READ)?.unwrap_or_default())
    }

    pub fn define_pdp_context(&mut self, params: &PdpContextParams) -> DriverResult<()> {
        self.write(&cgdcont::WRITE, params)?;
        Ok(())
    }

    /// List the activation state of every PDP context.
    pub fn pdp_context_states(&mut self) -> DriverResult<Vec<ContextState>> {
        Ok(self.execute(&cgact::READ)?.unwrap_or_default())
    }

    pub fn is_pdp_context_active(&mut self, cid: u8) -> DriverResult<bool> {
        let states = self.pdp_context_states()?;
        Ok(cgact::state_of(&states, cid) == Some(PdpState::Activated))
    }

    pub fn activate_pdp_context(&mut self, cid: u8) -> DriverResult<()> {
        self.set_pdp_context_state(cid, PdpState::Activated)
    }

    pub fn deactivate_pdp_context(&mut self, cid: u8) -> DriverResult<()> {
        self.set_pdp_context_state(cid, PdpState::Deactivated)
    }

    fn set_pdp_context_state(&mut self, cid: u8, state: PdpState) -> DriverResult<()> {
        self.write(&cgact::WRITE, &CgactWriteParams { state, cid })?;
        Ok(())
    }

    /// Bring up the data connection described by `network`.
    ///
    /// Checks the SIM, logs signal and operator, defines the PDP context
    /// and activates it.
    pub fn connect_to_network(&mut self, network: &NetworkConfig) -> DriverResult<()> {
        let sim = self.sim_status()?;
        if !sim.is_ready() {
            return Err(DriverError::SimNotReady(sim));
        }

        match self.signal_quality() {
            Ok(q) if q.is_known() => info!("Signal: {} dBm ({})", q.dbm(), q.ber_class()),
            Ok(_) => warn!("Signal strength not detectable"),
            Err(e) => warn!("Signal quality query failed: {}", e),
        }
        match self.operator() {
            Ok(op) => info!("Operator: {}", op.operator.as_deref().unwrap_or("none")),
            Err(e) => warn!("Operator query failed: {}", e),
        }

        let params = PdpContextParams {
            pdp_type: Some(network.pdp_type()?),
            ..PdpContextParams::ip(network.cid, network.apn.clone())
        };
        self.define_pdp_context(&params)?;
        debug!("Defined PDP context {} with APN {:?}", network.cid, network.apn);

        self.activate_pdp_context(network.cid)?;
        if !self.is_pdp_context_active(network.cid)? {
            return Err(DriverError::rejected(
                cgact::DESCRIPTOR.name,
                format!("PDP context {} did not activate", network.cid),
            ));
        }
        info!("PDP context {} active", network.cid);
        Ok(())
    }

    // ========================================================================
    // MQTT
    // ========================================================================

    /// Set or query one MQTT configuration value.
    ///
    /// Returns the reported value for a query, `None` after a set.
    pub fn mqtt_configure(
        &mut self,
        client_idx: u8,
        setting: ConfigSetting,
    ) -> DriverResult<Option<ConfigSetting>> {
        self.write(&qmtcfg::WRITE, &ConfigParams { client_idx, setting })
    }

    /// Query the open MQTT network connection.
    pub fn mqtt_network_status(&mut self) -> DriverResult<OpenConnection> {
        Ok(self.execute(&qmtopen::READ)?.unwrap_or_default())
    }

    /// Open the network connection for `client_idx`.
    pub fn mqtt_open(&mut self, client_idx: u8, host: &str, port: u16) -> DriverResult<OpenReport> {
        let params = OpenParams {
            client_idx,
            host: host.to_string(),
            port,
        };
        let report = required(self.write(&qmtopen::WRITE, &params)?, &qmtopen::WRITE)?;
        if !report.is_success() {
            return Err(DriverError::rejected(
                qmtopen::DESCRIPTOR.name,
                describe(report.result.map(|r| r.description())),
            ));
        }
        Ok(report)
    }

    pub fn mqtt_close(&mut self, client_idx: u8) -> DriverResult<CloseReport> {
        required(
            self.write(&qmtclose::WRITE, &CloseParams { client_idx })?,
            &qmtclose::WRITE,
        )
    }

    /// Query the broker connection state.
    pub fn mqtt_connection_state(&mut self) -> DriverResult<ClientState> {
        Ok(self.execute(&qmtconn::READ)?.unwrap_or_default())
    }

    /// Connect a client to the broker; fails unless the broker accepts.
    pub fn mqtt_connect(&mut self, params: &ConnectParams) -> DriverResult<ConnectReport> {
        let report = required(self.write(&qmtconn::WRITE, params)?, &qmtconn::WRITE)?;
        if !report.is_accepted() {
            let reason = match report.ret_code {
                Some(code) => code.description().to_string(),
                None => describe(report.result.map(|r| r.description())),
            };
            return Err(DriverError::rejected(qmtconn::DESCRIPTOR.name, reason));
        }
        Ok(report)
    }

    pub fn mqtt_subscribe(&mut self, params: &SubscribeParams) -> DriverResult<PacketOutcome> {
        required(self.write(&qmtsub::WRITE, params)?, &qmtsub::WRITE)
    }

    pub fn mqtt_unsubscribe(&mut self, params: &UnsubscribeParams) -> DriverResult<PacketOutcome> {
        required(self.write(&qmtuns::WRITE, params)?, &qmtuns::WRITE)
    }

    /// Publish `payload` with the fixed-length form of `AT+QMTPUB`.
    ///
    /// `params.length` is replaced by the payload length. The command is
    /// answered with a `>` prompt, after which exactly that many bytes are
    /// sent; the final report follows the payload.
    pub fn mqtt_publish(&mut self, params: &PublishParams, payload: &[u8]) -> DriverResult<PacketOutcome> {
        let params = PublishParams {
            length: payload.len(),
            ..params.clone()
        };
        dispatch_format(&qmtpub::WRITE, &params, &mut self.command)?;
        let line = encode_command(CMD_QMTPUB, self.command.as_str());
        self.discard_stale_input()?;
        self.send(&line)?;

        let raw = self.receive(TIMEOUT_QMTPUB, qmtpub::awaiting_payload)?;
        if !qmtpub::is_prompt(raw) {
            // Refused before the payload; surface the modem's error
            dispatch_parse(&qmtpub::WRITE, raw)?;
            return Err(DriverError::rejected(CMD_QMTPUB, "no payload prompt"));
        }

        debug!("Sending {} byte payload", payload.len());
        self.send(payload)?;

        let raw = self.receive(TIMEOUT_QMTPUB, |raw| {
            terminated_under(raw, CMD_QMTPUB, ResponsePolicy::DataRequired)
        })?;
        required(dispatch_parse(&qmtpub::WRITE, raw)?, &qmtpub::WRITE)
    }

    pub fn mqtt_disconnect(&mut self, client_idx: u8) -> DriverResult<DisconnectReport> {
        required(
            self.write(&qmtdisc::WRITE, &DisconnectParams { client_idx })?,
            &qmtdisc::WRITE,
        )
    }
}

/// Unwrap the result of a `DataRequired` operation.
fn required<P: 'static, R: 'static>(value: Option<R>, op: &Operation<P, R>) -> DriverResult<R> {
    value.ok_or_else(|| {
        AtError::invalid_response(format!("AT+{} {} returned no data", op.command, op.kind)).into()
    })
}

fn describe(result: Option<&'static str>) -> String {
    result.unwrap_or("no result reported").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockResponse, MockTransport};
    use bg95_at::ModemError;
    use bg95_commands::mqtt::qmtpub::Retain;
    use bg95_commands::mqtt::{PacketResult, Qos};

    fn driver(script: Vec<MockResponse>) -> Bg95<MockTransport> {
        let engine = EngineConfig {
            read_slice_ms: 5,
            ..EngineConfig::default()
        };
        Bg95::with_config(MockTransport::new(script).with_chunk_size(7), &engine)
    }

    fn publish_params() -> PublishParams {
        PublishParams {
            client_idx: 0,
            msgid: 1,
            qos: Qos::AtLeastOnce,
            retain: Retain::No,
            topic: "t".to_string(),
            length: 0,
        }
    }

    // ========================================================================
    // Round trips
    // ========================================================================

    #[test]
    fn test_execute_writes_command_line() {
        let mut bg95 = driver(vec![MockResponse::new("AT+CSQ", "\r\n+CSQ: 24,0\r\n\r\nOK\r\n")]);
        let quality = bg95.signal_quality().unwrap();
        assert_eq!(quality.rssi, 24);
        assert_eq!(quality.dbm(), -65);
        assert_eq!(bg95.transport().writes()[0], b"AT+CSQ\r\n");
    }

    #[test]
    fn test_execute_rejects_write_kind() {
        static BARE_WRITE: Operation<(), ()> = Operation {
            command: "QMTDISC",
            kind: CommandKind::Write,
            policy: ResponsePolicy::SimpleOnly,
            timeout: Duration::from_millis(100),
            parser: None,
            formatter: None,
        };

        let mut bg95 = driver(Vec::new());
        assert!(matches!(
            bg95.execute(&BARE_WRITE),
            Err(DriverError::At(AtError::InvalidState(_)))
        ));
        assert!(bg95.transport().writes().is_empty());
    }

    #[test]
    fn test_command_failure() {
        let mut bg95 = driver(vec![MockResponse::new("AT+CPIN?", "\r\n+CME ERROR: 10\r\n")]);
        match bg95.sim_status() {
            Err(DriverError::At(AtError::CommandFailed(e))) => assert_eq!(e, ModemError::Cme(10)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_timeout() {
        let mut bg95 = driver(vec![MockResponse::new("AT+CSQ", "\r\n+CSQ: 24,")]);
        assert!(matches!(
            bg95.signal_quality(),
            Err(DriverError::At(AtError::Timeout { .. }))
        ));
    }

    /// Serial line whose bytes stay put until read, so a late reply is
    /// still waiting when the next command goes out.
    #[derive(Default)]
    struct LateLine {
        line: std::collections::VecDeque<u8>,
        replies: std::collections::VecDeque<&'static [u8]>,
        writes: Vec<Vec<u8>>,
    }

    impl Transport for LateLine {
        fn write(&mut self, data: &[u8]) -> bg95_at::AtResult<()> {
            self.writes.push(data.to_vec());
            if let Some(reply) = self.replies.pop_front() {
                self.line.extend(reply);
            }
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8], timeout: Duration) -> bg95_at::AtResult<usize> {
            if self.line.is_empty() {
                std::thread::sleep(timeout);
                return Ok(0);
            }
            let n = buf.len().min(self.line.len());
            for (slot, byte) in buf.iter_mut().zip(self.line.drain(..n)) {
                *slot = byte;
            }
            Ok(n)
        }
    }

    #[test]
    fn test_late_reply_is_discarded_before_next_command() {
        let engine = EngineConfig {
            read_slice_ms: 5,
            ..EngineConfig::default()
        };
        let line = LateLine {
            replies: vec![&b"\r\n+CSQ: 24,"[..], &b"\r\n+CME ERROR: 3\r\n"[..]].into(),
            ..Default::default()
        };
        let mut bg95 = Bg95::with_config(line, &engine);

        assert!(matches!(
            bg95.signal_quality(),
            Err(DriverError::At(AtError::Timeout { .. }))
        ));

        // The rest of the CSQ reply shows up after the deadline
        bg95.transport_mut().line.extend(b"0\r\n\r\nOK\r\n");

        match bg95.activate_pdp_context(1) {
            Err(DriverError::At(AtError::CommandFailed(e))) => assert_eq!(e, ModemError::Cme(3)),
            other => panic!("stale OK was taken as the reply: {:?}", other),
        }
        assert_eq!(bg95.transport().writes[1], b"AT+CGACT=1,1\r\n");
        assert!(bg95.transport().line.is_empty());
    }

    #[test]
    fn test_publish_discards_stale_input_but_not_after_prompt() {
        let line = LateLine {
            replies: vec![&b"\r\n> "[..], &b"\r\nOK\r\n\r\n+QMTPUB: 0,1,0\r\n"[..]].into(),
            ..Default::default()
        };
        let mut bg95 = Bg95::new(line);
        bg95.transport_mut().line.extend(b"\r\n+QMTSTAT: 0,1\r\n");

        let outcome = bg95.mqtt_publish(&publish_params(), b"payload").unwrap();
        assert!(outcome.is_success());
        assert_eq!(bg95.transport().writes.len(), 2);
        assert_eq!(bg95.transport().writes[1], b"payload");
    }

    #[test]
    fn test_invalid_params_never_reach_transport() {
        let mut bg95 = driver(Vec::new());
        assert!(matches!(
            bg95.mqtt_open(6, "broker", 1883),
            Err(DriverError::At(AtError::InvalidArgument(_)))
        ));
        assert!(bg95.transport().writes().is_empty());
    }

    // ========================================================================
    // Network helpers
    // ========================================================================

    #[test]
    fn test_pdp_context_state() {
        let mut bg95 = driver(vec![MockResponse::new(
            "AT+CGACT?",
            "\r\n+CGACT: 1,1\r\n+CGACT: 2,0\r\n\r\nOK\r\n",
        )]);
        assert!(bg95.is_pdp_context_active(1).unwrap());
        assert!(!bg95.is_pdp_context_active(2).unwrap());
        assert!(!bg95.is_pdp_context_active(3).unwrap());
    }

    #[test]
    fn test_connect_to_network() {
        let mut bg95 = driver(vec![
            MockResponse::new("AT+CPIN?", "\r\n+CPIN: READY\r\n\r\nOK\r\n"),
            MockResponse::new("AT+CSQ", "\r\n+CSQ: 99,99\r\n\r\nOK\r\n"),
            MockResponse::new("AT+COPS?", "\r\nERROR\r\n"),
            MockResponse::new("AT+CGDCONT=", "\r\nOK\r\n"),
            MockResponse::new("AT+CGACT=", "\r\nOK\r\n"),
            MockResponse::new("AT+CGACT?", "\r\n+CGACT: 1,1\r\n\r\nOK\r\n"),
        ]);
        bg95.connect_to_network(&NetworkConfig::default()).unwrap();

        let commands = bg95.transport().commands();
        assert_eq!(commands[3], "AT+CGDCONT=1,\"IP\",\"internet\"");
        assert_eq!(commands[4], "AT+CGACT=1,1");
    }

    #[test]
    fn test_connect_to_network_locked_sim() {
        let mut bg95 = driver(vec![MockResponse::new("AT+CPIN?", "\r\n+CPIN: SIM PIN\r\n\r\nOK\r\n")]);
        assert!(matches!(
            bg95.connect_to_network(&NetworkConfig::default()),
            Err(DriverError::SimNotReady(CpinStatus::SimPin))
        ));
    }

    // ========================================================================
    // MQTT helpers
    // ========================================================================

    #[test]
    fn test_mqtt_open_failure_result() {
        let mut bg95 = driver(vec![MockResponse::new(
            "AT+QMTOPEN=",
            "\r\nOK\r\n\r\n+QMTOPEN: 0,4\r\n",
        )]);
        match bg95.mqtt_open(0, "bad.host", 1883) {
            Err(DriverError::Rejected { command, reason }) => {
                assert_eq!(command, "QMTOPEN");
                assert_eq!(reason, "Failed to parse domain name");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_mqtt_connect_refused() {
        let mut bg95 = driver(vec![MockResponse::new(
            "AT+QMTCONN=",
            "\r\nOK\r\n\r\n+QMTCONN: 0,0,4\r\n",
        )]);
        let params = ConnectParams {
            client_idx: 0,
            client_id: "dev".to_string(),
            ..ConnectParams::default()
        };
        match bg95.mqtt_connect(&params) {
            Err(DriverError::Rejected { reason, .. }) => {
                assert_eq!(reason, "Connection Refused: Bad Username or Password")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_mqtt_configure_query() {
        let mut bg95 = driver(vec![MockResponse::new(
            "AT+QMTCFG=\"keepalive\",0",
            "\r\n+QMTCFG: \"keepalive\",120\r\n\r\nOK\r\n",
        )]);
        let value = bg95.mqtt_configure(0, ConfigSetting::KeepAlive(None)).unwrap();
        assert_eq!(value, Some(ConfigSetting::KeepAlive(Some(120))));
    }

    #[test]
    fn test_mqtt_publish_prompt_exchange() {
        let mut bg95 = driver(vec![MockResponse::new("AT+QMTPUB=", "\r\n> ")
            .with_follow_up("\r\nOK\r\n\r\n+QMTPUB: 0,1,0\r\n")]);

        let outcome = bg95.mqtt_publish(&publish_params(), b"{\"v\":1}").unwrap();
        assert!(outcome.is_success());

        let writes = bg95.transport().writes();
        assert_eq!(writes[0], b"AT+QMTPUB=0,1,1,0,\"t\",7\r\n");
        assert_eq!(writes[1], b"{\"v\":1}");
    }

    #[test]
    fn test_mqtt_publish_refused_before_prompt() {
        let mut bg95 = driver(vec![MockResponse::new("AT+QMTPUB=", "\r\n+CME ERROR: 3\r\n")]);
        assert!(matches!(
            bg95.mqtt_publish(&publish_params(), b"x"),
            Err(DriverError::At(AtError::CommandFailed(ModemError::Cme(3))))
        ));
        assert_eq!(bg95.transport().writes().len(), 1);
    }

    #[test]
    fn test_mqtt_subscribe_retransmission() {
        let mut bg95 = driver(vec![MockResponse::new(
            "AT+QMTSUB=",
            "\r\nOK\r\n\r\n+QMTSUB: 0,2,1,3\r\n",
        )]);
        let params = SubscribeParams {
            client_idx: 0,
            msgid: 2,
            topics: vec![qmtsub::TopicFilter::new("r", Qos::AtLeastOnce)],
        };
        let outcome = bg95.mqtt_subscribe(&params).unwrap();
        assert_eq!(outcome.result, Some(PacketResult::Retransmission));
        assert_eq!(outcome.value, Some(3));
    }
}
