//! Driver configuration.
//!
//! Loaded from YAML; every section and field has a default, so a file only
//! needs the values that differ:
//!
//! ```yaml
//! transport:
//!   type: serial
//!   port: /dev/ttyUSB0
//!   baud_rate: 115200
//! network:
//!   apn: iot.example
//! mqtt:
//!   host: broker.example.com
//!   client_id: bg95-field-01
//! ```

use std::path::Path;
use std::time::Duration;

use bg95_at::{DEFAULT_READ_SLICE, DEFAULT_RESPONSE_CAPACITY};
use bg95_commands::mqtt::Qos;
use bg95_commands::network::cgdcont::PdpType;
use bg95_commands::{MAX_CID, MAX_CLIENT_IDX, MIN_CID};
use serde::{Deserialize, Serialize};

use crate::error::{DriverError, DriverResult};

/// Default baud rate of the BG95 main UART.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default command buffer capacity.
pub const DEFAULT_COMMAND_CAPACITY: usize = 256;

/// Where the modem is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    /// Local serial port.
    Serial { port: String, baud_rate: u32 },
    /// Serial-over-TCP bridge, `host:port`.
    Tcp { address: String },
    /// Built-in scripted modem.
    Mock,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig::Serial {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// Engine buffer limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Raw response buffer capacity in bytes.
    pub response_buffer_size: usize,
    /// Command parameter buffer capacity in bytes.
    pub command_buffer_size: usize,
    /// Length of each transport read in milliseconds.
    pub read_slice_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            response_buffer_size: DEFAULT_RESPONSE_CAPACITY,
            command_buffer_size: DEFAULT_COMMAND_CAPACITY,
            read_slice_ms: DEFAULT_READ_SLICE.as_millis() as u64,
        }
    }
}

impl EngineConfig {
    pub fn read_slice(&self) -> Duration {
        Duration::from_millis(self.read_slice_ms)
    }
}

/// Cellular data connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// PDP context identifier.
    pub cid: u8,
    pub apn: String,
    /// `IP`, `PPP`, `IPV6`, `IPV4V6` or `Non-IP`.
    pub pdp_type: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            cid: 1,
            apn: "internet".to_string(),
            pdp_type: "IP".to_string(),
        }
    }
}

impl NetworkConfig {
    /// Decode the configured PDP type.
    pub fn pdp_type(&self) -> DriverResult<PdpType> {
        PdpType::from_description(&self.pdp_type)
            .ok_or_else(|| DriverError::config(format!("unknown pdp_type {:?}", self.pdp_type)))
    }
}

/// MQTT client and topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub client_idx: u8,
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Keep-alive interval pushed with `AT+QMTCFG` before opening.
    pub keepalive_secs: Option<u16>,
    pub publish_topic: String,
    pub publish_qos: u8,
    pub publish_retain: bool,
    pub publish_msgid: u16,
    pub subscribe_topic: String,
    pub subscribe_qos: u8,
    pub subscribe_msgid: u16,
    pub unsubscribe_msgid: u16,
}

impl Default for MqttConfig {
    fn default() -> Self {
        MqttConfig {
            client_idx: 0,
            host: "broker.example.com".to_string(),
            port: 1883,
            client_id: "bg95-client".to_string(),
            username: None,
            password: None,
            keepalive_secs: Some(120),
            publish_topic: "devices/bg95/telemetry".to_string(),
            publish_qos: 1,
            publish_retain: false,
            publish_msgid: 1,
            subscribe_topic: "devices/bg95/response".to_string(),
            subscribe_qos: 1,
            subscribe_msgid: 2,
            unsubscribe_msgid: 3,
        }
    }
}

impl MqttConfig {
    pub fn publish_qos(&self) -> DriverResult<Qos> {
        qos(self.publish_qos, "publish_qos")
    }

    pub fn subscribe_qos(&self) -> DriverResult<Qos> {
        qos(self.subscribe_qos, "subscribe_qos")
    }
}

fn qos(value: u8, field: &str) -> DriverResult<Qos> {
    Qos::from_code(i32::from(value))
        .ok_or_else(|| DriverError::config(format!("{} {} outside 0-2", field, value)))
}

/// Pacing of the connect-and-publish cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub messages_per_cycle: u32,
    /// Pause after bringing a connection up.
    pub settle_delay_ms: u64,
    pub publish_interval_ms: u64,
    pub cycle_delay_ms: u64,
    /// Pause before retrying after a failed cycle.
    pub retry_delay_ms: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        WorkflowConfig {
            messages_per_cycle: 3,
            settle_delay_ms: 2000,
            publish_interval_ms: 5000,
            cycle_delay_ms: 10_000,
            retry_delay_ms: 5000,
        }
    }
}

impl WorkflowConfig {
    /// Same message count, no pauses.
    pub fn without_delays(&self) -> Self {
        WorkflowConfig {
            messages_per_cycle: self.messages_per_cycle,
            settle_delay_ms: 0,
            publish_interval_ms: 0,
            cycle_delay_ms: 0,
            retry_delay_ms: 0,
        }
    }
}

/// Complete driver configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub transport: TransportConfig,
    pub engine: EngineConfig,
    pub network: NetworkConfig,
    pub mqtt: MqttConfig,
    pub workflow: WorkflowConfig,
}

impl DriverConfig {
    /// Load and validate a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> DriverResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Parse and validate YAML text.
    pub fn from_yaml(text: &str) -> DriverResult<Self> {
        let config: DriverConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> DriverResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reject a configuration that cannot work, before any I/O.
    pub fn validate(&self) -> DriverResult<()> {
        if self.engine.response_buffer_size == 0 || self.engine.command_buffer_size == 0 {
            return Err(DriverError::config("buffer sizes must be non-zero"));
        }
        if self.engine.read_slice_ms == 0 {
            return Err(DriverError::config("read_slice_ms must be non-zero"));
        }

        match &self.transport {
            TransportConfig::Serial { port, baud_rate } => {
                if port.is_empty() || *baud_rate == 0 {
                    return Err(DriverError::config("serial transport needs a port and baud rate"));
                }
            }
            TransportConfig::Tcp { address } if address.is_empty() => {
                return Err(DriverError::config("tcp transport needs an address"));
            }
            _ => {}
        }

        if !(MIN_CID..=MAX_CID).contains(&self.network.cid) {
            return Err(DriverError::config(format!(
                "cid {} outside {}-{}",
                self.network.cid, MIN_CID, MAX_CID
            )));
        }
        self.network.pdp_type()?;

        let mqtt = &self.mqtt;
        if mqtt.client_idx > MAX_CLIENT_IDX {
            return Err(DriverError::config(format!(
                "client_idx {} outside 0-{}",
                mqtt.client_idx, MAX_CLIENT_IDX
            )));
        }
        if mqtt.host.is_empty() {
            return Err(DriverError::config("mqtt host must not be empty"));
        }
        if mqtt.client_id.is_empty() {
            return Err(DriverError::config("mqtt client_id must not be empty"));
        }
        if mqtt.password.is_some() && mqtt.username.is_none() {
            return Err(DriverError::config("mqtt password requires a username"));
        }
        if mqtt.publish_topic.is_empty() || mqtt.subscribe_topic.is_empty() {
            return Err(DriverError::config("mqtt topics must not be empty"));
        }
        if mqtt.subscribe_msgid == 0 || mqtt.unsubscribe_msgid == 0 {
            return Err(DriverError::config("subscribe and unsubscribe msgid must be 1-65535"));
        }
        mqtt.publish_qos()?;
        mqtt.subscribe_qos()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = DriverConfig::default();
        config.validate().unwrap();
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.publish_qos().unwrap(), Qos::AtLeastOnce);
        assert_eq!(config.workflow.messages_per_cycle, 3);
        assert_eq!(config.network.pdp_type().unwrap(), PdpType::Ip);
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
transport:
  type: tcp
  address: 127.0.0.1:5000
network:
  apn: iot.example
  pdp_type: IPV4V6
mqtt:
  host: mqtt.example.org
  username: user
  password: secret
"#;
        let config = DriverConfig::from_yaml(yaml).unwrap();
        assert_eq!(
            config.transport,
            TransportConfig::Tcp { address: "127.0.0.1:5000".to_string() }
        );
        assert_eq!(config.network.apn, "iot.example");
        assert_eq!(config.network.cid, 1);
        assert_eq!(config.network.pdp_type().unwrap(), PdpType::Ipv4v6);
        assert_eq!(config.mqtt.host, "mqtt.example.org");
        assert_eq!(config.mqtt.client_id, "bg95-client");
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_mock_transport_yaml() {
        let config = DriverConfig::from_yaml("transport:\n  type: mock\n").unwrap();
        assert_eq!(config.transport, TransportConfig::Mock);
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = DriverConfig::default();
        let parsed = DriverConfig::from_yaml(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_validate_rejects() {
        let cases: Vec<fn(&mut DriverConfig)> = vec![
            |c| c.engine.response_buffer_size = 0,
            |c| c.engine.read_slice_ms = 0,
            |c| c.network.cid = 0,
            |c| c.network.cid = 16,
            |c| c.network.pdp_type = "X25".to_string(),
            |c| c.mqtt.client_idx = 6,
            |c| c.mqtt.host.clear(),
            |c| c.mqtt.client_id.clear(),
            |c| c.mqtt.password = Some("secret".to_string()),
            |c| c.mqtt.publish_qos = 3,
            |c| c.mqtt.subscribe_msgid = 0,
            |c| c.transport = TransportConfig::Tcp { address: String::new() },
        ];

        for (i, mutate) in cases.iter().enumerate() {
            let mut config = DriverConfig::default();
            mutate(&mut config);
            assert!(
                matches!(config.validate(), Err(DriverError::Config(_))),
                "case {} should be rejected",
                i
            );
        }
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            DriverConfig::from_yaml("mqtt: [1, 2"),
            Err(DriverError::Yaml(_))
        ));
    }

    #[test]
    fn test_without_delays() {
        let workflow = WorkflowConfig::default().without_delays();
        assert_eq!(workflow.messages_per_cycle, 3);
        assert_eq!(workflow.publish_interval_ms, 0);
    }
}
