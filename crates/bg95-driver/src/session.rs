//! The connect-and-publish workflow.
//!
//! One cycle brings the data connection and the MQTT client up as needed,
//! subscribes, publishes a batch of telemetry messages, then unsubscribes
//! and disconnects. Steps that establish connectivity abort the cycle; the
//! rest log and carry on. Retrying a failed cycle is the caller's job.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bg95_at::Transport;
use bg95_commands::mqtt::qmtcfg::ConfigSetting;
use bg95_commands::mqtt::qmtconn::ConnectParams;
use bg95_commands::mqtt::qmtpub::{PublishParams, Retain};
use bg95_commands::mqtt::qmtsub::{SubscribeParams, TopicFilter};
use bg95_commands::mqtt::qmtuns::UnsubscribeParams;
use bg95_commands::mqtt::Qos;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::DriverConfig;
use crate::driver::Bg95;
use crate::error::{DriverError, DriverResult};

/// Granularity of interruptible pauses.
const PAUSE_SLICE: Duration = Duration::from_millis(100);

/// One telemetry message, published as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub device_id: String,
    pub sequence: u64,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
}

/// What one cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleReport {
    /// The PDP context had to be brought up.
    pub network_connected: bool,
    /// The MQTT network connection had to be opened.
    pub mqtt_opened: bool,
    /// The client had to connect to the broker.
    pub mqtt_connected: bool,
    pub subscribed: bool,
    pub published: u32,
    pub failed_publishes: u32,
    pub unsubscribed: bool,
    pub disconnected: bool,
}

/// Driver plus workflow state.
pub struct Session<T: Transport> {
    driver: Bg95<T>,
    config: DriverConfig,
    sequence: u64,
    rng: ChaCha8Rng,
    stop: Arc<AtomicBool>,
}

impl<T: Transport> Session<T> {
    pub fn new(driver: Bg95<T>, config: DriverConfig) -> Self {
        Session {
            driver,
            config,
            sequence: 0,
            rng: ChaCha8Rng::from_entropy(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use a fixed seed for the sample values.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    /// Abort pauses once `stop` is set.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn driver(&self) -> &Bg95<T> {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut Bg95<T> {
        &mut self.driver
    }

    pub fn into_driver(self) -> Bg95<T> {
        self.driver
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Number of telemetry messages generated so far.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Check whether a stop was requested.
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Sleep for `ms`, waking early with [`DriverError::Interrupted`] on stop.
    pub fn pause(&self, ms: u64) -> DriverResult<()> {
        let mut remaining = Duration::from_millis(ms);
        while !remaining.is_zero() {
            if self.is_stopped() {
                return Err(DriverError::Interrupted);
            }
            let slice = remaining.min(PAUSE_SLICE);
            thread::sleep(slice);
            remaining -= slice;
        }
        if self.is_stopped() {
            return Err(DriverError::Interrupted);
        }
        Ok(())
    }

    /// Generate the next telemetry sample.
    pub fn next_telemetry(&mut self) -> Telemetry {
        self.sequence += 1;
        // Tenths keep the JSON short: 25.5-26.4 C, 45.0-46.9 %
        let temperature = f64::from(255 + self.rng.gen_range(0..10)) / 10.0;
        let humidity = f64::from(450 + self.rng.gen_range(0..20)) / 10.0;
        Telemetry {
            device_id: self.config.mqtt.client_id.clone(),
            sequence: self.sequence,
            temperature,
            humidity,
        }
    }

    /// Run one connect-and-publish cycle.
    pub fn run_cycle(&mut self) -> DriverResult<CycleReport> {
        let mut report = CycleReport::default();
        let mqtt = self.config.mqtt.clone();
        let workflow = self.config.workflow.clone();
        let idx = mqtt.client_idx;

        // 1. Data connection
        let cid = self.config.network.cid;
        let active = match self.driver.is_pdp_context_active(cid) {
            Ok(active) => active,
            Err(e) => {
                warn!("PDP context query failed: {}", e);
                false
            }
        };
        if !active {
            info!("PDP context {} inactive, connecting to network", cid);
            self.driver.connect_to_network(&self.config.network)?;
            report.network_connected = true;
            self.pause(workflow.settle_delay_ms)?;
        }

        // 2. MQTT network connection
        if !self.driver.mqtt_network_status()?.is_open_for(idx) {
            if let Some(secs) = mqtt.keepalive_secs {
                self.driver.mqtt_configure(idx, ConfigSetting::KeepAlive(Some(secs)))?;
            }
            info!("Opening MQTT connection to {}:{}", mqtt.host, mqtt.port);
            self.driver.mqtt_open(idx, &mqtt.host, mqtt.port)?;
            report.mqtt_opened = true;
        }

        // 3. Broker session
        if !self.driver.mqtt_connection_state()?.is_connected(idx) {
            let params = ConnectParams {
                client_idx: idx,
                client_id: mqtt.client_id.clone(),
                username: mqtt.username.clone(),
                password: mqtt.password.clone(),
            };
            info!("Connecting to broker as {}", mqtt.client_id);
            self.driver.mqtt_connect(&params)?;
            report.mqtt_connected = true;
            self.pause(workflow.settle_delay_ms)?;
        }

        // 4. Subscribe
        let subscribe = SubscribeParams {
            client_idx: idx,
            msgid: mqtt.subscribe_msgid,
            topics: vec![TopicFilter::new(mqtt.subscribe_topic.clone(), mqtt.subscribe_qos()?)],
        };
        match self.driver.mqtt_subscribe(&subscribe) {
            Ok(outcome) if outcome.is_success() => {
                info!("Subscribed to {}", mqtt.subscribe_topic);
                report.subscribed = true;
            }
            Ok(outcome) => warn!("Subscribe to {} not acknowledged: {:?}", mqtt.subscribe_topic, outcome.result),
            Err(e) => warn!("Subscribe to {} failed: {}", mqtt.subscribe_topic, e),
        }

        // 5. Publish
        let qos = mqtt.publish_qos()?;
        // QoS 0 publishes carry msgid 0
        let msgid = if qos == Qos::AtMostOnce { 0 } else { mqtt.publish_msgid };
        for n in 0..workflow.messages_per_cycle {
            if n > 0 {
                self.pause(workflow.publish_interval_ms)?;
            }
            let telemetry = self.next_telemetry();
            let payload = serde_json::to_vec(&telemetry)?;
            let mut params = PublishParams::for_message(idx, msgid, qos, mqtt.publish_topic.clone(), &payload);
            if mqtt.publish_retain {
                params.retain = Retain::Yes;
            }

            match self.driver.mqtt_publish(&params, &payload) {
                Ok(outcome) if outcome.is_success() => {
                    debug!("Published message {} to {}", telemetry.sequence, mqtt.publish_topic);
                    report.published += 1;
                }
                Ok(outcome) => {
                    warn!("Publish {} not acknowledged: {:?}", telemetry.sequence, outcome.result);
                    report.failed_publishes += 1;
                }
                Err(e) => {
                    warn!("Publish {} failed: {}", telemetry.sequence, e);
                    report.failed_publishes += 1;
                    break;
                }
            }
        }
        info!(
            "Published {}/{} messages",
            report.published, workflow.messages_per_cycle
        );

        // 6. Unsubscribe
        if report.subscribed {
            let unsubscribe = UnsubscribeParams {
                client_idx: idx,
                msgid: mqtt.unsubscribe_msgid,
                topics: vec![mqtt.subscribe_topic.clone()],
            };
            match self.driver.mqtt_unsubscribe(&unsubscribe) {
                Ok(outcome) => report.unsubscribed = outcome.is_success(),
                Err(e) => warn!("Unsubscribe failed: {}", e),
            }
        }

        // 7. Disconnect
        match self.driver.mqtt_disconnect(idx) {
            Ok(disc) => {
                report.disconnected = disc.result.map_or(false, |r| r.code() == 0);
                info!("Disconnected from broker");
            }
            Err(e) => warn!("Disconnect failed: {}", e),
        }

        Ok(report)
    }
}
