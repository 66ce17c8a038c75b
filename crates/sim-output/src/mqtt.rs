//! MQTT sink (feature `mqtt`).

use crate::error::SinkError;
use crate::sink::Sink;
use async_trait::async_trait;
use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use serde::Deserialize;
use sim_core::{ConfigError, Record};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Requests buffered between the client and its event loop.
const REQUEST_CAPACITY: usize = 64;

/// Configuration of an `mqtt` output.
#[derive(Debug, Clone, Deserialize)]
pub struct MqttSinkConfig {
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_broker")]
    pub broker: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// 0, 1 or 2
    #[serde(default)]
    pub qos: u8,
    /// Used only when `password` is set too
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

fn default_topic() -> String {
    "data-stream".to_string()
}

fn default_broker() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "stream-sim".to_string()
}

fn default_keep_alive_secs() -> u64 {
    30
}

fn parse_qos(qos: u8) -> Option<QoS> {
    match qos {
        0 => Some(QoS::AtMostOnce),
        1 => Some(QoS::AtLeastOnce),
        2 => Some(QoS::ExactlyOnce),
        _ => None,
    }
}

/// Publishes each record as one MQTT message.
///
/// Publishing never waits on the broker: a message that cannot be queued is
/// a send error for that record.
pub struct MqttSink {
    client: AsyncClient,
    event_loop: Option<JoinHandle<()>>,
    topic: String,
    qos: QoS,
}

impl MqttSink {
    pub fn new(config: MqttSinkConfig, stream: &str, index: usize) -> Result<Self, ConfigError> {
        let qos = parse_qos(config.qos).ok_or_else(|| {
            let message = format!("qos must be 0, 1 or 2, got {}", config.qos);
            ConfigError::output(stream, index, message)
        })?;

        let mut options = MqttOptions::new(&config.client_id, &config.broker, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(1)));
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let broker = format!("{}:{}", config.broker, config.port);
        let event_loop = tokio::spawn(drive(event_loop, broker));

        info!(
            "Created MQTT client for {}:{} (topic '{}')",
            config.broker, config.port, config.topic
        );
        Ok(Self {
            client,
            event_loop: Some(event_loop),
            topic: config.topic,
            qos,
        })
    }
}

/// Poll the connection until the sink is closed, reconnecting after errors.
async fn drive(mut event_loop: EventLoop, broker: String) {
    loop {
        if let Err(e) = event_loop.poll().await {
            warn!("MQTT connection to {broker} failed: {e}");
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }
}

#[async_trait]
impl Sink for MqttSink {
    async fn send(&mut self, text: &str, _record: &Record) -> Result<(), SinkError> {
        if self.event_loop.is_none() {
            return Err(SinkError::Closed);
        }
        self.client
            .try_publish(self.topic.as_str(), self.qos, false, text.as_bytes().to_vec())
            .map_err(|e| SinkError::Mqtt(e.to_string()))?;
        debug!("Published message to MQTT topic: {}", self.topic);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        let Some(event_loop) = self.event_loop.take() else {
            return Ok(());
        };
        let result = self
            .client
            .try_disconnect()
            .map_err(|e| SinkError::Mqtt(e.to_string()));
        // Give the event loop a moment to flush the disconnect
        tokio::time::sleep(Duration::from_millis(50)).await;
        event_loop.abort();
        info!("Closed MQTT client for topic '{}'", self.topic);
        result
    }

    fn describe(&self) -> String {
        format!("mqtt {}", self.topic)
    }
}
