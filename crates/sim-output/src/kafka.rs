//! Kafka sink (feature `kafka`).

use crate::error::SinkError;
use crate::sink::Sink;
use async_trait::async_trait;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::ClientConfig;
use serde::Deserialize;
use sim_core::{ConfigError, Record};
use std::time::Duration;
use tracing::{debug, info};

/// Configuration of a `kafka` output.
#[derive(Debug, Clone, Deserialize)]
pub struct KafkaSinkConfig {
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_bootstrap_servers")]
    pub bootstrap_servers: String,
    /// Record field whose value becomes the message key
    #[serde(default)]
    pub key_field: Option<String>,
    /// Delivery timeout per message
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_topic() -> String {
    "data-stream".to_string()
}

fn default_bootstrap_servers() -> String {
    "localhost:9092".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Publishes each record as one Kafka message.
pub struct KafkaSink {
    producer: FutureProducer,
    topic: String,
    key_field: Option<String>,
    timeout: Duration,
}

impl KafkaSink {
    pub fn new(config: KafkaSinkConfig, stream: &str, index: usize) -> Result<Self, ConfigError> {
        let timeout_ms = config.timeout_secs.saturating_mul(1000).to_string();
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.bootstrap_servers)
            .set("message.timeout.ms", &timeout_ms)
            .create()
            .map_err(|e| {
                ConfigError::output(stream, index, format!("failed to create Kafka producer: {e}"))
            })?;

        info!(
            "Created Kafka producer for {} (topic '{}')",
            config.bootstrap_servers, config.topic
        );
        Ok(Self {
            producer,
            topic: config.topic,
            key_field: config.key_field,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

#[async_trait]
impl Sink for KafkaSink {
    async fn send(&mut self, text: &str, record: &Record) -> Result<(), SinkError> {
        let key = self
            .key_field
            .as_deref()
            .and_then(|field| record.get(field))
            .filter(|value| !value.is_null())
            .map(|value| value.to_string());

        let mut message = FutureRecord::<str, str>::to(&self.topic).payload(text);
        if let Some(key) = key.as_deref() {
            message = message.key(key);
        }

        self.producer
            .send(message, self.timeout)
            .await
            .map_err(|(err, _)| SinkError::Kafka(err.to_string()))?;

        debug!("Sent message to Kafka topic: {}", self.topic);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        let producer = self.producer.clone();
        let timeout = self.timeout;
        tokio::task::spawn_blocking(move || producer.flush(timeout))
            .await
            .map_err(|e| SinkError::Kafka(e.to_string()))?
            .map_err(|e| SinkError::Kafka(e.to_string()))?;
        info!("Closed Kafka producer for topic '{}'", self.topic);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("kafka {}", self.topic)
    }
}
