//! Sink trait and output opening.

use crate::console::ConsoleSink;
use crate::error::SinkError;
use crate::file::FileSink;
use crate::format::Format;
use crate::http::HttpSink;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sim_core::{ConfigError, Record, SinkSpec};
use tracing::{debug, info, warn};

/// A live destination for formatted records.
///
/// Delivery is best-effort and at-most-once: a failed send is reported to
/// the caller and never retried.
#[async_trait]
pub trait Sink: Send {
    /// Deliver one formatted record.
    ///
    /// `record` is the value `text` was rendered from; keyed transports read
    /// their message key from it.
    async fn send(&mut self, text: &str, record: &Record) -> Result<(), SinkError>;

    /// Release the sink. Called once at shutdown; must tolerate being called
    /// on a sink that never sent anything.
    async fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Short description for log lines.
    fn describe(&self) -> String;
}

/// One configured output: a sink paired with its format.
pub struct Output {
    format: Format,
    sink: Box<dyn Sink>,
}

impl Output {
    pub fn new(format: Format, sink: Box<dyn Sink>) -> Self {
        Self { format, sink }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn describe(&self) -> String {
        format!("{} ({})", self.sink.describe(), self.format.name())
    }

    /// Format `record` and send it.
    pub async fn dispatch(&mut self, record: &Record) -> Result<(), SinkError> {
        let text = self.format.render(record)?;
        self.sink.send(&text, record).await
    }

    pub async fn close(&mut self) -> Result<(), SinkError> {
        self.sink.close().await
    }
}

impl std::fmt::Debug for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Parse a sink's parameter mapping into its typed configuration.
pub(crate) fn sink_params<T: DeserializeOwned>(
    stream: &str,
    index: usize,
    spec: &SinkSpec,
) -> Result<T, ConfigError> {
    serde_yaml::from_value(serde_yaml::Value::Mapping(spec.params.clone()))
        .map_err(|e| ConfigError::output(stream, index, format!("{} sink: {e}", spec.kind)))
}

/// Open the sink described by `spec`.
///
/// `index` is the output's position in the stream's `outputs` list, used in
/// error messages.
pub async fn open_sink(
    stream: &str,
    index: usize,
    spec: &SinkSpec,
) -> Result<Box<dyn Sink>, ConfigError> {
    let sink: Box<dyn Sink> = match spec.kind.as_str() {
        "stdout" | "console" => Box::new(ConsoleSink::new()),
        "file" => Box::new(FileSink::open(sink_params(stream, index, spec)?, stream, index).await?),
        "http" => Box::new(HttpSink::new(sink_params(stream, index, spec)?, stream, index)?),
        "kafka" => open_kafka(stream, index, spec)?,
        "mqtt" => open_mqtt(stream, index, spec)?,
        other => {
            return Err(ConfigError::output(
                stream,
                index,
                format!("unknown output type '{other}'"),
            ))
        }
    };
    debug!("Stream '{stream}': opened output #{index}: {}", sink.describe());
    Ok(sink)
}

#[cfg(feature = "kafka")]
fn open_kafka(stream: &str, index: usize, spec: &SinkSpec) -> Result<Box<dyn Sink>, ConfigError> {
    let config = sink_params(stream, index, spec)?;
    Ok(Box::new(crate::kafka::KafkaSink::new(config, stream, index)?))
}

#[cfg(not(feature = "kafka"))]
fn open_kafka(
    stream: &str,
    _index: usize,
    _spec: &SinkSpec,
) -> Result<Box<dyn Sink>, ConfigError> {
    Err(ConfigError::unavailable(
        stream,
        "kafka",
        "this build does not include the `kafka` feature",
    ))
}

#[cfg(feature = "mqtt")]
fn open_mqtt(stream: &str, index: usize, spec: &SinkSpec) -> Result<Box<dyn Sink>, ConfigError> {
    let config = sink_params(stream, index, spec)?;
    Ok(Box::new(crate::mqtt::MqttSink::new(config, stream, index)?))
}

#[cfg(not(feature = "mqtt"))]
fn open_mqtt(
    stream: &str,
    _index: usize,
    _spec: &SinkSpec,
) -> Result<Box<dyn Sink>, ConfigError> {
    Err(ConfigError::unavailable(
        stream,
        "mqtt",
        "this build does not include the `mqtt` feature",
    ))
}

/// Open every output of a stream, in definition order.
///
/// If any output fails to open, the ones already opened are closed before
/// the error is returned.
pub async fn open_outputs(
    stream: &str,
    specs: &[SinkSpec],
) -> Result<Vec<Output>, ConfigError> {
    let mut outputs = Vec::with_capacity(specs.len());
    for (index, spec) in specs.iter().enumerate() {
        match open_sink(stream, index, spec).await {
            Ok(sink) => outputs.push(Output::new(Format::resolve(&spec.format), sink)),
            Err(e) => {
                close_outputs(stream, &mut outputs).await;
                return Err(e);
            }
        }
    }
    info!("Stream '{stream}': opened {} output(s)", outputs.len());
    Ok(outputs)
}

/// Close every output, logging failures.
pub async fn close_outputs(stream: &str, outputs: &mut [Output]) {
    for output in outputs.iter_mut() {
        if let Err(e) = output.close().await {
            warn!("Stream '{stream}': error closing {}: {e}", output.describe());
        }
    }
}
