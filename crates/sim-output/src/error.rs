//! Sink error type.

/// Error raised while formatting or delivering one record.
///
/// Send errors are recovered by the scheduler: they are logged and counted,
/// and the stream carries on with the next sink and the next tick.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Local I/O failure (stdout, file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level HTTP failure (connect, timeout, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-2xx status
    #[error("HTTP {method} {url} returned status {status}")]
    HttpStatus {
        method: String,
        url: String,
        status: u16,
    },

    /// Producer or delivery failure reported by the Kafka client
    #[error("Kafka error: {0}")]
    Kafka(String),

    /// Publish failure reported by the MQTT client
    #[error("MQTT error: {0}")]
    Mqtt(String),

    /// The record could not be rendered in the requested format
    #[error("Format error: {0}")]
    Format(String),

    /// The sink was already closed
    #[error("Sink is closed")]
    Closed,
}
