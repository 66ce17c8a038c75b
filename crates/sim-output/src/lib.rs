//! Record formatters and output sinks for stream-sim.
//!
//! Each configured output pairs a [`Format`] with a [`Sink`]. Outputs are
//! opened once when a stream starts and live until it stops.
//!
//! # Sinks
//!
//! - `stdout` / `console` - One line per record on stdout
//! - `file` - One line per record, appended and flushed
//! - `http` - One request per record (POST body or GET `?data=`)
//! - `kafka` - One message per record (requires the `kafka` feature)
//! - `mqtt` - One publish per record (requires the `mqtt` feature)
//!
//! # Formats
//!
//! - `json` / `json_pretty`
//! - `csv` - One row, no header
//! - `text` - `key=value` pairs

pub mod console;
pub mod error;
pub mod file;
pub mod format;
pub mod http;
#[cfg(feature = "kafka")]
pub mod kafka;
#[cfg(feature = "mqtt")]
pub mod mqtt;
pub mod sink;

pub use console::ConsoleSink;
pub use error::SinkError;
pub use file::{FileSink, FileSinkConfig};
pub use format::{format_record, Format};
pub use http::{HttpSink, HttpSinkConfig};
#[cfg(feature = "kafka")]
pub use kafka::{KafkaSink, KafkaSinkConfig};
#[cfg(feature = "mqtt")]
pub use mqtt::{MqttSink, MqttSinkConfig};
pub use sink::{close_outputs, open_outputs, open_sink, Output, Sink};
