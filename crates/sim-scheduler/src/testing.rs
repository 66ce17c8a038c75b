//! In-memory sinks and helpers shared by the scheduler tests.

use async_trait::async_trait;
use sim_core::{Record, SimulationConfig, StreamDefinition};
use sim_output::{Sink, SinkError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Parse a single-stream YAML document, adding a placeholder output when
/// the document declares none.
pub fn definition(yaml: &str) -> StreamDefinition {
    let mut doc = yaml.to_string();
    if !doc.contains("outputs:") {
        doc.push_str("\noutputs:\n  - { type: stdout, format: json }\n");
    }
    let config = SimulationConfig::from_yaml(&doc).unwrap();
    config.streams.into_iter().next().unwrap()
}

/// Records every line it is sent.
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl MemorySink {
    pub fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Self {
            lines: Arc::clone(&lines),
            closed: Arc::new(AtomicBool::new(false)),
        };
        (sink, lines)
    }

    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn send(&mut self, text: &str, _record: &Record) -> Result<(), SinkError> {
        self.lines.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Fails every send.
pub struct FailingSink;

#[async_trait]
impl Sink for FailingSink {
    async fn send(&mut self, _text: &str, _record: &Record) -> Result<(), SinkError> {
        Err(SinkError::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "sink always fails",
        )))
    }

    fn describe(&self) -> String {
        "failing".to_string()
    }
}
