//! Standard output sink.

use crate::error::SinkError;
use crate::sink::Sink;
use async_trait::async_trait;
use sim_core::Record;
use tokio::io::{AsyncWriteExt, Stdout};

/// Writes one line per record to stdout.
pub struct ConsoleSink {
    stdout: Stdout,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            stdout: tokio::io::stdout(),
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sink for ConsoleSink {
    async fn send(&mut self, text: &str, _record: &Record) -> Result<(), SinkError> {
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        self.stdout.write_all(line.as_bytes()).await?;
        self.stdout.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.stdout.flush().await?;
        Ok(())
    }

    fn describe(&self) -> String {
        "stdout".to_string()
    }
}
