//! File sink.

use crate::error::SinkError;
use crate::sink::Sink;
use async_trait::async_trait;
use serde::Deserialize;
use sim_core::{ConfigError, Record};
use std::path::PathBuf;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Configuration of a `file` output.
#[derive(Debug, Clone, Deserialize)]
pub struct FileSinkConfig {
    /// Output path; parent directories are created
    #[serde(default = "default_path", alias = "filename")]
    pub path: PathBuf,
    /// Append to an existing file instead of truncating it
    #[serde(default = "default_append")]
    pub append: bool,
}

fn default_path() -> PathBuf {
    PathBuf::from("output.txt")
}

fn default_append() -> bool {
    true
}

/// Appends one line per record to a file, flushed after every line.
pub struct FileSink {
    path: PathBuf,
    file: Option<File>,
}

impl FileSink {
    /// Open (and create, if needed) the output file.
    pub async fn open(
        config: FileSinkConfig,
        stream: &str,
        index: usize,
    ) -> Result<Self, ConfigError> {
        let io_error = |e: std::io::Error| {
            ConfigError::output(
                stream,
                index,
                format!("cannot open '{}': {e}", config.path.display()),
            )
        };

        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
            }
        }

        let mut options = OpenOptions::new();
        options.create(true);
        if config.append {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        let file = options.open(&config.path).await.map_err(io_error)?;

        info!("Opened file for output: {}", config.path.display());
        Ok(Self {
            path: config.path,
            file: Some(file),
        })
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn send(&mut self, text: &str, _record: &Record) -> Result<(), SinkError> {
        let file = self.file.as_mut().ok_or(SinkError::Closed)?;
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
            info!("Closed file: {}", self.path.display());
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(path: PathBuf, append: bool) -> FileSinkConfig {
        FileSinkConfig { path, append }
    }

    #[tokio::test]
    async fn test_writes_lines_and_creates_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/out.jsonl");

        let mut sink = FileSink::open(config(path.clone(), true), "s", 0)
            .await
            .unwrap();
        sink.send("{\"a\":1}", &Record::new()).await.unwrap();
        sink.send("{\"a\":2}", &Record::new()).await.unwrap();
        sink.close().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"a\":1}\n{\"a\":2}\n");
    }

    #[tokio::test]
    async fn test_append_versus_truncate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "old\n").unwrap();

        let mut sink = FileSink::open(config(path.clone(), true), "s", 0)
            .await
            .unwrap();
        sink.send("new", &Record::new()).await.unwrap();
        sink.close().await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old\nnew\n");

        let mut sink = FileSink::open(config(path.clone(), false), "s", 0)
            .await
            .unwrap();
        sink.send("only", &Record::new()).await.unwrap();
        sink.close().await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "only\n");
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let dir = TempDir::new().unwrap();
        let mut sink = FileSink::open(config(dir.path().join("x"), true), "s", 0)
            .await
            .unwrap();
        sink.close().await.unwrap();
        sink.close().await.unwrap();
        assert!(matches!(
            sink.send("late", &Record::new()).await,
            Err(SinkError::Closed)
        ));
    }

    #[test]
    fn test_filename_alias() {
        let config: FileSinkConfig = serde_yaml::from_str("filename: data/out.csv").unwrap();
        assert_eq!(config.path, PathBuf::from("data/out.csv"));
        assert!(config.append);
    }
}
