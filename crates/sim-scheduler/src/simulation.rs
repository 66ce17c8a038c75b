//! Multi-stream runner.

use crate::stream::{StreamReport, StreamScheduler};
use futures::future::join_all;
use sim_core::{ConfigError, SimulationConfig};
use sim_generator::GeneratorRegistry;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// All streams of one configuration, ready to run.
pub struct Simulation {
    schedulers: Vec<StreamScheduler>,
}

impl Simulation {
    /// Compile every stream and open every output.
    ///
    /// All schemas are compiled before any sink is opened, so a schema error
    /// in any stream is reported without touching files or the network.
    pub async fn build(
        config: &SimulationConfig,
        registry: &GeneratorRegistry,
    ) -> Result<Self, ConfigError> {
        let mut schedulers = config
            .streams
            .iter()
            .map(|definition| StreamScheduler::new(definition, registry, Vec::new()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut failure = None;
        for (index, (scheduler, definition)) in
            schedulers.iter_mut().zip(&config.streams).enumerate()
        {
            if let Err(e) = scheduler.connect_outputs(definition).await {
                failure = Some((index, e));
                break;
            }
        }
        if let Some((index, e)) = failure {
            for scheduler in schedulers[..index].iter_mut() {
                scheduler.close().await;
            }
            return Err(e);
        }

        Ok(Self { schedulers })
    }

    /// Wrap already built schedulers.
    pub fn from_schedulers(schedulers: Vec<StreamScheduler>) -> Self {
        Self { schedulers }
    }

    pub fn stream_names(&self) -> Vec<&str> {
        self.schedulers.iter().map(StreamScheduler::name).collect()
    }

    /// Run every stream as its own task until `cancel` fires.
    ///
    /// Reports are returned in stream definition order.
    pub async fn run(self, cancel: CancellationToken) -> Vec<StreamReport> {
        info!("Starting {} stream(s)", self.schedulers.len());

        let (names, handles): (Vec<String>, Vec<_>) = self
            .schedulers
            .into_iter()
            .map(|scheduler| {
                let name = scheduler.name().to_string();
                let handle = tokio::spawn(scheduler.run(cancel.clone()));
                (name, handle)
            })
            .unzip();

        join_all(handles)
            .await
            .into_iter()
            .zip(names)
            .map(|(result, stream)| {
                result.unwrap_or_else(|e| {
                    error!("Stream '{stream}' task failed: {e}");
                    StreamReport {
                        stream,
                        ..StreamReport::default()
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{definition, FailingSink, MemorySink};
    use sim_output::{Format, Output};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[tokio::test]
    async fn test_build_rejects_bad_schema_before_opening_sinks() {
        let config = SimulationConfig::from_yaml(
            r#"
streams:
  good:
    rate: 5
    schema: { v: 1 }
    outputs:
      - { type: stdout, format: json }
  bad:
    rate: 5
    schema:
      a: 1
      b: { type: dependent, field: a, transform: nonsense }
    outputs:
      - { type: stdout, format: json }
"#,
        )
        .unwrap();
        let result = Simulation::build(&config, &GeneratorRegistry::with_builtins()).await;
        assert!(matches!(result, Err(ConfigError::InvalidField { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_isolation() {
        let registry = GeneratorRegistry::with_builtins();

        let mut broken_def = definition("rate: 10\nschema: { id: { type: sequence } }");
        broken_def.name = "broken".to_string();
        let broken = StreamScheduler::new(
            &broken_def,
            &registry,
            vec![Output::new(Format::Json, Box::new(FailingSink))],
        )
        .unwrap();

        let healthy_def = definition("rate: 10\nschema: { id: { type: sequence } }");
        let (sink, lines) = MemorySink::new();
        let healthy = StreamScheduler::new(
            &healthy_def,
            &registry,
            vec![Output::new(Format::Json, Box::new(sink))],
        )
        .unwrap();

        let simulation = Simulation::from_schedulers(vec![broken, healthy]);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(simulation.run(cancel.clone()));
        tokio::time::sleep(Duration::from_millis(1050)).await;
        cancel.cancel();
        let reports = handle.await.unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].send_failures, reports[0].ticks);
        assert_eq!(reports[1].send_failures, 0);
        assert!((10..=12).contains(&reports[1].ticks));

        // Each stream counts from zero in its own state
        let lines = lines.lock().unwrap().clone();
        assert_eq!(lines[0], r#"{"id":0}"#);
        assert_eq!(lines[1], r#"{"id":1}"#);
    }

    /// Collects formatted log output for assertions.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_build_compiles_each_schema_once() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let config = SimulationConfig::from_yaml(
            r#"
rate: 5
schema:
  a: { type: no_such_generator }
outputs:
  - { type: stdout, format: json }
"#,
        )
        .unwrap();
        let simulation = Simulation::build(&config, &GeneratorRegistry::with_builtins())
            .await
            .unwrap();
        assert_eq!(simulation.stream_names(), vec!["default"]);

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.matches("field 'a' will be null").count(), 1, "{output}");
    }
}
