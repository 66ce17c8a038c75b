//! Per-stream scheduling loop.

use crate::events::EventInjector;
use crate::pacing::Pacer;
use futures::FutureExt;
use sim_core::{ConfigError, Record, StateStore, StreamDefinition};
use sim_generator::{GeneratorRegistry, RecordGenerator};
use sim_output::{close_outputs, open_outputs, Output};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Counters collected by one stream loop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamReport {
    /// Stream name
    pub stream: String,
    /// Ticks started
    pub ticks: u64,
    /// Records produced by the generator
    pub generated: u64,
    /// Records supplied by event triggers
    pub injected: u64,
    /// Failed sink sends (format or delivery)
    pub send_failures: u64,
    /// Ticks aborted by a panic
    pub tick_failures: u64,
    /// Wall time the loop ran
    pub elapsed: Duration,
}

impl StreamReport {
    /// Records dispatched per second over the run.
    pub fn records_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.generated + self.injected) as f64 / secs
        } else {
            0.0
        }
    }
}

/// Where a tick's record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSource {
    Generated,
    Injected,
}

/// Result of one completed tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub tick: u64,
    pub source: RecordSource,
    pub send_failures: u64,
}

/// Owns everything one stream needs: generator, triggers, state and sinks.
pub struct StreamScheduler {
    name: String,
    rate: f64,
    generator: RecordGenerator,
    injector: EventInjector,
    state: StateStore,
    outputs: Vec<Output>,
    pacer: Pacer,
    tick: u64,
    report: StreamReport,
}

impl StreamScheduler {
    /// Build a scheduler with already opened outputs.
    pub fn new(
        definition: &StreamDefinition,
        registry: &GeneratorRegistry,
        outputs: Vec<Output>,
    ) -> Result<Self, ConfigError> {
        let generator = RecordGenerator::compile(definition, registry)?;
        let injector = EventInjector::new(
            &definition.name,
            definition.events.clone(),
            definition.seed,
        );
        let state = StateStore::with_initial(definition.initial_state.iter().cloned());

        Ok(Self {
            name: definition.name.clone(),
            rate: definition.rate,
            generator,
            injector,
            state,
            outputs,
            pacer: Pacer::new(definition.rate, definition.jitter, definition.seed),
            tick: 0,
            report: StreamReport {
                stream: definition.name.clone(),
                ..StreamReport::default()
            },
        })
    }

    /// Compile the schema, then open the stream's configured outputs.
    pub async fn open(
        definition: &StreamDefinition,
        registry: &GeneratorRegistry,
    ) -> Result<Self, ConfigError> {
        // Compile first so a bad schema never leaves sinks half-open
        let mut scheduler = Self::new(definition, registry, Vec::new())?;
        scheduler.connect_outputs(definition).await?;
        Ok(scheduler)
    }

    /// Open the outputs configured in `definition`, replacing any attached ones.
    pub async fn connect_outputs(
        &mut self,
        definition: &StreamDefinition,
    ) -> Result<(), ConfigError> {
        self.outputs = open_outputs(&definition.name, &definition.outputs).await?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The stream's state.
    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// Counters so far.
    pub fn report(&self) -> &StreamReport {
        &self.report
    }

    /// Run one tick: pick or generate the record, update state, dispatch.
    pub async fn tick(&mut self) -> TickOutcome {
        self.tick += 1;
        self.report.ticks += 1;
        let tick = self.tick;

        let (record, source) = match self.injector.check(tick) {
            Some(record) => {
                self.report.injected += 1;
                (record, RecordSource::Injected)
            }
            None => {
                let record = self.generator.generate(&mut self.state, tick);
                self.report.generated += 1;
                (record, RecordSource::Generated)
            }
        };
        debug!(
            "Stream '{}': {} record #{tick}: {record:?}",
            self.name,
            match source {
                RecordSource::Generated => "generated",
                RecordSource::Injected => "injected",
            }
        );

        self.state.update(&record);
        let send_failures = self.dispatch(&record).await;

        TickOutcome {
            tick,
            source,
            send_failures,
        }
    }

    async fn dispatch(&mut self, record: &Record) -> u64 {
        let mut failures = 0;
        for output in self.outputs.iter_mut() {
            if let Err(e) = output.dispatch(record).await {
                warn!(
                    "Stream '{}': failed to send record to {}: {e}",
                    self.name,
                    output.describe()
                );
                failures += 1;
            }
        }
        self.report.send_failures += failures;
        failures
    }

    /// Close the outputs of a scheduler that will never run.
    pub(crate) async fn close(&mut self) {
        close_outputs(&self.name, &mut self.outputs).await;
    }

    /// Run until `cancel` fires, then close the outputs.
    pub async fn run(mut self, cancel: CancellationToken) -> StreamReport {
        let started = Instant::now();
        info!(
            "Stream '{}' started: {} records/s, {} output(s)",
            self.name,
            self.rate,
            self.outputs.len()
        );

        while !cancel.is_cancelled() {
            let tick_start = Instant::now();

            let guarded = AssertUnwindSafe(async {
                self.tick().await;
                self.pacer.next_interval()
            });
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = guarded.catch_unwind() => outcome,
            };

            let delay = match outcome {
                Ok(interval) => Pacer::remaining(interval, tick_start.elapsed()),
                Err(panic) => {
                    self.report.tick_failures += 1;
                    error!(
                        "Stream '{}': tick {} failed: {}",
                        self.name,
                        self.tick,
                        panic_message(panic.as_ref())
                    );
                    self.pacer.base_interval()
                }
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        close_outputs(&self.name, &mut self.outputs).await;
        self.report.elapsed = started.elapsed();
        info!(
            "Stream '{}' stopped after {} ticks ({} generated, {} injected, {} send failures, {} tick failures)",
            self.name,
            self.report.ticks,
            self.report.generated,
            self.report.injected,
            self.report.send_failures,
            self.report.tick_failures
        );
        self.report
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{definition, FailingSink, MemorySink};
    use sim_core::Value;
    use sim_generator::GeneratorError;
    use sim_output::Format;

    #[tokio::test]
    async fn test_tick_generates_and_updates_state() {
        let def = definition(
            r#"
rate: 10
schema:
  id: { type: sequence }
  kind: reading
"#,
        );
        let (sink, lines) = MemorySink::new();
        let outputs = vec![Output::new(Format::Json, Box::new(sink))];
        let mut scheduler =
            StreamScheduler::new(&def, &GeneratorRegistry::with_builtins(), outputs).unwrap();

        for k in 1..=3 {
            let outcome = scheduler.tick().await;
            assert_eq!(outcome.tick, k);
            assert_eq!(outcome.source, RecordSource::Generated);
        }

        let last = scheduler.state().last_record().unwrap();
        assert_eq!(last.get("id"), Some(&Value::Int(2)));
        assert_eq!(
            lines.lock().unwrap().clone(),
            vec![
                r#"{"id":0,"kind":"reading"}"#,
                r#"{"id":1,"kind":"reading"}"#,
                r#"{"id":2,"kind":"reading"}"#,
            ]
        );
    }

    #[tokio::test]
    async fn test_event_overrides_record_exactly() {
        let def = definition(
            r#"
rate: 10
schema:
  x: { type: random_int, min: 100, max: 200 }
  y: 5
events:
  - at_count: 5
    record: { x: 1 }
"#,
        );
        let (sink, lines) = MemorySink::new();
        let outputs = vec![Output::new(Format::Json, Box::new(sink))];
        let mut scheduler =
            StreamScheduler::new(&def, &GeneratorRegistry::with_builtins(), outputs).unwrap();

        for _ in 1..=6 {
            scheduler.tick().await;
        }

        let lines = lines.lock().unwrap().clone();
        assert_eq!(lines[4], r#"{"x":1}"#);
        assert!(lines[3].contains(r#""y":5"#));
        assert!(lines[5].contains(r#""y":5"#));
        assert_eq!(scheduler.report().injected, 1);
        assert_eq!(scheduler.report().generated, 5);
    }

    #[tokio::test]
    async fn test_injected_record_becomes_last_record() {
        let def = definition(
            r#"
rate: 10
schema:
  x: 0
events:
  - every_count: 2
    record: { alarm: true }
"#,
        );
        let mut scheduler =
            StreamScheduler::new(&def, &GeneratorRegistry::with_builtins(), Vec::new()).unwrap();

        scheduler.tick().await;
        scheduler.tick().await;
        let last = scheduler.state().last_record().unwrap();
        assert_eq!(last.get("alarm"), Some(&Value::Bool(true)));
        assert!(last.get("x").is_none());
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_stop_others() {
        let def = definition(
            r#"
rate: 10
schema:
  v: 1
"#,
        );
        let (sink, lines) = MemorySink::new();
        let outputs = vec![
            Output::new(Format::Json, Box::new(FailingSink)),
            Output::new(Format::Text, Box::new(sink)),
        ];
        let mut scheduler =
            StreamScheduler::new(&def, &GeneratorRegistry::with_builtins(), outputs).unwrap();

        let outcome = scheduler.tick().await;
        assert_eq!(outcome.send_failures, 1);
        assert_eq!(lines.lock().unwrap().clone(), vec!["v=1"]);
        assert_eq!(scheduler.report().send_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_fidelity() {
        let def = definition(
            r#"
rate: 20
schema:
  v: 1
"#,
        );
        let (sink, lines) = MemorySink::new();
        let outputs = vec![Output::new(Format::Json, Box::new(sink))];
        let scheduler =
            StreamScheduler::new(&def, &GeneratorRegistry::with_builtins(), outputs).unwrap();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(cancel.clone()));
        tokio::time::sleep(Duration::from_secs(2)).await;
        cancel.cancel();
        let report = handle.await.unwrap();

        assert!(
            (39..=41).contains(&report.ticks),
            "expected ~40 ticks, got {}",
            report.ticks
        );
        assert_eq!(lines.lock().unwrap().len() as u64, report.ticks);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_tick_is_isolated() {
        let def = definition(
            r#"
rate: 10
schema:
  v: { type: explode_on_three }
"#,
        );
        let mut registry = GeneratorRegistry::with_builtins();
        registry.register(
            "explode_on_three",
            |_: &serde_yaml::Mapping,
             _: &mut StateStore,
             tick: u64|
             -> Result<Value, GeneratorError> {
                if tick == 3 {
                    panic!("generator exploded");
                }
                Ok(Value::Int(tick as i64))
            },
        );
        let (sink, lines) = MemorySink::new();
        let outputs = vec![Output::new(Format::Json, Box::new(sink))];
        let scheduler = StreamScheduler::new(&def, &registry, outputs).unwrap();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(cancel.clone()));
        tokio::time::sleep(Duration::from_millis(750)).await;
        cancel.cancel();
        let report = handle.await.unwrap();

        assert_eq!(report.tick_failures, 1);
        let lines = lines.lock().unwrap().clone();
        assert!(lines.contains(&r#"{"v":4}"#.to_string()));
        assert!(!lines.contains(&r#"{"v":3}"#.to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_closes_outputs() {
        let def = definition(
            r#"
rate: 1
schema:
  v: 1
"#,
        );
        let (sink, _lines) = MemorySink::new();
        let closed = sink.closed_flag();
        let outputs = vec![Output::new(Format::Json, Box::new(sink))];
        let scheduler =
            StreamScheduler::new(&def, &GeneratorRegistry::with_builtins(), outputs).unwrap();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(cancel.clone()));
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
        let report = handle.await.unwrap();

        assert_eq!(report.ticks, 1);
        assert!(closed.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_extreme_jitter_still_closes_outputs() {
        let def = definition(
            r#"
rate: 1
jitter: 1.0e30
seed: 9
schema:
  v: 1
"#,
        );
        let (sink, lines) = MemorySink::new();
        let closed = sink.closed_flag();
        let outputs = vec![Output::new(Format::Json, Box::new(sink))];
        let scheduler =
            StreamScheduler::new(&def, &GeneratorRegistry::with_builtins(), outputs).unwrap();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(cancel.clone()));
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
        let report = handle.await.unwrap();

        assert!(report.ticks >= 1);
        assert_eq!(report.tick_failures, 0);
        assert!(!lines.lock().unwrap().is_empty());
        assert!(closed.load(std::sync::atomic::Ordering::SeqCst));
    }
}
