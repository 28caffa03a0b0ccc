use std::{
    fmt,
    path::PathBuf,
    sync::{Arc, OnceLock},
    thread,
};

use anyhow::{anyhow, Result};
use serde_json::Value;
use shared_event_bus::{EventPublisher, EventRecord};
use shared_logging::{JsonLogger, LogLevel, LogRecord, LogSink};
use tokio::{
    runtime::{Builder, Handle, Runtime, RuntimeFlavor},
    task,
};

/// Builder for pruning telemetry sinks.
pub struct PruningTelemetryBuilder {
    module: String,
    log_path: Option<PathBuf>,
    log_sink: Option<Arc<dyn LogSink>>,
    event_publisher: Option<Arc<dyn EventPublisher>>,
}

impl PruningTelemetryBuilder {
    /// Creates the builder.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            log_path: None,
            log_sink: None,
            event_publisher: None,
        }
    }

    /// Writes JSON-lines logs to `path`.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Writes logs to an existing sink; takes precedence over `log_path`.
    #[must_use]
    pub fn log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = Some(sink);
        self
    }

    /// Sets the event publisher.
    #[must_use]
    pub fn event_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.event_publisher = Some(publisher);
        self
    }

    /// Builds the telemetry handle.
    pub fn build(self) -> Result<PruningTelemetry> {
        let logger: Option<Arc<dyn LogSink>> = match (self.log_sink, self.log_path) {
            (Some(sink), _) => Some(sink),
            (None, Some(path)) => Some(Arc::new(JsonLogger::new(path)?) as Arc<dyn LogSink>),
            (None, None) => None,
        };
        let event = self.event_publisher.map(EventHandle::new);
        Ok(PruningTelemetry {
            inner: Arc::new(TelemetryInner {
                module: self.module,
                logger,
                event,
            }),
        })
    }
}

/// Telemetry handle shared across pruning components.
#[derive(Clone)]
pub struct PruningTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for PruningTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PruningTelemetry")
            .field("module", &self.inner.module)
            .field("logs", &self.inner.logger.is_some())
            .field("events", &self.inner.event.is_some())
            .finish()
    }
}

struct TelemetryInner {
    module: String,
    logger: Option<Arc<dyn LogSink>>,
    event: Option<EventHandle>,
}

/// Publishes events synchronously so every event has landed when the call
/// returns, whether or not the caller runs inside a tokio runtime.
struct EventHandle {
    fallback: OnceLock<Runtime>,
    publisher: Arc<dyn EventPublisher>,
}

impl EventHandle {
    fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            fallback: OnceLock::new(),
            publisher,
        }
    }

    /// Private runtime, built on first use. Only called from threads that are
    /// not driving a runtime.
    fn fallback(&self) -> Result<&Runtime> {
        if let Some(runtime) = self.fallback.get() {
            return Ok(runtime);
        }
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(self.fallback.get_or_init(|| runtime))
    }

    fn publish(&self, record: EventRecord) -> Result<()> {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                task::block_in_place(|| handle.block_on(self.publisher.publish(record)))
            }
            // A current-thread runtime cannot block its only worker.
            Ok(_) => thread::scope(|scope| {
                scope
                    .spawn(move || self.fallback()?.block_on(self.publisher.publish(record)))
                    .join()
                    .map_err(|_| anyhow!("event publisher thread panicked"))?
            }),
            Err(_) => self.fallback()?.block_on(self.publisher.publish(record)),
        }
    }
}

impl Drop for EventHandle {
    fn drop(&mut self) {
        if let Some(runtime) = self.fallback.take() {
            runtime.shutdown_background();
        }
    }
}

impl PruningTelemetry {
    /// Returns a builder.
    #[must_use]
    pub fn builder(module: impl Into<String>) -> PruningTelemetryBuilder {
        PruningTelemetryBuilder::new(module)
    }

    /// Module name stamped on every record.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.inner.module
    }

    /// Logs a message with structured fields.
    pub fn log(&self, level: LogLevel, message: &str, metadata: Value) -> Result<()> {
        if let Some(logger) = &self.inner.logger {
            let record = LogRecord::new(&self.inner.module, level, message).with_metadata(&metadata);
            logger.write(&record)?;
        }
        Ok(())
    }

    /// Emits an event on the bus.
    pub fn event(&self, event_type: &str, payload: Value) -> Result<()> {
        if let Some(handle) = &self.inner.event {
            handle.publish(EventRecord::new(&*self.inner.module, event_type, payload))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared_event_bus::MemoryEventBus;
    use shared_logging::MemoryLogger;
    use tempfile::tempdir;

    #[test]
    fn telemetry_writes_log_and_event() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("pruning.log");
        let bus = Arc::new(MemoryEventBus::new(16));
        let telemetry = PruningTelemetry::builder("pruning")
            .log_path(&path)
            .event_publisher(bus.clone())
            .build()
            .unwrap();
        telemetry
            .log(LogLevel::Info, "pruning.start", json!({ "pool": 12 }))
            .unwrap();
        telemetry
            .event("pruning.completed", json!({ "selected": [3, 1] }))
            .unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("pruning.start"));
        let events = bus.snapshot();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, "pruning");
    }

    #[test]
    fn sink_takes_precedence_over_path() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("unused.log");
        let sink = Arc::new(MemoryLogger::new());
        let telemetry = PruningTelemetry::builder("pruning")
            .log_path(&path)
            .log_sink(sink.clone())
            .build()
            .unwrap();
        telemetry
            .log(LogLevel::Debug, "pruning.round", json!({ "round": 1 }))
            .unwrap();
        assert_eq!(sink.messages(), vec!["pruning.round".to_string()]);
        assert!(!path.exists());
    }

    fn bus_telemetry(bus: &Arc<MemoryEventBus>) -> PruningTelemetry {
        PruningTelemetry::builder("pruning")
            .event_publisher(bus.clone())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn events_land_inside_current_thread_runtime() {
        let bus = Arc::new(MemoryEventBus::new(8));
        let telemetry = bus_telemetry(&bus);
        telemetry.event("pruning.round.completed", json!({ "round": 1 })).unwrap();
        telemetry.event("pruning.completed", json!({})).unwrap();
        assert_eq!(bus.snapshot().len(), 2);
        drop(telemetry);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn events_land_inside_multi_thread_runtime() {
        let bus = Arc::new(MemoryEventBus::new(8));
        let telemetry = bus_telemetry(&bus);
        telemetry.event("pruning.completed", json!({})).unwrap();
        assert_eq!(bus.events_of_type("pruning.completed").len(), 1);
        drop(telemetry);
    }

    #[test]
    fn fallback_runtime_is_built_on_first_event() {
        let bus = Arc::new(MemoryEventBus::new(8));
        let telemetry = bus_telemetry(&bus);
        let handle = telemetry.inner.event.as_ref().unwrap();
        assert!(handle.fallback.get().is_none());
        telemetry.event("pruning.completed", json!({})).unwrap();
        assert!(handle.fallback.get().is_some());
        assert_eq!(bus.snapshot().len(), 1);
    }

    #[test]
    fn silent_without_sinks() {
        let telemetry = PruningTelemetry::builder("pruning").build().unwrap();
        telemetry
            .log(LogLevel::Info, "pruning.start", json!({}))
            .unwrap();
        telemetry.event("pruning.completed", json!({})).unwrap();
        assert_eq!(telemetry.module(), "pruning");
    }
}
