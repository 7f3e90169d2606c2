//! Tracking sink factory for runtime selection

use std::sync::Arc;

use crate::config::{SinkKind, TrackingConfig};
use crate::domain::tracking::TrackingSink;
use crate::domain::DomainError;

use super::console::{ConsoleSink, NoopSink};
use super::file::FileSink;
use super::in_memory::InMemorySink;
use super::tracker::Tracker;

impl std::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkKind::Console => write!(f, "console"),
            SinkKind::File => write!(f, "file"),
            SinkKind::Memory => write!(f, "memory"),
            SinkKind::None => write!(f, "none"),
        }
    }
}

impl std::str::FromStr for SinkKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "console" | "stdout" => Ok(SinkKind::Console),
            "file" | "jsonl" => Ok(SinkKind::File),
            "memory" | "in_memory" | "inmemory" => Ok(SinkKind::Memory),
            "none" | "noop" | "off" => Ok(SinkKind::None),
            _ => Err(DomainError::configuration(format!(
                "Unknown tracking sink: {}. Valid sinks: console, file, memory, none",
                s
            ))),
        }
    }
}

/// Factory for creating tracking sinks
#[derive(Debug, Default)]
pub struct SinkFactory;

impl SinkFactory {
    pub fn new() -> Self {
        Self
    }

    /// Creates the sink selected by configuration
    pub fn create(&self, config: &TrackingConfig) -> Result<Arc<dyn TrackingSink>, DomainError> {
        match config.sink {
            SinkKind::Console => Ok(Arc::new(ConsoleSink::new())),
            SinkKind::File => {
                if config.file_path.trim().is_empty() {
                    return Err(DomainError::configuration(
                        "tracking.file_path is required for the file sink",
                    ));
                }
                Ok(Arc::new(FileSink::new(&config.file_path)))
            }
            SinkKind::Memory => Ok(Arc::new(InMemorySink::with_max_events(
                config.memory_max_events,
            ))),
            SinkKind::None => Ok(Arc::new(NoopSink)),
        }
    }

    /// Creates the configured sink and starts a tracker in front of it.
    /// `SinkKind::None` yields a disabled tracker without a consumer task.
    pub fn create_tracker(&self, config: &TrackingConfig) -> Result<Tracker, DomainError> {
        if config.sink == SinkKind::None {
            return Ok(Tracker::disabled());
        }

        let sink = self.create(config)?;
        tracing::debug!(sink = %config.sink, capacity = config.channel_capacity, "Starting tracker");
        Tracker::spawn(sink, config.channel_capacity)
    }

    /// Like [`create_tracker`](Self::create_tracker), but also hands back the
    /// sink when it is `SinkKind::Memory` so its events can be queried
    pub fn create_tracker_with_memory(
        &self,
        config: &TrackingConfig,
    ) -> Result<(Tracker, Option<Arc<InMemorySink>>), DomainError> {
        if config.sink != SinkKind::Memory {
            return Ok((self.create_tracker(config)?, None));
        }

        let sink = Arc::new(InMemorySink::with_max_events(config.memory_max_events));
        tracing::debug!(sink = %config.sink, capacity = config.channel_capacity, "Starting tracker");
        let tracker = Tracker::spawn(sink.clone(), config.channel_capacity)?;
        Ok((tracker, Some(sink)))
    }
}
