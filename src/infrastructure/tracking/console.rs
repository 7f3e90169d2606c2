//! Console tracking sink

use async_trait::async_trait;
use tracing::info;

use crate::domain::tracking::{TrackingEvent, TrackingSink};
use crate::domain::DomainError;

/// Writes every event to the log under the `experiment_events` target
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TrackingSink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn track(&self, event: TrackingEvent) -> Result<(), DomainError> {
        info!(
            target: "experiment_events",
            event_type = %event.event_type,
            timestamp = %event.timestamp.to_rfc3339(),
            data = %event.data,
            "{}",
            event.event_type
        );
        Ok(())
    }
}

/// Discards every event
#[derive(Debug, Default)]
pub struct NoopSink;

#[async_trait]
impl TrackingSink for NoopSink {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn track(&self, _event: TrackingEvent) -> Result<(), DomainError> {
        Ok(())
    }
}
