//! Fan-out tracking sink

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::warn;

use crate::domain::tracking::{TrackingEvent, TrackingSink};
use crate::domain::DomainError;

/// Forwards every event to all inner sinks. Every sink receives the event
/// even when an earlier one fails; the first error is returned.
#[derive(Clone, Default)]
pub struct CompositeSink {
    sinks: Vec<Arc<dyn TrackingSink>>,
}

impl CompositeSink {
    pub fn new(sinks: Vec<Arc<dyn TrackingSink>>) -> Self {
        Self { sinks }
    }

    pub fn with_sink(mut self, sink: Arc<dyn TrackingSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    fn first_error(
        &self,
        results: Vec<Result<(), DomainError>>,
    ) -> Result<(), DomainError> {
        let mut first = None;

        for (sink, result) in self.sinks.iter().zip(results) {
            if let Err(e) = result {
                warn!(sink = sink.name(), error = %e, "Inner tracking sink failed");
                first.get_or_insert(e);
            }
        }

        first.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for CompositeSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.sinks.iter().map(|s| s.name()).collect();
        f.debug_struct("CompositeSink").field("sinks", &names).finish()
    }
}

#[async_trait]
impl TrackingSink for CompositeSink {
    fn name(&self) -> &'static str {
        "composite"
    }

    async fn track(&self, event: TrackingEvent) -> Result<(), DomainError> {
        let results = join_all(self.sinks.iter().map(|sink| sink.track(event.clone()))).await;
        self.first_error(results)
    }

    async fn flush(&self) -> Result<(), DomainError> {
        let results = join_all(self.sinks.iter().map(|sink| sink.flush())).await;
        self.first_error(results)
    }
}
