//! In-memory tracking sink

use std::collections::VecDeque;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::tracking::{EventType, TrackingEvent, TrackingSink};
use crate::domain::DomainError;

/// Keeps events in memory, dropping the oldest beyond `max_events`
#[derive(Debug)]
pub struct InMemorySink {
    events: RwLock<VecDeque<TrackingEvent>>,
    max_events: usize,
}

impl InMemorySink {
    /// Create a new empty sink with default max events (100,000)
    pub fn new() -> Self {
        Self::with_max_events(100_000)
    }

    /// Create a sink with a custom max events limit
    pub fn with_max_events(max_events: usize) -> Self {
        Self {
            events: RwLock::new(VecDeque::new()),
            max_events: max_events.max(1),
        }
    }

    /// All retained events, oldest first
    pub fn events(&self) -> Result<Vec<TrackingEvent>, DomainError> {
        self.query(|_| true)
    }

    pub fn events_of_type(&self, event_type: EventType) -> Result<Vec<TrackingEvent>, DomainError> {
        self.query(|e| e.event_type == event_type)
    }

    pub fn events_for_experiment(
        &self,
        experiment_id: &str,
    ) -> Result<Vec<TrackingEvent>, DomainError> {
        self.query(|e| e.experiment_id() == Some(experiment_id))
    }

    pub fn len(&self) -> Result<usize, DomainError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, DomainError> {
        Ok(self.read()?.is_empty())
    }

    pub fn clear(&self) -> Result<(), DomainError> {
        self.events
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?
            .clear();
        Ok(())
    }

    fn query<F>(&self, predicate: F) -> Result<Vec<TrackingEvent>, DomainError>
    where
        F: Fn(&TrackingEvent) -> bool,
    {
        Ok(self
            .read()?
            .iter()
            .filter(|e| predicate(e))
            .cloned()
            .collect())
    }

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, VecDeque<TrackingEvent>>, DomainError> {
        self.events
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))
    }
}

impl Default for InMemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrackingSink for InMemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn track(&self, event: TrackingEvent) -> Result<(), DomainError> {
        let mut events = self
            .events
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        events.push_back(event);
        while events.len() > self.max_events {
            events.pop_front();
        }

        Ok(())
    }
}
