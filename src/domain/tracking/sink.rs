//! Tracking sink trait

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::event::TrackingEvent;
use crate::domain::DomainError;

/// Destination for tracking events.
///
/// Sinks may be called from a background task while experiments run; the
/// engine never waits on them for correctness and only logs their errors.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TrackingSink: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Record one event
    async fn track(&self, event: TrackingEvent) -> Result<(), DomainError>;

    /// Persist anything buffered
    async fn flush(&self) -> Result<(), DomainError> {
        Ok(())
    }
}
