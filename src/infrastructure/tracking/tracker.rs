//! Non-blocking event dispatch to a tracking sink
//!
//! Events go through a bounded channel to a single background task that owns
//! the sink. Producers never wait: when the channel is full the event is
//! dropped and a warning is logged.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::domain::tracking::{TrackingEvent, TrackingSink};
use crate::domain::DomainError;

/// Default capacity of the event channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug)]
enum Command {
    Event(TrackingEvent),
    Flush(oneshot::Sender<()>),
}

/// Cloneable handle used by the engine to emit events
#[derive(Debug, Clone)]
pub struct Tracker {
    sender: Option<mpsc::Sender<Command>>,
}

impl Tracker {
    /// Start a consumer task for `sink` on the current Tokio runtime
    pub fn spawn(sink: Arc<dyn TrackingSink>, capacity: usize) -> Result<Self, DomainError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| {
            DomainError::configuration("Tracker requires a running Tokio runtime")
        })?;

        let (sender, receiver) = mpsc::channel(capacity.max(1));
        handle.spawn(consume(sink, receiver));

        Ok(Self {
            sender: Some(sender),
        })
    }

    /// A tracker that discards every event
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Queue an event without waiting
    pub fn track(&self, event: TrackingEvent) {
        let Some(sender) = &self.sender else {
            return;
        };

        match sender.try_send(Command::Event(event)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(Command::Event(event))) => {
                warn!(event_type = %event.event_type, "Tracking channel full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Tracking consumer stopped, dropping event");
            }
            Err(mpsc::error::TrySendError::Full(Command::Flush(_))) => {}
        }
    }

    /// Wait until every event queued before this call reached the sink, then
    /// flush the sink
    pub async fn flush(&self) {
        let Some(sender) = &self.sender else {
            return;
        };

        let (done, flushed) = oneshot::channel();

        if sender.send(Command::Flush(done)).await.is_err() {
            warn!("Tracking consumer stopped before flush");
            return;
        }

        let _ = flushed.await;
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::disabled()
    }
}

async fn consume(sink: Arc<dyn TrackingSink>, mut receiver: mpsc::Receiver<Command>) {
    debug!(sink = sink.name(), "Tracking consumer started");

    while let Some(command) = receiver.recv().await {
        match command {
            Command::Event(event) => deliver(sink.as_ref(), event).await,
            Command::Flush(done) => {
                flush_sink(sink.as_ref()).await;
                let _ = done.send(());
            }
        }
    }

    flush_sink(sink.as_ref()).await;
    debug!(sink = sink.name(), "Tracking consumer stopped");
}

async fn deliver(sink: &dyn TrackingSink, event: TrackingEvent) {
    let event_type = event.event_type;

    match AssertUnwindSafe(sink.track(event)).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(sink = sink.name(), event_type = %event_type, error = %e, "Failed to track event");
        }
        Err(_) => {
            warn!(sink = sink.name(), event_type = %event_type, "Tracking sink panicked");
        }
    }
}

async fn flush_sink(sink: &dyn TrackingSink) {
    match AssertUnwindSafe(sink.flush()).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(sink = sink.name(), error = %e, "Failed to flush tracking sink"),
        Err(_) => warn!(sink = sink.name(), "Tracking sink panicked during flush"),
    }
}
