//! Tracking domain module
//!
//! Structured telemetry events and the sink interface that consumes them.

mod event;
mod sink;

pub use event::{EventType, TrackingEvent};
pub use sink::TrackingSink;

#[cfg(test)]
pub use sink::MockTrackingSink;
