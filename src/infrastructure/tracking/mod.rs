//! Tracking sinks and the background event dispatcher

mod composite;
mod console;
mod factory;
mod file;
mod in_memory;
mod tracker;

pub use composite::CompositeSink;
pub use console::{ConsoleSink, NoopSink};
pub use factory::SinkFactory;
pub use file::FileSink;
pub use in_memory::InMemorySink;
pub use tracker::{Tracker, DEFAULT_CHANNEL_CAPACITY};
