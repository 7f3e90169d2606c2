//! Experiment Engine
//!
//! Runs named variants of a caller-supplied async procedure and picks
//! options adaptively:
//! - Cartesian parameter spaces with enumeration, filtering and sampling
//! - Sequential, parallel and concurrency-bounded experiment runs
//! - Score, weighted, epsilon-greedy, Thompson sampling and UCB1 decisions
//! - Non-blocking event tracking to console, file or memory sinks

pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::EngineConfig;
pub use domain::DomainError;

use std::sync::Arc;

use infrastructure::{
    decision::DecisionEngine,
    experiment::ExperimentOrchestrator,
    tracking::{InMemorySink, SinkFactory, Tracker},
};
use tracing::info;

/// Orchestrator and decision engine sharing one tracker
#[derive(Debug, Clone)]
pub struct Engine {
    pub orchestrator: ExperimentOrchestrator,
    pub decisions: DecisionEngine,
    tracker: Tracker,
    memory_sink: Option<Arc<InMemorySink>>,
}

impl Engine {
    /// Build an engine from configuration. The tracker's consumer task is
    /// spawned on the current Tokio runtime.
    pub fn from_config(config: &EngineConfig) -> Result<Self, DomainError> {
        let (tracker, memory_sink) =
            SinkFactory::new().create_tracker_with_memory(&config.tracking)?;
        info!(sink = %config.tracking.sink, "Experiment engine created");
        Ok(Self {
            memory_sink,
            ..Self::with_tracker(tracker, config)
        })
    }

    /// Build an engine around an existing tracker
    pub fn with_tracker(tracker: Tracker, config: &EngineConfig) -> Self {
        Self {
            orchestrator: ExperimentOrchestrator::new(tracker.clone()),
            decisions: DecisionEngine::from_config(&config.decision, tracker.clone()),
            tracker,
            memory_sink: None,
        }
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// The sink holding tracked events when configuration selected the
    /// `memory` sink
    pub fn memory_sink(&self) -> Option<&Arc<InMemorySink>> {
        self.memory_sink.as_ref()
    }

    /// Wait for queued events to reach the sink
    pub async fn flush(&self) {
        self.tracker.flush().await;
    }
}

/// Load configuration, install logging and build an engine
pub fn create_engine() -> anyhow::Result<Engine> {
    let config = EngineConfig::load()?;
    infrastructure::logging::init_logging(&config.logging)?;
    Ok(Engine::from_config(&config)?)
}
