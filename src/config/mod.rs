//! Engine configuration

mod app_config;

pub use app_config::{
    DecisionConfig, EngineConfig, LogFormat, LoggingConfig, OrchestratorConfig, SinkKind,
    TrackingConfig,
};
