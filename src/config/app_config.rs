use serde::Deserialize;

use crate::domain::decision::DEFAULT_EXPLORATION_FACTOR;
use crate::domain::experiment::RunOptions;

/// Engine configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub logging: LoggingConfig,
    pub orchestrator: OrchestratorConfig,
    pub tracking: TrackingConfig,
    pub decision: DecisionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Default execution policy for experiment runs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub parallel: bool,
    pub max_concurrency: Option<usize>,
    pub stop_on_error: bool,
}

/// Where tracking events go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Console,
    File,
    Memory,
    None,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub sink: SinkKind,
    /// JSON lines file used by the file sink
    pub file_path: String,
    /// Capacity of the event channel in front of the sink
    pub channel_capacity: usize,
    /// Events kept by the in-memory sink before the oldest are dropped
    pub memory_max_events: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub exploration_factor: f64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            max_concurrency: None,
            stop_on_error: false,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            sink: SinkKind::default(),
            file_path: "experiment-events.jsonl".to_string(),
            channel_capacity: 1024,
            memory_max_events: 100_000,
        }
    }
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            exploration_factor: DEFAULT_EXPLORATION_FACTOR,
        }
    }
}

impl EngineConfig {
    /// Load from `config/default`, `config/local` and `ENGINE__*` variables
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("ENGINE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl<C, R> From<&OrchestratorConfig> for RunOptions<C, R> {
    fn from(config: &OrchestratorConfig) -> Self {
        let mut options = RunOptions::new()
            .with_parallel(config.parallel)
            .with_stop_on_error(config.stop_on_error);
        options.max_concurrency = config.max_concurrency;
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.orchestrator.parallel);
        assert_eq!(config.tracking.sink, SinkKind::Console);
        assert_eq!(config.tracking.channel_capacity, 1024);
        assert_eq!(config.decision.exploration_factor, DEFAULT_EXPLORATION_FACTOR);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let source = r#"
            [orchestrator]
            max_concurrency = 4
            stop_on_error = true

            [tracking]
            sink = "memory"
        "#;

        let config: EngineConfig = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!(config.orchestrator.parallel);
        assert_eq!(config.orchestrator.max_concurrency, Some(4));
        assert!(config.orchestrator.stop_on_error);
        assert_eq!(config.tracking.sink, SinkKind::Memory);
        assert_eq!(config.tracking.file_path, "experiment-events.jsonl");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_run_options_from_config() {
        let config = OrchestratorConfig {
            parallel: true,
            max_concurrency: Some(2),
            stop_on_error: true,
        };
        let options: RunOptions<i32, i32> = (&config).into();
        assert_eq!(options.concurrency_limit(), Some(2));
        assert!(options.stop_on_error);
    }
}
