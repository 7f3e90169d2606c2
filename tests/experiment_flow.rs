//! End-to-end experiment runs through the public API

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use experiment_engine::domain::{
    BetaPrior, EventType, ExperimentConfig, ExperimentId, ParameterSpace, RunOptions, Variant,
    VariantId,
};
use experiment_engine::infrastructure::tracking::{InMemorySink, Tracker};
use experiment_engine::config::{SinkKind, TrackingConfig};
use experiment_engine::{Engine, EngineConfig};
use serde_json::json;
use tokio_test::assert_ok;

#[derive(Debug, Clone)]
struct Point {
    x: i64,
}

fn point_variants(xs: &[i64]) -> Vec<Variant<Point>> {
    xs.iter()
        .enumerate()
        .map(|(i, x)| Variant::unnamed(VariantId::new(format!("v{}", i + 1)).unwrap(), Point { x: *x }))
        .collect()
}

fn tracked_engine() -> (Engine, Arc<InMemorySink>) {
    let sink = Arc::new(InMemorySink::new());
    let tracker = Tracker::spawn(sink.clone(), 1024).unwrap();
    (Engine::with_tracker(tracker, &EngineConfig::default()), sink)
}

/// Fails on variant two, doubles the rest
fn three_variants_second_fails() -> ExperimentConfig<Point, i64> {
    ExperimentConfig::new(
        ExperimentId::new("isolation").unwrap(),
        "Failure isolation",
        point_variants(&[1, 2, 3]),
        |config: Point, _ctx| async move {
            if config.x == 2 {
                Err(anyhow!("variant two is broken"))
            } else {
                Ok(config.x * 2)
            }
        },
    )
    .with_metric(|r: &i64| Ok(*r as f64))
}

#[tokio::test]
async fn sequential_run_picks_highest_metric() {
    let (engine, _sink) = tracked_engine();
    let config = ExperimentConfig::new(
        ExperimentId::new("double").unwrap(),
        "Double x",
        point_variants(&[1, 2]),
        |config: Point, _ctx| async move { Ok(config.x * 2) },
    )
    .with_metric(|r: &i64| Ok(*r as f64));

    let summary = assert_ok!(engine.orchestrator.run(&config, RunOptions::sequential()).await);

    assert_eq!(summary.results.len(), 2);
    assert_eq!(summary.results[0].variant_id.as_str(), "v1");
    assert_eq!(summary.results[0].metric_value, Some(2.0));
    assert!(summary.results[0].success);
    assert_eq!(summary.results[1].variant_id.as_str(), "v2");
    assert_eq!(summary.results[1].metric_value, Some(4.0));
    assert!(summary.results[1].success);
    assert_eq!(summary.best_variant_id().map(|id| id.as_str()), Some("v2"));
}

#[tokio::test]
async fn failing_variant_is_isolated() {
    let (engine, _sink) = tracked_engine();
    let config = three_variants_second_fails();

    let summary = assert_ok!(engine.orchestrator.run(&config, RunOptions::new()).await);

    assert_eq!(summary.results.len(), 3);
    assert_eq!(summary.success_count, 2);
    assert_eq!(summary.failure_count, 1);
    assert_eq!(summary.failures().count(), 1);
    assert_eq!(summary.best_variant_id().map(|id| id.as_str()), Some("v3"));

    let failed = summary.result_for("v2").unwrap();
    assert!(!failed.success);
    assert!(failed.result.is_none());
    assert_eq!(failed.error.as_ref().unwrap().message, "variant two is broken");
}

#[tokio::test]
async fn stop_on_error_skips_remaining_variants() {
    let (engine, _sink) = tracked_engine();
    let config = three_variants_second_fails();
    let options = RunOptions::sequential().with_stop_on_error(true);

    let summary = assert_ok!(engine.orchestrator.run(&config, options).await);

    assert_eq!(summary.results.len(), 2);
    assert!(summary.result_for("v3").is_none());
}

#[tokio::test]
async fn parameter_space_drives_experiment() {
    let (engine, sink) = tracked_engine();
    let space = ParameterSpace::builder()
        .param("x", [1i64, 2, 3])
        .param("y", [10, 20])
        .build()
        .unwrap();
    assert_eq!(space.count(), 6);

    let variants = space.variants("grid").unwrap();
    let config = ExperimentConfig::new(
        ExperimentId::new("grid-search").unwrap(),
        "Grid search",
        variants,
        |combo, ctx| async move {
            let x = *combo.get("x").ok_or_else(|| anyhow!("missing x"))?;
            let y = *combo.get("y").ok_or_else(|| anyhow!("missing y"))?;
            let offset = ctx.data["offset"].as_i64().unwrap_or(0);
            Ok(x * y - offset)
        },
    )
    .with_metric(|r: &i64| Ok(*r as f64));

    let options = RunOptions::new()
        .with_max_concurrency(4)
        .with_context_data(json!({ "offset": 5 }));
    let summary = assert_ok!(engine.orchestrator.run(&config, options).await);
    engine.flush().await;

    assert_eq!(summary.results.len(), 6);
    assert_eq!(summary.success_count, 6);

    let best = summary.best_variant().unwrap();
    assert_eq!(best.variant_id.as_str(), "grid-5");
    assert_eq!(best.variant_name, "x=3, y=20");
    assert_eq!(best.metric_value, Some(55.0));

    let events = sink.events_for_experiment("grid-search").unwrap();
    let count = |t: EventType| events.iter().filter(|e| e.event_type == t).count();
    assert_eq!(count(EventType::ExperimentStart), 1);
    assert_eq!(count(EventType::VariantStart), 6);
    assert_eq!(count(EventType::MetricComputed), 6);
    assert_eq!(count(EventType::VariantComplete), 6);
    assert_eq!(count(EventType::ExperimentComplete), 1);
}

#[tokio::test]
async fn configured_memory_sink_is_queryable() {
    let config = EngineConfig {
        tracking: TrackingConfig {
            sink: SinkKind::Memory,
            ..Default::default()
        },
        ..Default::default()
    };
    let engine = assert_ok!(Engine::from_config(&config));
    let experiment = three_variants_second_fails();

    assert_ok!(engine.orchestrator.run(&experiment, RunOptions::sequential()).await);
    engine.flush().await;

    let sink = engine.memory_sink().unwrap();
    assert_eq!(sink.events_for_experiment("isolation").unwrap().len(), 10);
    assert_eq!(sink.events_of_type(EventType::VariantError).unwrap().len(), 1);
    assert_eq!(sink.events_of_type(EventType::VariantComplete).unwrap().len(), 2);

    sink.clear().unwrap();
    assert!(sink.is_empty().unwrap());
}

#[tokio::test]
async fn engine_without_memory_sink() {
    let (engine, _sink) = tracked_engine();
    assert!(engine.memory_sink().is_none());

    let engine = assert_ok!(Engine::from_config(&EngineConfig::default()));
    assert!(engine.memory_sink().is_none());
}

#[tokio::test]
async fn summary_serializes_durations_in_millis() {
    let (engine, _sink) = tracked_engine();
    let config = three_variants_second_fails();

    let summary = assert_ok!(engine.orchestrator.run(&config, RunOptions::sequential()).await);
    let value = serde_json::to_value(&summary).unwrap();

    assert_eq!(value["experiment_id"], "isolation");
    assert!(value["total_duration_ms"].is_u64());
    assert!(value["results"][0]["duration_ms"].is_u64());
    assert_eq!(value["results"][1]["success"], false);
}

#[tokio::test]
async fn tracked_outcomes_feed_thompson_sampling() {
    let (engine, sink) = tracked_engine();

    // Arm "fast" succeeds 9 of 10 times, "slow" 1 of 10
    let config = ExperimentConfig::new(
        ExperimentId::new("arms").unwrap(),
        "Arms",
        (0..20)
            .map(|i| {
                let arm = if i < 10 { "fast" } else { "slow" };
                Variant::new(VariantId::new(format!("{}-{}", arm, i)).unwrap(), arm, (arm, i % 10))
            })
            .collect(),
        |(arm, trial): (&'static str, i32), _ctx| async move {
            let succeeded = if arm == "fast" { trial != 0 } else { trial == 0 };
            if succeeded {
                Ok(1.0)
            } else {
                Err(anyhow!("trial failed"))
            }
        },
    );

    let summary = assert_ok!(engine.orchestrator.run(&config, RunOptions::new()).await);

    let mut outcomes: HashMap<&str, (u64, u64)> = HashMap::new();
    for result in &summary.results {
        let entry = outcomes.entry(result.variant_name.as_str()).or_default();
        if result.success {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }
    let priors: HashMap<&str, BetaPrior> = outcomes
        .iter()
        .map(|(arm, (s, f))| (*arm, BetaPrior::from_outcomes(*s, *f)))
        .collect();

    let fast_wins = (0..500)
        .filter(|_| {
            engine
                .decisions
                .decide_thompson_sampling(&["fast", "slow"], &priors)
                .unwrap()
                .selected
                == "fast"
        })
        .count();
    assert!(fast_wins > 450, "fast selected {} times", fast_wins);

    engine.flush().await;
    assert_eq!(sink.events_of_type(EventType::DecisionMade).unwrap().len(), 500);
}
