//! Decision strategies over caller-supplied options and statistics

use std::cmp::Ordering;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;

use futures::future::join_all;
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::DecisionConfig;
use crate::domain::decision::{
    ArmStats, BetaPrior, DEFAULT_EXPLORATION_FACTOR, DecideOptions, Decision, DecisionError,
    ScoredOption, Strategy, UcbOptions, WeightedOption, sample_beta,
};
use crate::domain::tracking::TrackingEvent;
use crate::domain::DomainError;
use crate::infrastructure::tracking::Tracker;

/// Picks one option per call. Holds no statistics between calls; every
/// decision emits a `decision.made` event.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    tracker: Tracker,
    exploration_factor: f64,
}

impl DecisionEngine {
    pub fn new(tracker: Tracker) -> Self {
        Self {
            tracker,
            exploration_factor: DEFAULT_EXPLORATION_FACTOR,
        }
    }

    pub fn from_config(config: &DecisionConfig, tracker: Tracker) -> Self {
        Self::new(tracker).with_exploration_factor(config.exploration_factor)
    }

    /// Default exploration factor handed out by [`Self::ucb_options`]
    pub fn with_exploration_factor(mut self, exploration_factor: f64) -> Self {
        self.exploration_factor = exploration_factor;
        self
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// UCB options using this engine's exploration factor
    pub fn ucb_options(&self, total_count: u64) -> UcbOptions {
        UcbOptions::new(total_count).with_exploration_factor(self.exploration_factor)
    }

    // ------------------------------------------------------------------------
    // Score
    // ------------------------------------------------------------------------

    /// Score every option concurrently and pick the highest. Ties keep input
    /// order.
    pub async fn decide<T, F, Fut>(
        &self,
        options: &[T],
        score: F,
        decide_options: DecideOptions,
    ) -> Result<Decision<T>, DomainError>
    where
        T: Clone + Serialize,
        F: Fn(&T) -> Fut,
        Fut: Future<Output = f64>,
    {
        if options.is_empty() {
            return Err(DecisionError::EmptyOptions.into());
        }

        let ranked = rank(options, &score).await;
        let best = &ranked[0];
        let mut decision = Decision::new(Strategy::Score, best.value.clone(), best.score);

        self.emit(
            Strategy::Score,
            json!({
                "selected": audit_value(&decision.selected),
                "score": decision.score,
                "option_count": options.len(),
            }),
        );

        if decide_options.return_all {
            decision.ranked = Some(ranked);
        }

        Ok(decision)
    }

    // ------------------------------------------------------------------------
    // Weighted
    // ------------------------------------------------------------------------

    pub fn decide_weighted<T>(&self, options: &[WeightedOption<T>]) -> Result<Decision<T>, DomainError>
    where
        T: Clone + Serialize,
    {
        self.decide_weighted_with_rng(options, &mut rand::thread_rng())
    }

    /// Draw `r` uniformly from `[0, total)` and return the first option whose
    /// cumulative weight exceeds it
    pub fn decide_weighted_with_rng<T, R>(
        &self,
        options: &[WeightedOption<T>],
        rng: &mut R,
    ) -> Result<Decision<T>, DomainError>
    where
        T: Clone + Serialize,
        R: Rng + ?Sized,
    {
        if options.is_empty() {
            return Err(DecisionError::EmptyOptions.into());
        }

        if let Some(bad) = options
            .iter()
            .find(|o| !o.weight.is_finite() || o.weight < 0.0)
        {
            return Err(DecisionError::InvalidWeight(bad.weight).into());
        }

        let total: f64 = options.iter().map(|o| o.weight).sum();
        if total <= 0.0 || !total.is_finite() {
            return Err(DecisionError::NonPositiveTotalWeight(total).into());
        }

        let target = rng.gen_range(0.0..total);
        let mut cumulative = 0.0;
        let mut chosen = options.len() - 1;

        for (index, option) in options.iter().enumerate() {
            cumulative += option.weight;
            if cumulative > target {
                chosen = index;
                break;
            }
        }

        let option = &options[chosen];
        let decision = Decision::new(Strategy::Weighted, option.value.clone(), option.weight);

        self.emit(
            Strategy::Weighted,
            json!({
                "selected": audit_value(&decision.selected),
                "weight": option.weight,
                "total_weight": total,
                "option_count": options.len(),
            }),
        );

        Ok(decision)
    }

    // ------------------------------------------------------------------------
    // Epsilon-greedy
    // ------------------------------------------------------------------------

    pub async fn decide_epsilon_greedy<T, F, Fut>(
        &self,
        options: &[T],
        score: F,
        epsilon: f64,
    ) -> Result<Decision<T>, DomainError>
    where
        T: Clone + Serialize,
        F: Fn(&T) -> Fut,
        Fut: Future<Output = f64>,
    {
        let explore = draw_exploration(options.len(), epsilon, &mut rand::thread_rng())?;
        self.epsilon_greedy(options, score, epsilon, explore).await
    }

    /// With probability `epsilon` score one uniformly chosen option, otherwise
    /// score all and take the best
    pub async fn decide_epsilon_greedy_with_rng<T, F, Fut, R>(
        &self,
        options: &[T],
        score: F,
        epsilon: f64,
        rng: &mut R,
    ) -> Result<Decision<T>, DomainError>
    where
        T: Clone + Serialize,
        F: Fn(&T) -> Fut,
        Fut: Future<Output = f64>,
        R: Rng + ?Sized,
    {
        let explore = draw_exploration(options.len(), epsilon, rng)?;
        self.epsilon_greedy(options, score, epsilon, explore).await
    }

    async fn epsilon_greedy<T, F, Fut>(
        &self,
        options: &[T],
        score: F,
        epsilon: f64,
        explore: Option<usize>,
    ) -> Result<Decision<T>, DomainError>
    where
        T: Clone + Serialize,
        F: Fn(&T) -> Fut,
        Fut: Future<Output = f64>,
    {
        let decision = match explore {
            Some(index) => {
                let value = options[index].clone();
                let value_score = score(&value).await;
                let mut decision = Decision::new(Strategy::EpsilonGreedy, value, value_score);
                decision.explored = true;
                decision
            }
            None => {
                let ranked = rank(options, &score).await;
                let best = &ranked[0];
                Decision::new(Strategy::EpsilonGreedy, best.value.clone(), best.score)
            }
        };

        self.emit(
            Strategy::EpsilonGreedy,
            json!({
                "selected": audit_value(&decision.selected),
                "score": decision.score,
                "epsilon": epsilon,
                "explored": decision.explored,
                "option_count": options.len(),
            }),
        );

        Ok(decision)
    }

    // ------------------------------------------------------------------------
    // Thompson sampling
    // ------------------------------------------------------------------------

    /// Options without a prior use `Beta(1, 1)`
    pub fn decide_thompson_sampling<T>(
        &self,
        options: &[T],
        priors: &HashMap<T, BetaPrior>,
    ) -> Result<Decision<T>, DomainError>
    where
        T: Clone + Eq + Hash + Serialize,
    {
        self.decide_thompson_sampling_with_rng(options, priors, &mut rand::thread_rng())
    }

    pub fn decide_thompson_sampling_with_rng<T, R>(
        &self,
        options: &[T],
        priors: &HashMap<T, BetaPrior>,
        rng: &mut R,
    ) -> Result<Decision<T>, DomainError>
    where
        T: Clone + Eq + Hash + Serialize,
        R: Rng + ?Sized,
    {
        if options.is_empty() {
            return Err(DecisionError::EmptyOptions.into());
        }

        let arms: Vec<BetaPrior> = options
            .iter()
            .map(|option| priors.get(option).copied().unwrap_or_default())
            .collect();

        for prior in &arms {
            prior.validate()?;
        }

        let samples: Vec<f64> = arms
            .iter()
            .map(|prior| sample_beta(prior.alpha, prior.beta, rng))
            .collect();

        let chosen = argmax(&samples);
        let prior = arms[chosen];
        let decision = Decision::new(
            Strategy::ThompsonSampling,
            options[chosen].clone(),
            samples[chosen],
        );

        self.emit(
            Strategy::ThompsonSampling,
            json!({
                "selected": audit_value(&decision.selected),
                "sample": decision.score,
                "alpha": prior.alpha,
                "beta": prior.beta,
                "option_count": options.len(),
            }),
        );

        Ok(decision)
    }

    // ------------------------------------------------------------------------
    // UCB1
    // ------------------------------------------------------------------------

    /// Options without statistics count as `{mean: 0, count: 0}`
    pub fn decide_ucb<T>(
        &self,
        options: &[T],
        stats: &HashMap<T, ArmStats>,
        ucb: UcbOptions,
    ) -> Result<Decision<T>, DomainError>
    where
        T: Clone + Eq + Hash + Serialize,
    {
        if options.is_empty() {
            return Err(DecisionError::EmptyOptions.into());
        }
        ucb.validate()?;

        let arms: Vec<ArmStats> = options
            .iter()
            .map(|option| stats.get(option).copied().unwrap_or_default())
            .collect();

        let bounds: Vec<f64> = arms
            .iter()
            .map(|arm| arm.upper_bound(ucb.exploration_factor, ucb.total_count))
            .collect();

        let chosen = argmax(&bounds);
        let arm = arms[chosen];
        let decision = Decision::new(Strategy::Ucb, options[chosen].clone(), bounds[chosen]);

        self.emit(
            Strategy::Ucb,
            json!({
                "selected": audit_value(&decision.selected),
                "ucb": decision.score,
                "mean": arm.mean,
                "count": arm.count,
                "total_count": ucb.total_count,
                "exploration_factor": ucb.exploration_factor,
                "option_count": options.len(),
            }),
        );

        Ok(decision)
    }

    fn emit(&self, strategy: Strategy, data: Value) {
        debug!(strategy = %strategy, selected = %data["selected"], "Decision made");
        self.tracker
            .track(TrackingEvent::decision_made(strategy.as_str(), data));
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(Tracker::disabled())
    }
}

/// Score all options concurrently, then sort descending. The sort is stable
/// so equal scores keep input order.
async fn rank<T, F, Fut>(options: &[T], score: &F) -> Vec<ScoredOption<T>>
where
    T: Clone,
    F: Fn(&T) -> Fut,
    Fut: Future<Output = f64>,
{
    let scores = join_all(options.iter().map(score)).await;

    let mut ranked: Vec<ScoredOption<T>> = options
        .iter()
        .cloned()
        .zip(scores)
        .map(|(value, score)| ScoredOption { value, score })
        .collect();

    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    ranked
}

/// Index of the first maximum
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (index, value) in values.iter().enumerate().skip(1) {
        if *value > values[best] {
            best = index;
        }
    }
    best
}

/// Validate inputs and decide up front whether to explore, so no RNG is held
/// across an await
fn draw_exploration<R: Rng + ?Sized>(
    option_count: usize,
    epsilon: f64,
    rng: &mut R,
) -> Result<Option<usize>, DomainError> {
    if option_count == 0 {
        return Err(DecisionError::EmptyOptions.into());
    }
    if !(0.0..=1.0).contains(&epsilon) {
        return Err(DecisionError::EpsilonOutOfRange(epsilon).into());
    }

    if rng.gen_range(0.0..1.0) < epsilon {
        Ok(Some(rng.gen_range(0..option_count)))
    } else {
        Ok(None)
    }
}

fn audit_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tracking::EventType;
    use crate::infrastructure::tracking::InMemorySink;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn tracked_engine() -> (DecisionEngine, Arc<InMemorySink>) {
        let sink = Arc::new(InMemorySink::new());
        let tracker = Tracker::spawn(sink.clone(), 64).unwrap();
        (DecisionEngine::new(tracker), sink)
    }

    mod decide {
        use super::*;

        #[tokio::test]
        async fn test_picks_highest_score() {
            let engine = DecisionEngine::default();
            let decision = engine
                .decide(&[1, 5, 3], |x| std::future::ready(*x as f64), DecideOptions::default())
                .await
                .unwrap();

            assert_eq!(decision.selected, 5);
            assert_eq!(decision.score, 5.0);
            assert_eq!(decision.strategy, Strategy::Score);
            assert!(decision.ranked.is_none());
        }

        #[tokio::test]
        async fn test_return_all_ranks_descending() {
            let engine = DecisionEngine::default();
            let decision = engine
                .decide(&["a", "b", "c"], |x| {
                    let score = match *x {
                        "a" => 0.2,
                        "b" => 0.9,
                        _ => 0.5,
                    };
                    async move { score }
                }, DecideOptions::ranked())
                .await
                .unwrap();

            let order: Vec<&str> = decision.ranked.unwrap().iter().map(|s| s.value).collect();
            assert_eq!(order, vec!["b", "c", "a"]);
        }

        #[tokio::test]
        async fn test_ties_keep_input_order() {
            let engine = DecisionEngine::default();
            let decision = engine
                .decide(&["first", "second"], |_| std::future::ready(1.0), DecideOptions::default())
                .await
                .unwrap();
            assert_eq!(decision.selected, "first");
        }

        #[tokio::test]
        async fn test_empty_options_fail() {
            let engine = DecisionEngine::default();
            let options: [u32; 0] = [];
            let result = engine
                .decide(&options, |_| std::future::ready(0.0), DecideOptions::default())
                .await;
            assert!(matches!(result, Err(DomainError::Configuration { .. })));
        }

        #[tokio::test]
        async fn test_emits_decision_event() {
            let (engine, sink) = tracked_engine();
            engine
                .decide(&["x", "y"], |x| std::future::ready(if *x == "y" { 1.0 } else { 0.0 }), DecideOptions::default())
                .await
                .unwrap();
            engine.tracker().flush().await;

            let events = sink.events_of_type(EventType::DecisionMade).unwrap();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].data["strategy"], "score");
            assert_eq!(events[0].data["selected"], "y");
        }
    }

    mod weighted {
        use super::*;

        #[test]
        fn test_distribution_follows_weights() {
            let engine = DecisionEngine::default();
            let options = vec![
                WeightedOption::new("A", 0.7),
                WeightedOption::new("B", 0.2),
                WeightedOption::new("C", 0.1),
            ];
            let mut rng = StdRng::seed_from_u64(7);
            let mut counts: HashMap<&str, usize> = HashMap::new();

            for _ in 0..2000 {
                let decision = engine.decide_weighted_with_rng(&options, &mut rng).unwrap();
                *counts.entry(decision.selected).or_default() += 1;
            }

            let a = counts.get("A").copied().unwrap_or(0);
            let b = counts.get("B").copied().unwrap_or(0);
            let c = counts.get("C").copied().unwrap_or(0);
            assert!(a > b && a > c, "counts: {:?}", counts);
        }

        #[test]
        fn test_zero_weight_never_selected() {
            let engine = DecisionEngine::default();
            let options = vec![WeightedOption::new(1, 0.0), WeightedOption::new(2, 1.0)];
            for _ in 0..200 {
                assert_eq!(engine.decide_weighted(&options).unwrap().selected, 2);
            }
        }

        #[test]
        fn test_rejects_bad_weights() {
            let engine = DecisionEngine::default();

            let zero = vec![WeightedOption::new(1, 0.0), WeightedOption::new(2, 0.0)];
            assert!(engine.decide_weighted(&zero).is_err());

            let negative = vec![WeightedOption::new(1, -1.0), WeightedOption::new(2, 3.0)];
            assert!(engine.decide_weighted(&negative).is_err());

            let nan = vec![WeightedOption::new(1, f64::NAN)];
            assert!(engine.decide_weighted(&nan).is_err());

            let empty: Vec<WeightedOption<u8>> = Vec::new();
            assert!(engine.decide_weighted(&empty).is_err());
        }
    }

    mod epsilon_greedy {
        use super::*;

        #[tokio::test]
        async fn test_zero_epsilon_always_exploits() {
            let engine = DecisionEngine::default();
            for _ in 0..50 {
                let decision = engine
                    .decide_epsilon_greedy(&[1, 9, 4], |x| std::future::ready(*x as f64), 0.0)
                    .await
                    .unwrap();
                assert_eq!(decision.selected, 9);
                assert!(!decision.explored);
            }
        }

        #[tokio::test]
        async fn test_full_epsilon_always_explores() {
            let engine = DecisionEngine::default();
            let mut rng = StdRng::seed_from_u64(3);
            for _ in 0..50 {
                let decision = engine
                    .decide_epsilon_greedy_with_rng(&[1, 9, 4], |x| std::future::ready(*x as f64), 1.0, &mut rng)
                    .await
                    .unwrap();
                assert!(decision.explored);
                assert_eq!(decision.score, decision.selected as f64);
            }
        }

        #[tokio::test]
        async fn test_rejects_epsilon_out_of_range() {
            let engine = DecisionEngine::default();
            for epsilon in [-0.1, 1.5, f64::NAN] {
                let result = engine
                    .decide_epsilon_greedy(&[1], |_| std::future::ready(0.0), epsilon)
                    .await;
                assert!(result.is_err());
            }
        }
    }

    mod thompson_sampling {
        use super::*;

        #[test]
        fn test_strong_prior_dominates() {
            let engine = DecisionEngine::default();
            let priors = HashMap::from([
                ("a", BetaPrior::new(50.0, 5.0)),
                ("b", BetaPrior::new(5.0, 50.0)),
            ]);

            let wins = (0..1000)
                .filter(|_| engine.decide_thompson_sampling(&["a", "b"], &priors).unwrap().selected == "a")
                .count();

            assert!(wins > 900, "a selected {} times", wins);
        }

        #[test]
        fn test_missing_prior_uses_uniform() {
            let engine = DecisionEngine::default();
            let priors = HashMap::new();
            let mut rng = StdRng::seed_from_u64(11);

            let decision = engine
                .decide_thompson_sampling_with_rng(&["only"], &priors, &mut rng)
                .unwrap();
            assert_eq!(decision.selected, "only");
            assert!((0.0..=1.0).contains(&decision.score));
        }

        #[test]
        fn test_rejects_invalid_prior() {
            let engine = DecisionEngine::default();
            let priors = HashMap::from([("a", BetaPrior::new(0.0, 1.0))]);
            assert!(engine.decide_thompson_sampling(&["a"], &priors).is_err());
        }

        #[tokio::test]
        async fn test_emits_prior_in_event() {
            let (engine, sink) = tracked_engine();
            let priors = HashMap::from([("a", BetaPrior::new(3.0, 2.0))]);
            engine.decide_thompson_sampling(&["a"], &priors).unwrap();
            engine.tracker().flush().await;

            let events = sink.events().unwrap();
            assert_eq!(events[0].data["strategy"], "thompson_sampling");
            assert_eq!(events[0].data["alpha"], 3.0);
            assert_eq!(events[0].data["beta"], 2.0);
        }
    }

    mod ucb {
        use super::*;

        #[test]
        fn test_prefers_less_sampled_arm_on_equal_means() {
            let engine = DecisionEngine::default();
            let stats = HashMap::from([
                ("a", ArmStats::new(0.5, 100)),
                ("b", ArmStats::new(0.5, 1)),
            ]);

            for factor in [0.1, 1.0, DEFAULT_EXPLORATION_FACTOR] {
                let options = UcbOptions::new(101).with_exploration_factor(factor);
                let decision = engine.decide_ucb(&["a", "b"], &stats, options).unwrap();
                assert_eq!(decision.selected, "b");
            }
        }

        #[test]
        fn test_zero_exploration_is_greedy() {
            let engine = DecisionEngine::default();
            let stats = HashMap::from([
                ("a", ArmStats::new(0.8, 100)),
                ("b", ArmStats::new(0.3, 1)),
            ]);
            let options = UcbOptions::new(101).with_exploration_factor(0.0);

            let decision = engine.decide_ucb(&["a", "b"], &stats, options).unwrap();
            assert_eq!(decision.selected, "a");
            assert!((decision.score - 0.8).abs() < 1e-12);
        }

        #[test]
        fn test_missing_stats_get_bonus() {
            let engine = DecisionEngine::default();
            let stats = HashMap::from([("seen", ArmStats::new(0.9, 50))]);
            let decision = engine
                .decide_ucb(&["seen", "new"], &stats, engine.ucb_options(50))
                .unwrap();
            assert_eq!(decision.selected, "new");
        }

        #[test]
        fn test_rejects_zero_total_count() {
            let engine = DecisionEngine::default();
            let stats = HashMap::new();
            assert!(engine.decide_ucb(&["a"], &stats, UcbOptions::new(0)).is_err());
        }

        #[test]
        fn test_engine_exploration_factor_from_config() {
            let config = DecisionConfig {
                exploration_factor: 2.0,
            };
            let engine = DecisionEngine::from_config(&config, Tracker::disabled());
            assert_eq!(engine.ucb_options(10).exploration_factor, 2.0);
        }
    }

    #[test]
    fn test_argmax_first_maximum() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0, 2.0]), 1);
        assert_eq!(argmax(&[5.0]), 0);
    }
}
