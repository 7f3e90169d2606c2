//! Option, statistics and outcome types for decision strategies

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::DecisionError;
use crate::domain::experiment::mean;

// ============================================================================
// Strategy
// ============================================================================

/// Which algorithm produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Score,
    Weighted,
    EpsilonGreedy,
    ThompsonSampling,
    Ucb,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Score => "score",
            Self::Weighted => "weighted",
            Self::EpsilonGreedy => "epsilon_greedy",
            Self::ThompsonSampling => "thompson_sampling",
            Self::Ucb => "ucb",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Inputs
// ============================================================================

/// An option with its selection weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedOption<T> {
    pub value: T,
    pub weight: f64,
}

impl<T> WeightedOption<T> {
    pub fn new(value: T, weight: f64) -> Self {
        Self { value, weight }
    }
}

/// Beta posterior for a Bernoulli arm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaPrior {
    pub alpha: f64,
    pub beta: f64,
}

impl Default for BetaPrior {
    /// Uniform prior
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
        }
    }
}

impl BetaPrior {
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }

    /// Posterior of a uniform prior after the observed outcomes
    pub fn from_outcomes(successes: u64, failures: u64) -> Self {
        Self {
            alpha: 1.0 + successes as f64,
            beta: 1.0 + failures as f64,
        }
    }

    /// Expected success rate
    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }

    pub fn validate(&self) -> Result<(), DecisionError> {
        let valid = |x: f64| x.is_finite() && x > 0.0;
        if valid(self.alpha) && valid(self.beta) {
            Ok(())
        } else {
            Err(DecisionError::InvalidPrior {
                alpha: self.alpha,
                beta: self.beta,
            })
        }
    }
}

/// Running reward statistics for a UCB arm
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ArmStats {
    pub mean: f64,
    pub count: u64,
}

impl ArmStats {
    pub fn new(mean: f64, count: u64) -> Self {
        Self { mean, count }
    }

    /// Statistics of a list of observed rewards
    pub fn from_observations(rewards: &[f64]) -> Self {
        Self {
            mean: mean(rewards),
            count: rewards.len() as u64,
        }
    }

    /// Upper confidence bound:
    /// `mean + exploration_factor * sqrt(ln(total_count) / max(count, 1))`
    pub fn upper_bound(&self, exploration_factor: f64, total_count: u64) -> f64 {
        let pulls = self.count.max(1) as f64;
        self.mean + exploration_factor * ((total_count as f64).ln() / pulls).sqrt()
    }
}

/// Options for [`decide`](crate::infrastructure::decision::DecisionEngine::decide)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecideOptions {
    /// Return every option ranked by score
    pub return_all: bool,
}

impl DecideOptions {
    pub fn ranked() -> Self {
        Self { return_all: true }
    }
}

/// Default UCB1 exploration factor
pub const DEFAULT_EXPLORATION_FACTOR: f64 = std::f64::consts::SQRT_2;

/// Options for UCB decisions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UcbOptions {
    pub exploration_factor: f64,
    /// Total pulls across every arm, including arms not offered this call
    pub total_count: u64,
}

impl UcbOptions {
    pub fn new(total_count: u64) -> Self {
        Self {
            exploration_factor: DEFAULT_EXPLORATION_FACTOR,
            total_count,
        }
    }

    pub fn with_exploration_factor(mut self, exploration_factor: f64) -> Self {
        self.exploration_factor = exploration_factor;
        self
    }

    pub fn validate(&self) -> Result<(), DecisionError> {
        if self.total_count == 0 {
            return Err(DecisionError::ZeroTotalCount);
        }
        if !self.exploration_factor.is_finite() || self.exploration_factor < 0.0 {
            return Err(DecisionError::InvalidExplorationFactor(
                self.exploration_factor,
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// An option paired with its score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredOption<T> {
    pub value: T,
    pub score: f64,
}

/// The option a strategy picked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision<T> {
    pub strategy: Strategy,
    pub selected: T,
    /// Score of the selected option: its score, weight, posterior sample or
    /// upper bound depending on the strategy
    pub score: f64,
    /// Whether epsilon-greedy took the exploration branch
    pub explored: bool,
    /// All options ranked by score, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranked: Option<Vec<ScoredOption<T>>>,
}

impl<T> Decision<T> {
    pub(crate) fn new(strategy: Strategy, selected: T, score: f64) -> Self {
        Self {
            strategy,
            selected,
            score,
            explored: false,
            ranked: None,
        }
    }
}
