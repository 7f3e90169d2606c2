//! Decision engine
//!
//! Weighted sampling, epsilon-greedy, Thompson sampling and UCB1 over
//! caller-owned statistics, plus plain score-based selection.

mod engine;

pub use engine::DecisionEngine;
