//! Infrastructure layer - Runners, strategies, sinks and logging

pub mod decision;
pub mod experiment;
pub mod logging;
pub mod tracking;
