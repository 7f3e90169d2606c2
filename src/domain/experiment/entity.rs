//! Experiment domain entities

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};

use super::run::RunContext;
use super::validation::{
    ExperimentValidationError, validate_experiment_id, validate_variant_id, validate_variant_ids,
};

// ============================================================================
// ExperimentId
// ============================================================================

/// Unique identifier for an experiment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExperimentId(String);

impl ExperimentId {
    /// Create a new experiment ID with validation
    pub fn new(id: impl Into<String>) -> Result<Self, ExperimentValidationError> {
        let id = id.into();
        validate_experiment_id(&id)?;
        Ok(Self(id))
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ExperimentId {
    type Error = ExperimentValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ExperimentId> for String {
    fn from(id: ExperimentId) -> Self {
        id.0
    }
}

impl fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ExperimentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// VariantId
// ============================================================================

/// Unique identifier for a variant within an experiment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VariantId(String);

impl VariantId {
    /// Create a new variant ID with validation
    pub fn new(id: impl Into<String>) -> Result<Self, ExperimentValidationError> {
        let id = id.into();
        validate_variant_id(&id)?;
        Ok(Self(id))
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for VariantId {
    type Error = ExperimentValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VariantId> for String {
    fn from(id: VariantId) -> Self {
        id.0
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for VariantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Variant
// ============================================================================

/// One concrete configuration under test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant<C> {
    id: VariantId,
    name: String,
    config: C,
}

impl<C> Variant<C> {
    /// Create a new variant
    pub fn new(id: VariantId, name: impl Into<String>, config: C) -> Self {
        Self {
            id,
            name: name.into(),
            config,
        }
    }

    /// Create a variant whose name is its id
    pub fn unnamed(id: VariantId, config: C) -> Self {
        let name = id.as_str().to_string();
        Self { id, name, config }
    }

    /// Get the variant ID
    pub fn id(&self) -> &VariantId {
        &self.id
    }

    /// Get the variant name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the variant configuration
    pub fn config(&self) -> &C {
        &self.config
    }
}

// ============================================================================
// ExperimentConfig
// ============================================================================

/// Procedure under test. Receives a copy of the variant config and the run
/// context.
pub type ExecuteFn<C, R> =
    Arc<dyn Fn(C, RunContext) -> BoxFuture<'static, anyhow::Result<R>> + Send + Sync>;

/// Derives the scalar metric from a procedure result
pub type MetricFn<R> = Arc<dyn Fn(&R) -> BoxFuture<'static, anyhow::Result<f64>> + Send + Sync>;

/// Everything needed to run an experiment: the variants, the procedure and
/// an optional metric.
///
/// The procedure may be invoked concurrently for different variants; the
/// engine provides no isolation between those invocations.
pub struct ExperimentConfig<C, R> {
    id: ExperimentId,
    name: String,
    variants: Vec<Variant<C>>,
    execute: ExecuteFn<C, R>,
    metric: Option<MetricFn<R>>,
}

impl<C, R> ExperimentConfig<C, R>
where
    C: Clone + Send + 'static,
    R: Send + 'static,
{
    /// Create an experiment config from an async procedure
    pub fn new<F, Fut>(
        id: ExperimentId,
        name: impl Into<String>,
        variants: Vec<Variant<C>>,
        execute: F,
    ) -> Self
    where
        F: Fn(C, RunContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        Self {
            id,
            name: name.into(),
            variants,
            execute: Arc::new(move |config: C, context: RunContext| {
                execute(config, context).boxed()
            }),
            metric: None,
        }
    }

    /// Set a synchronous metric function
    pub fn with_metric<F>(mut self, metric: F) -> Self
    where
        F: Fn(&R) -> anyhow::Result<f64> + Send + Sync + 'static,
    {
        self.metric = Some(Arc::new(move |result: &R| {
            let value = metric(result);
            async move { value }.boxed()
        }));
        self
    }

    /// Set an asynchronous metric function
    pub fn with_async_metric<F, Fut>(mut self, metric: F) -> Self
    where
        R: Clone,
        F: Fn(R) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<f64>> + Send + 'static,
    {
        self.metric = Some(Arc::new(move |result: &R| metric(result.clone()).boxed()));
        self
    }
}

impl<C, R> ExperimentConfig<C, R> {
    /// Get the experiment ID
    pub fn id(&self) -> &ExperimentId {
        &self.id
    }

    /// Get the experiment name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the variants in run order
    pub fn variants(&self) -> &[Variant<C>] {
        &self.variants
    }

    pub fn has_metric(&self) -> bool {
        self.metric.is_some()
    }

    pub(crate) fn execute_fn(&self) -> &ExecuteFn<C, R> {
        &self.execute
    }

    pub(crate) fn metric_fn(&self) -> Option<&MetricFn<R>> {
        self.metric.as_ref()
    }

    /// Check the variant list is non-empty and ids are unique
    pub fn validate(&self) -> Result<(), ExperimentValidationError> {
        validate_variant_ids(self.variants.iter().map(|v| v.id().as_str()))
    }
}

impl<C: fmt::Debug, R> fmt::Debug for ExperimentConfig<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExperimentConfig")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("variants", &self.variants)
            .field("has_metric", &self.metric.is_some())
            .finish()
    }
}

impl<C: Clone, R> Clone for ExperimentConfig<C, R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            variants: self.variants.clone(),
            execute: Arc::clone(&self.execute),
            metric: self.metric.clone(),
        }
    }
}
