//! Options controlling how an experiment is run

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::entity::Variant;
use super::result::{VariantError, VariantResult};

/// Called just before a variant is handed to the runner
pub type VariantStartHook<C> = Arc<dyn Fn(&Variant<C>) + Send + Sync>;

/// Called with every successful variant result
pub type VariantCompleteHook<R> = Arc<dyn Fn(&VariantResult<R>) + Send + Sync>;

/// Called with every failed variant and its error
pub type VariantErrorHook<C> = Arc<dyn Fn(&Variant<C>, &VariantError) + Send + Sync>;

/// Execution policy for one experiment run
pub struct RunOptions<C, R> {
    /// Launch variants concurrently (default true)
    pub parallel: bool,
    /// Batch size for parallel runs; `None` or 0 means unbounded
    pub max_concurrency: Option<usize>,
    /// Stop scheduling new variants after a failure
    pub stop_on_error: bool,
    /// Read-only data shared with every run
    pub context_data: Arc<Value>,
    on_variant_start: Option<VariantStartHook<C>>,
    on_variant_complete: Option<VariantCompleteHook<R>>,
    on_variant_error: Option<VariantErrorHook<C>>,
}

impl<C, R> Default for RunOptions<C, R> {
    fn default() -> Self {
        Self {
            parallel: true,
            max_concurrency: None,
            stop_on_error: false,
            context_data: Arc::new(Value::Null),
            on_variant_start: None,
            on_variant_complete: None,
            on_variant_error: None,
        }
    }
}

impl<C, R> RunOptions<C, R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run variants one after another
    pub fn sequential() -> Self {
        Self::default().with_parallel(false)
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = Some(max_concurrency);
        self
    }

    pub fn with_stop_on_error(mut self, stop_on_error: bool) -> Self {
        self.stop_on_error = stop_on_error;
        self
    }

    pub fn with_context_data(mut self, data: Value) -> Self {
        self.context_data = Arc::new(data);
        self
    }

    pub fn on_variant_start<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Variant<C>) + Send + Sync + 'static,
    {
        self.on_variant_start = Some(Arc::new(hook));
        self
    }

    pub fn on_variant_complete<F>(mut self, hook: F) -> Self
    where
        F: Fn(&VariantResult<R>) + Send + Sync + 'static,
    {
        self.on_variant_complete = Some(Arc::new(hook));
        self
    }

    pub fn on_variant_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Variant<C>, &VariantError) + Send + Sync + 'static,
    {
        self.on_variant_error = Some(Arc::new(hook));
        self
    }

    /// Effective batch size, if bounded
    pub fn concurrency_limit(&self) -> Option<usize> {
        self.max_concurrency.filter(|limit| *limit > 0)
    }

    pub(crate) fn notify_start(&self, variant: &Variant<C>) {
        if let Some(hook) = &self.on_variant_start {
            hook(variant);
        }
    }

    pub(crate) fn notify_finished(&self, variant: &Variant<C>, result: &VariantResult<R>) {
        match &result.error {
            None => {
                if let Some(hook) = &self.on_variant_complete {
                    hook(result);
                }
            }
            Some(error) => {
                if let Some(hook) = &self.on_variant_error {
                    hook(variant, error);
                }
            }
        }
    }
}

impl<C, R> Clone for RunOptions<C, R> {
    fn clone(&self) -> Self {
        Self {
            parallel: self.parallel,
            max_concurrency: self.max_concurrency,
            stop_on_error: self.stop_on_error,
            context_data: Arc::clone(&self.context_data),
            on_variant_start: self.on_variant_start.clone(),
            on_variant_complete: self.on_variant_complete.clone(),
            on_variant_error: self.on_variant_error.clone(),
        }
    }
}

impl<C, R> fmt::Debug for RunOptions<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("parallel", &self.parallel)
            .field("max_concurrency", &self.max_concurrency)
            .field("stop_on_error", &self.stop_on_error)
            .field("context_data", &self.context_data)
            .finish_non_exhaustive()
    }
}
