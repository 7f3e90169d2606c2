//! Cartesian parameter spaces

use std::collections::HashSet;
use std::fmt::Display;

use rand::Rng;

use super::combination::{Combination, LabeledCombination};
use super::error::ParameterSpaceError;
use crate::domain::experiment::{ExperimentValidationError, Variant, VariantId};

/// Sampling behaviour for [`ParameterSpace::sample`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleOptions {
    /// Sample without replacement (default). When false, each draw is
    /// independent and combinations may repeat.
    pub unique: bool,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self { unique: true }
    }
}

impl SampleOptions {
    pub fn with_replacement() -> Self {
        Self { unique: false }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Parameter<T> {
    name: String,
    values: Vec<T>,
}

/// Named parameters, each with an ordered list of candidate values.
///
/// Every parameter has at least one candidate and names are unique. The
/// space is immutable once built; enumeration follows parameter insertion
/// order with the last parameter varying fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpace<T> {
    parameters: Vec<Parameter<T>>,
}

impl<T> Default for ParameterSpace<T> {
    fn default() -> Self {
        Self {
            parameters: Vec::new(),
        }
    }
}

impl<T: Clone> ParameterSpace<T> {
    /// Start building a parameter space
    pub fn builder() -> ParameterSpaceBuilder<T> {
        ParameterSpaceBuilder::default()
    }

    /// Build a space from `(name, candidates)` pairs
    pub fn new<N, I>(parameters: I) -> Result<Self, ParameterSpaceError>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Vec<T>)>,
    {
        parameters
            .into_iter()
            .fold(Self::builder(), |builder, (name, values)| {
                builder.param(name, values)
            })
            .build()
    }

    /// Parameter names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|p| p.name.as_str())
    }

    /// Candidate values for a parameter
    pub fn candidates(&self, name: &str) -> Option<&[T]> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.values.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Number of combinations, computed without enumerating.
    ///
    /// Returns 0 for a space with no parameters and saturates at
    /// `usize::MAX`; use [`checked_count`](Self::checked_count) to tell a
    /// saturated count apart.
    pub fn count(&self) -> usize {
        self.checked_count().unwrap_or(usize::MAX)
    }

    /// Number of combinations, or `None` when it does not fit in `usize`
    pub fn checked_count(&self) -> Option<usize> {
        if self.parameters.is_empty() {
            return Some(0);
        }

        self.parameters
            .iter()
            .try_fold(1usize, |acc, p| acc.checked_mul(p.values.len()))
    }

    /// Lazily enumerate every combination.
    ///
    /// The iterator reports an exact length only when
    /// [`checked_count`](Self::checked_count) is `Some`.
    pub fn iter(&self) -> Combinations<'_, T> {
        Combinations {
            space: self,
            odometer: Odometer::new(self),
        }
    }

    /// Every combination, in odometer order. An empty space yields no
    /// combinations.
    ///
    /// # Panics
    ///
    /// Panics when the space holds more than `usize::MAX` combinations.
    /// Use [`iter`](Self::iter) or [`sample`](Self::sample) for such spaces.
    pub fn expand(&self) -> Vec<Combination<T>> {
        let total = self.materialisable_count();
        let mut combinations = Vec::with_capacity(total);
        combinations.extend(self.iter());
        combinations
    }

    /// Combinations for which `predicate` holds
    pub fn filter<F>(&self, mut predicate: F) -> Vec<Combination<T>>
    where
        F: FnMut(&Combination<T>) -> bool,
    {
        self.iter().filter(|combo| predicate(combo)).collect()
    }

    /// Combinations with the candidate index chosen for every parameter.
    ///
    /// # Panics
    ///
    /// Panics under the same condition as [`expand`](Self::expand).
    pub fn expand_with_labels(&self) -> Vec<LabeledCombination<T>> {
        let mut labeled = Vec::with_capacity(self.materialisable_count());
        let mut odometer = Odometer::new(self);

        while let Some(indices) = odometer.next_indices() {
            let labels = self
                .parameters
                .iter()
                .zip(indices.iter())
                .map(|(p, &index)| (p.name.clone(), index))
                .collect();

            labeled.push(LabeledCombination {
                values: self.combination_from_indices(&indices),
                labels,
            });
        }

        labeled
    }

    /// Combination at a position of the odometer order
    pub fn get(&self, index: usize) -> Option<Combination<T>> {
        if index >= self.count() {
            return None;
        }

        let mut remainder = index;
        let mut indices = vec![0; self.parameters.len()];

        for (slot, p) in indices.iter_mut().zip(self.parameters.iter()).rev() {
            *slot = remainder % p.values.len();
            remainder /= p.values.len();
        }

        Some(self.combination_from_indices(&indices))
    }

    /// Randomly sample `n` combinations using the thread-local RNG
    pub fn sample(&self, n: usize, options: SampleOptions) -> Vec<Combination<T>> {
        self.sample_with_rng(n, options, &mut rand::thread_rng())
    }

    /// Randomly sample `n` combinations.
    ///
    /// Unique sampling returns the full expansion when `n >= count()`,
    /// otherwise an unbiased Fisher-Yates shuffle of the full expansion
    /// truncated to `n`. The whole space is materialised first, so it panics
    /// like [`expand`](Self::expand) on spaces too large to hold.
    ///
    /// Sampling with replacement draws every parameter's candidate
    /// independently, which is uniform over the full product and never
    /// materialises the space.
    pub fn sample_with_rng<R: Rng + ?Sized>(
        &self,
        n: usize,
        options: SampleOptions,
        rng: &mut R,
    ) -> Vec<Combination<T>> {
        let total = self.count();

        if total == 0 || n == 0 {
            return Vec::new();
        }

        if !options.unique {
            return (0..n)
                .map(|_| {
                    let indices: Vec<usize> = self
                        .parameters
                        .iter()
                        .map(|p| rng.gen_range(0..p.values.len()))
                        .collect();
                    self.combination_from_indices(&indices)
                })
                .collect();
        }

        let mut all = self.expand();

        if n >= all.len() {
            return all;
        }

        for i in 0..n {
            let j = rng.gen_range(i..all.len());
            all.swap(i, j);
        }

        all.truncate(n);
        all
    }

    fn materialisable_count(&self) -> usize {
        match self.checked_count() {
            Some(total) => total,
            None => panic!(
                "parameter space has more than {} combinations and cannot be materialised",
                usize::MAX
            ),
        }
    }

    fn combination_from_indices(&self, indices: &[usize]) -> Combination<T> {
        Combination::from_entries(
            self.parameters
                .iter()
                .zip(indices.iter())
                .map(|(p, &index)| (p.name.clone(), p.values[index].clone()))
                .collect(),
        )
    }
}

impl<T: Clone + Display> ParameterSpace<T> {
    /// Turn every combination into a variant with id `{prefix}-{index}`
    pub fn variants(
        &self,
        prefix: &str,
    ) -> Result<Vec<Variant<Combination<T>>>, ExperimentValidationError> {
        self.iter()
            .enumerate()
            .map(|(index, combo)| {
                let id = VariantId::new(format!("{}-{}", prefix, index))?;
                let name = combo.describe();
                Ok(Variant::new(id, name, combo))
            })
            .collect()
    }
}

impl<'a, T: Clone> IntoIterator for &'a ParameterSpace<T> {
    type Item = Combination<T>;
    type IntoIter = Combinations<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`ParameterSpace`]
#[derive(Debug, Clone)]
pub struct ParameterSpaceBuilder<T> {
    parameters: Vec<(String, Vec<T>)>,
}

impl<T> Default for ParameterSpaceBuilder<T> {
    fn default() -> Self {
        Self {
            parameters: Vec::new(),
        }
    }
}

impl<T> ParameterSpaceBuilder<T> {
    /// Add a parameter with its candidate values
    pub fn param(mut self, name: impl Into<String>, values: impl IntoIterator<Item = T>) -> Self {
        self.parameters
            .push((name.into(), values.into_iter().collect()));
        self
    }

    pub fn build(self) -> Result<ParameterSpace<T>, ParameterSpaceError> {
        let mut seen = HashSet::new();

        for (name, values) in &self.parameters {
            if name.is_empty() {
                return Err(ParameterSpaceError::EmptyName);
            }
            if !seen.insert(name.as_str()) {
                return Err(ParameterSpaceError::DuplicateParameter(name.clone()));
            }
            if values.is_empty() {
                return Err(ParameterSpaceError::EmptyCandidates(name.clone()));
            }
        }

        Ok(ParameterSpace {
            parameters: self
                .parameters
                .into_iter()
                .map(|(name, values)| Parameter { name, values })
                .collect(),
        })
    }
}

// ============================================================================
// Iteration
// ============================================================================

#[derive(Debug, Clone)]
struct Odometer {
    indices: Vec<usize>,
    radices: Vec<usize>,
    /// `None` when the count does not fit in `usize`
    remaining: Option<usize>,
    exhausted: bool,
}

impl Odometer {
    fn new<T: Clone>(space: &ParameterSpace<T>) -> Self {
        Self {
            indices: vec![0; space.parameters.len()],
            radices: space.parameters.iter().map(|p| p.values.len()).collect(),
            remaining: space.checked_count(),
            exhausted: space.parameters.is_empty(),
        }
    }

    fn next_indices(&mut self) -> Option<Vec<usize>> {
        if self.exhausted {
            return None;
        }

        let current = self.indices.clone();
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }

        // Right-most wheel turns first; a carry out of the left-most wheel
        // means every combination has been produced
        let mut rolled_over = true;
        for (index, radix) in self.indices.iter_mut().zip(self.radices.iter()).rev() {
            *index += 1;
            if *index < *radix {
                rolled_over = false;
                break;
            }
            *index = 0;
        }
        self.exhausted = rolled_over;

        Some(current)
    }
}

/// Lazy iterator over the combinations of a [`ParameterSpace`]
#[derive(Debug, Clone)]
pub struct Combinations<'a, T> {
    space: &'a ParameterSpace<T>,
    odometer: Odometer,
}

impl<T: Clone> Iterator for Combinations<'_, T> {
    type Item = Combination<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.odometer
            .next_indices()
            .map(|indices| self.space.combination_from_indices(&indices))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.odometer.remaining {
            Some(remaining) => (remaining, Some(remaining)),
            None => (usize::MAX, None),
        }
    }
}
