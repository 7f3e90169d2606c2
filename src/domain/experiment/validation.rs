//! Experiment validation utilities

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

use crate::domain::DomainError;

/// Maximum length for experiment and variant IDs
pub const MAX_ID_LENGTH: usize = 64;

/// Which kind of identifier failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Experiment,
    Variant,
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Experiment => write!(f, "Experiment"),
            Self::Variant => write!(f, "Variant"),
        }
    }
}

/// Validation errors for experiments and variants
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExperimentValidationError {
    #[error("{0} ID cannot be empty")]
    EmptyId(IdKind),

    #[error("{0} ID exceeds maximum length of {1} characters")]
    IdTooLong(IdKind, usize),

    #[error("{0} ID must start with a letter or number")]
    InvalidIdStart(IdKind),

    #[error("{0} ID must end with a letter or number")]
    InvalidIdEnd(IdKind),

    #[error("{0} ID contains invalid character: '{1}'")]
    InvalidIdCharacter(IdKind, char),

    #[error("Experiment must have at least one variant")]
    NoVariants,

    #[error("Duplicate variant ID: '{0}'")]
    DuplicateVariantId(String),
}

impl From<ExperimentValidationError> for DomainError {
    fn from(err: ExperimentValidationError) -> Self {
        DomainError::validation(err.to_string())
    }
}

fn is_separator(ch: char) -> bool {
    matches!(ch, '-' | '_' | '.')
}

/// Validate an experiment or variant identifier
pub fn validate_id(kind: IdKind, id: &str) -> Result<(), ExperimentValidationError> {
    let (Some(first), Some(last)) = (id.chars().next(), id.chars().last()) else {
        return Err(ExperimentValidationError::EmptyId(kind));
    };

    if id.len() > MAX_ID_LENGTH {
        return Err(ExperimentValidationError::IdTooLong(kind, MAX_ID_LENGTH));
    }

    if !first.is_ascii_alphanumeric() {
        return Err(ExperimentValidationError::InvalidIdStart(kind));
    }

    if !last.is_ascii_alphanumeric() {
        return Err(ExperimentValidationError::InvalidIdEnd(kind));
    }

    if let Some(ch) = id
        .chars()
        .find(|&ch| !ch.is_ascii_alphanumeric() && !is_separator(ch))
    {
        return Err(ExperimentValidationError::InvalidIdCharacter(kind, ch));
    }

    Ok(())
}

/// Validate an experiment ID
pub fn validate_experiment_id(id: &str) -> Result<(), ExperimentValidationError> {
    validate_id(IdKind::Experiment, id)
}

/// Validate a variant ID
pub fn validate_variant_id(id: &str) -> Result<(), ExperimentValidationError> {
    validate_id(IdKind::Variant, id)
}

/// Validate the variant list of an experiment: non-empty, unique ids
pub fn validate_variant_ids<'a>(
    ids: impl IntoIterator<Item = &'a str>,
) -> Result<(), ExperimentValidationError> {
    let mut seen = HashSet::new();
    let mut any = false;

    for id in ids {
        any = true;
        if !seen.insert(id) {
            return Err(ExperimentValidationError::DuplicateVariantId(id.to_string()));
        }
    }

    if !any {
        return Err(ExperimentValidationError::NoVariants);
    }

    Ok(())
}
