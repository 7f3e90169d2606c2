//! Parameter space errors

use thiserror::Error;

use crate::domain::DomainError;

/// Errors raised while building a parameter space
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParameterSpaceError {
    #[error("Parameter name cannot be empty")]
    EmptyName,

    #[error("Parameter '{0}' has no candidate values")]
    EmptyCandidates(String),

    #[error("Duplicate parameter: '{0}'")]
    DuplicateParameter(String),
}

impl From<ParameterSpaceError> for DomainError {
    fn from(err: ParameterSpaceError) -> Self {
        DomainError::configuration(err.to_string())
    }
}
