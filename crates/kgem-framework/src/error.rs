//! Error types for the kgem framework.

use thiserror::Error;

/// Malformed registration parameters, or a lookup of a command that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A registration parameter has an unusable value.
    #[error("invalid `{parameter}`: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// No registered command answers to the given body.
    #[error("command `{body}` not found")]
    CommandNotFound {
        /// The (case-folded) body that was looked up.
        body: String,
    },
}

impl ValidationError {
    /// Creates an invalid-parameter error.
    pub fn invalid(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter,
            reason: reason.into(),
        }
    }

    /// Returns the parameter name for [`ValidationError::InvalidParameter`].
    pub fn parameter(&self) -> Option<&'static str> {
        match self {
            Self::InvalidParameter { parameter, .. } => Some(parameter),
            Self::CommandNotFound { .. } => None,
        }
    }
}

/// Errors from mutating the manager tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManagerError {
    /// Including the manager would make it its own ancestor.
    #[error("including {child} into {parent} would create a cycle")]
    Cycle { parent: String, child: String },

    /// The manager to exclude is not a child of this manager.
    #[error("{child} is not included into {parent}")]
    NotIncluded { parent: String, child: String },
}

/// Result type for registration calls.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Returned by a manager service when its input predicate rejects the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("input rejected by the service predicate")]
pub struct InputRejected;
