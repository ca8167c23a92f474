//! Runtime error types.

use kgem_core::BoxError;
use kgem_framework::ManagerError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Loading or validating the configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Attaching a manager to a root manager failed.
    #[error(transparent)]
    Manager(#[from] ManagerError),

    /// A dispatch failed outside the managers' own error handling,
    /// e.g. because it timed out.
    #[error("Dispatch failed: {0}")]
    Dispatch(#[source] BoxError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
