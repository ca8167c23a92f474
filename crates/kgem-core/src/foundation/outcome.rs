//! Execution outcomes.
//!
//! Every executable, command callback and event handler reports what it did
//! through an [`Outcome`]. The managers interpret `Declined` as "try the next
//! candidate" and pass `Propagate` through untouched; real failures travel in
//! the `Err` side of a `Result<Outcome<T>, BoxError>`.

use crate::error::BoxError;

/// A directive from the hosting environment that the managers never interpret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Propagation {
    /// Continue with the next handler group elsewhere in the host.
    Continue,
    /// Stop all further handling of this input.
    Stop,
}

/// The result of running an executable or callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// Completed and produced a value.
    Handled(T),
    /// Completed without a value (disabled manager, unit callback, swallowed error).
    Finished,
    /// Declined to act; the caller should delegate to the next candidate.
    Declined,
    /// A propagation directive to hand back to the host unchanged.
    Propagate(Propagation),
}

impl<T> Outcome<T> {
    /// Returns `true` for [`Outcome::Declined`].
    pub fn is_declined(&self) -> bool {
        matches!(self, Outcome::Declined)
    }

    /// Returns `true` if the input was acted upon (`Handled` or `Finished`).
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Handled(_) | Outcome::Finished)
    }

    /// Returns the produced value, if any.
    pub fn value(self) -> Option<T> {
        match self {
            Outcome::Handled(value) => Some(value),
            _ => None,
        }
    }

    /// Maps the produced value, keeping every control variant as is.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Handled(value) => Outcome::Handled(f(value)),
            Outcome::Finished => Outcome::Finished,
            Outcome::Declined => Outcome::Declined,
            Outcome::Propagate(p) => Outcome::Propagate(p),
        }
    }
}

// ============================================================================
// IntoOutcome
// ============================================================================

/// Conversion from a callback's return type into an outcome.
///
/// Lets callbacks return `()`, `Result<(), E>`, an `Outcome<T>` or a
/// `Result<Outcome<T>, E>` without boilerplate.
pub trait IntoOutcome<T> {
    fn into_outcome(self) -> Result<Outcome<T>, BoxError>;
}

impl<T> IntoOutcome<T> for Outcome<T> {
    fn into_outcome(self) -> Result<Outcome<T>, BoxError> {
        Ok(self)
    }
}

impl<T, E> IntoOutcome<T> for Result<Outcome<T>, E>
where
    E: Into<BoxError>,
{
    fn into_outcome(self) -> Result<Outcome<T>, BoxError> {
        self.map_err(Into::into)
    }
}

impl IntoOutcome<()> for () {
    fn into_outcome(self) -> Result<Outcome<()>, BoxError> {
        Ok(Outcome::Finished)
    }
}

impl<E> IntoOutcome<()> for Result<(), E>
where
    E: Into<BoxError>,
{
    fn into_outcome(self) -> Result<Outcome<()>, BoxError> {
        self.map(|()| Outcome::Finished).map_err(Into::into)
    }
}
