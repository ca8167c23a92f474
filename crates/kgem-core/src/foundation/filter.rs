//! Filter predicates.
//!
//! Handler registrants attach a [`Predicate`] that is resolved against the
//! event before the handler runs. Predicates are explicit values built by the
//! caller; closures are filters, and predicates compose with `&`, `|` and `!`.
//!
//! ```rust,ignore
//! use kgem_core::{Predicate, ChatKind};
//!
//! let in_groups = Predicate::new(|ev: &MessageRead| ev.chat.kind == ChatKind::Group);
//! let not_muted = !Predicate::new(|ev: &MessageRead| muted.contains(&ev.chat.id));
//! let filter = in_groups & not_muted;
//! ```

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use std::sync::Arc;

/// Something that can be resolved against a value to a boolean.
pub trait Filter<T: ?Sized>: Send + Sync {
    fn resolve(&self, value: &T) -> bool;
}

impl<T: ?Sized, F> Filter<T> for F
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn resolve(&self, value: &T) -> bool {
        self(value)
    }
}

/// A cheaply clonable, composable filter.
pub struct Predicate<T: ?Sized> {
    inner: Option<Arc<dyn Filter<T>>>,
}

impl<T: ?Sized + 'static> Predicate<T> {
    /// Wraps a filter.
    pub fn new(filter: impl Filter<T> + 'static) -> Self {
        Self {
            inner: Some(Arc::new(filter)),
        }
    }

    /// A predicate that always passes.
    pub fn any() -> Self {
        Self { inner: None }
    }

    /// Resolves the predicate against `value`.
    pub fn resolve(&self, value: &T) -> bool {
        match &self.inner {
            Some(filter) => filter.resolve(value),
            None => true,
        }
    }

    /// Returns `true` if this predicate always passes.
    pub fn is_any(&self) -> bool {
        self.inner.is_none()
    }
}

impl<T: ?Sized> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: ?Sized + 'static> Default for Predicate<T> {
    fn default() -> Self {
        Self::any()
    }
}

impl<T: ?Sized> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("any", &self.inner.is_none())
            .finish()
    }
}

impl<T: ?Sized + 'static> BitAnd for Predicate<T> {
    type Output = Predicate<T>;

    fn bitand(self, rhs: Self) -> Self::Output {
        match (self.is_any(), rhs.is_any()) {
            (true, _) => rhs,
            (_, true) => self,
            _ => Predicate::new(move |value: &T| self.resolve(value) && rhs.resolve(value)),
        }
    }
}

impl<T: ?Sized + 'static> BitOr for Predicate<T> {
    type Output = Predicate<T>;

    fn bitor(self, rhs: Self) -> Self::Output {
        if self.is_any() || rhs.is_any() {
            return Predicate::any();
        }
        Predicate::new(move |value: &T| self.resolve(value) || rhs.resolve(value))
    }
}

impl<T: ?Sized + 'static> Not for Predicate<T> {
    type Output = Predicate<T>;

    fn not(self) -> Self::Output {
        Predicate::new(move |value: &T| !self.resolve(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn even() -> Predicate<i32> {
        Predicate::new(|v: &i32| v % 2 == 0)
    }

    fn positive() -> Predicate<i32> {
        Predicate::new(|v: &i32| *v > 0)
    }

    #[test]
    fn test_any_always_passes() {
        let any = Predicate::<i32>::any();
        assert!(any.resolve(&-3));
        assert!(any.is_any());
    }

    #[test]
    fn test_boolean_composition() {
        let both = even() & positive();
        assert!(both.resolve(&4));
        assert!(!both.resolve(&-4));
        assert!(!both.resolve(&3));

        let either = even() | positive();
        assert!(either.resolve(&-4));
        assert!(either.resolve(&3));
        assert!(!either.resolve(&-3));

        let odd = !even();
        assert!(odd.resolve(&3));
        assert!(!odd.resolve(&2));
    }

    #[test]
    fn test_any_is_identity_for_and() {
        let p = Predicate::any() & even();
        assert!(!p.is_any());
        assert!(p.resolve(&2));
        assert!(!p.resolve(&1));
    }

    #[test]
    fn test_negated_any_rejects_everything() {
        let never = !Predicate::<i32>::any();
        assert!(!never.resolve(&0));
    }
}
