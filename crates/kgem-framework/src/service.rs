//! Managers as tower services.
//!
//! [`ManagerService<K>`] wraps a manager and implements
//! `tower::Service<K::Input>`, so hosts can stack ordinary tower layers
//! (timeouts, filters, concurrency limits) on top of a manager tree:
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use tower::ServiceBuilder;
//! use kgem_framework::service::ServiceBuilderExt;
//!
//! let svc = ServiceBuilder::new()
//!     .timeout(Duration::from_secs(30))
//!     .rule(|input: &CommandInput| input.message.text.is_some())
//!     .manager(commands.clone());
//! let outcome = svc.oneshot(CommandInput::new(client, message)).await?;
//! ```

use std::sync::Arc;
use std::task::{Context, Poll};

use kgem_core::{BoxError, BoxFuture, Outcome};
use tower::filter::{FilterLayer, Predicate};
use tower::layer::util::Stack;
use tower::util::BoxCloneSyncService;
use tower::{Layer, Service, ServiceBuilder};

use crate::error::InputRejected;
use crate::handler::ExecutionResult;
use crate::manager::{Manager, ManagerKind};

// ============================================================================
// ManagerService
// ============================================================================

/// A tower [`Service`] running a manager on every request.
pub struct ManagerService<K: ManagerKind> {
    manager: Arc<Manager<K>>,
}

impl<K: ManagerKind> ManagerService<K> {
    pub fn new(manager: Arc<Manager<K>>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<Manager<K>> {
        &self.manager
    }
}

impl<K: ManagerKind> Clone for ManagerService<K> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
        }
    }
}

impl<K: ManagerKind> Service<K::Input> for ManagerService<K> {
    type Response = Outcome<K::Output>;
    type Error = BoxError;
    type Future = BoxFuture<'static, ExecutionResult<K::Output>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, input: K::Input) -> Self::Future {
        self.manager.execute(input)
    }
}

impl<K: ManagerKind> Manager<K> {
    /// Wraps this manager in a [`ManagerService`].
    pub fn service(self: &Arc<Self>) -> ManagerService<K> {
        ManagerService::new(Arc::clone(self))
    }
}

/// A type-erased manager service, as stored by hosts.
pub type BoxedManagerService<K> =
    BoxCloneSyncService<<K as ManagerKind>::Input, Outcome<<K as ManagerKind>::Output>, BoxError>;

// ============================================================================
// InputPredicate
// ============================================================================

/// A [`Predicate`] over manager inputs built from a synchronous closure.
///
/// Rejected inputs fail with [`InputRejected`] without reaching the manager.
pub struct InputPredicate<I>(Arc<dyn Fn(&I) -> bool + Send + Sync>);

impl<I> InputPredicate<I> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&I) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }
}

impl<I> Clone for InputPredicate<I> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<I> Predicate<I> for InputPredicate<I> {
    type Request = I;

    fn check(&mut self, request: I) -> Result<I, BoxError> {
        if (self.0)(&request) {
            Ok(request)
        } else {
            Err(Box::new(InputRejected))
        }
    }
}

// ============================================================================
// ServiceBuilderExt
// ============================================================================

/// Extension trait for [`tower::ServiceBuilder`] to finish a stack with a manager.
pub trait ServiceBuilderExt<L> {
    /// Applies the stacked layers to a [`ManagerService`] around `manager`.
    fn manager<K>(self, manager: Arc<Manager<K>>) -> L::Service
    where
        K: ManagerKind,
        L: Layer<ManagerService<K>>;

    /// Adds a synchronous input filter.
    fn rule<I, F>(self, predicate: F) -> ServiceBuilder<Stack<FilterLayer<InputPredicate<I>>, L>>
    where
        F: Fn(&I) -> bool + Send + Sync + 'static;
}

impl<L> ServiceBuilderExt<L> for ServiceBuilder<L> {
    fn manager<K>(self, manager: Arc<Manager<K>>) -> L::Service
    where
        K: ManagerKind,
        L: Layer<ManagerService<K>>,
    {
        self.service(ManagerService::new(manager))
    }

    fn rule<I, F>(self, predicate: F) -> ServiceBuilder<Stack<FilterLayer<InputPredicate<I>>, L>>
    where
        F: Fn(&I) -> bool + Send + Sync + 'static,
    {
        self.filter(InputPredicate::new(predicate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tower::ServiceExt;
    use tower::timeout::error::Elapsed;

    #[derive(Default)]
    struct Doubler;

    impl ManagerKind for Doubler {
        type Input = u32;
        type Output = u32;
        const NAME: &'static str = "DoublerManager";

        fn executable() -> Option<crate::handler::Executable<Self>> {
            Some(crate::handler::executable(|_, input: u32| async move {
                if input == 0 {
                    Outcome::Declined
                } else {
                    Outcome::Handled(input * 2)
                }
            }))
        }
    }

    #[tokio::test]
    async fn test_service_runs_manager() {
        let manager = Manager::<Doubler>::new();
        let outcome = manager.service().oneshot(21).await.unwrap();
        assert_eq!(outcome, Outcome::Handled(42));

        let declined = manager.service().oneshot(0).await.unwrap();
        assert_eq!(declined, Outcome::Declined);
    }

    #[tokio::test]
    async fn test_rule_rejects_input() {
        let manager = Manager::<Doubler>::new();
        let svc = ServiceBuilder::new().rule(|input: &u32| *input < 100).manager(manager);

        assert_eq!(svc.clone().oneshot(5).await.unwrap(), Outcome::Handled(10));

        let err = svc.oneshot(500).await.unwrap_err();
        assert!(err.downcast_ref::<InputRejected>().is_some());
    }

    #[tokio::test]
    async fn test_timeout_layer_bounds_execution() {
        let manager = Manager::<Doubler>::new();
        manager.set_executable(|_, input: u32| async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Outcome::Handled(input)
        });

        let svc: BoxedManagerService<Doubler> = BoxCloneSyncService::new(
            ServiceBuilder::new()
                .timeout(Duration::from_millis(5))
                .manager(manager),
        );
        let err = svc.oneshot(1).await.unwrap_err();
        assert!(err.downcast_ref::<Elapsed>().is_some());
    }
}
