//! Stored callback types.
//!
//! Every callback the managers keep is type-erased into an `Arc<dyn Fn>`
//! returning a [`BoxFuture`]. The helper constructors in this module accept
//! ordinary async closures and do the erasure, so registrants never spell
//! these types out.
//!
//! A callback must return a future. Passing a synchronous closure is a type
//! error, which replaces the runtime "handler must be async" check.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use kgem_core::{BoxError, BoxFuture, BoxedClient, IntoOutcome, Message, Outcome};

use crate::manager::{ErrorContext, Manager, ManagerKind};

/// Result of running an executable, a callback or a whole manager.
pub type ExecutionResult<T> = Result<Outcome<T>, BoxError>;

/// The callable bound to a manager.
pub type Executable<K> = Arc<
    dyn Fn(Arc<Manager<K>>, <K as ManagerKind>::Input) -> BoxFuture<'static, ExecutionResult<<K as ManagerKind>::Output>>
        + Send
        + Sync,
>;

/// Called with every execution error a manager recovers from.
pub type ErrorHandler<K> = Arc<dyn Fn(&BoxError, ErrorContext<K>) + Send + Sync>;

/// An async predicate attached to a command.
pub type MessageFilter = Arc<dyn Fn(BoxedClient, Arc<Message>) -> BoxFuture<'static, bool> + Send + Sync>;

/// Erases an async closure into an [`Executable`].
pub fn executable<K, F, Fut>(f: F) -> Executable<K>
where
    K: ManagerKind,
    F: Fn(Arc<Manager<K>>, K::Input) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoOutcome<K::Output>,
{
    Arc::new(move |manager, input| {
        let fut = f(manager, input);
        async move { fut.await.into_outcome() }.boxed()
    })
}

/// Erases an async predicate into a [`MessageFilter`].
pub fn message_filter<F, Fut>(f: F) -> MessageFilter
where
    F: Fn(BoxedClient, Arc<Message>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    Arc::new(move |client, message| f(client, message).boxed())
}
