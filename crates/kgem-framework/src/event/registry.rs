//! The event handler table.
//!
//! The table is a closed enum with one entry type per event variant, so a
//! handler can only ever be called with the payload it was registered for.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use kgem_core::{BoxFuture, IntoOutcome, Predicate};

use super::model::{DeletedMessages, EditedMessage, Event, EventContext, EventKind, MessageRead, NewMessage};
use crate::handler::ExecutionResult;

/// Identity of a registered event handler, unique per manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerId(pub(crate) u64);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored event handler callback.
pub type EventCallback<P, R> = Arc<dyn Fn(EventContext<P>) -> BoxFuture<'static, ExecutionResult<R>> + Send + Sync>;

/// Erases an async event handler into an [`EventCallback`].
pub fn event_callback<P, R, F, Fut>(f: F) -> EventCallback<P, R>
where
    F: Fn(EventContext<P>) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoOutcome<R>,
{
    Arc::new(move |ctx| {
        let fut = f(ctx);
        async move { fut.await.into_outcome() }.boxed()
    })
}

/// One handler for events of variant `P`.
pub struct Registration<P, R> {
    pub(crate) id: HandlerId,
    pub(crate) filter: Predicate<EventContext<P>>,
    pub(crate) callback: EventCallback<P, R>,
    pub(crate) by_me: bool,
}

impl<P: 'static, R> Registration<P, R> {
    pub fn id(&self) -> HandlerId {
        self.id
    }

    pub fn by_me(&self) -> bool {
        self.by_me
    }

    /// Starts the callback if the filter accepts the event.
    fn call(&self, event: &Arc<Event>, payload: &Arc<P>) -> Option<BoxFuture<'static, ExecutionResult<R>>> {
        let ctx = EventContext::new(Arc::clone(event), Arc::clone(payload));
        if !self.filter.resolve(&ctx) {
            return None;
        }
        Some((self.callback)(ctx))
    }
}

/// An entry of the handler table.
pub enum HandlerEntry<R> {
    MessageRead(Registration<MessageRead, R>),
    NewMessage(Registration<NewMessage, R>),
    DeletedMessages(Registration<DeletedMessages, R>),
    EditedMessage(Registration<EditedMessage, R>),
}

impl<R> HandlerEntry<R> {
    pub fn id(&self) -> HandlerId {
        match self {
            HandlerEntry::MessageRead(r) => r.id,
            HandlerEntry::NewMessage(r) => r.id,
            HandlerEntry::DeletedMessages(r) => r.id,
            HandlerEntry::EditedMessage(r) => r.id,
        }
    }

    /// Starts this handler for `event` if it applies.
    ///
    /// A handler applies when the event has its variant, its filter accepts
    /// the event, and the event's direction suits it:
    /// - a `by_me` new-message handler ignores messages sent by someone else;
    /// - a message-read handler only sees reads whose `by_me` equals its own.
    pub(crate) fn start(&self, event: &Arc<Event>, account_id: i64) -> Option<BoxFuture<'static, ExecutionResult<R>>> {
        match (self, &event.kind) {
            (HandlerEntry::MessageRead(handler), EventKind::MessageRead(read)) => {
                if handler.by_me != read.by_me {
                    return None;
                }
                handler.call(event, read)
            }
            (HandlerEntry::NewMessage(handler), EventKind::NewMessage(new)) => {
                if handler.by_me && new.message.is_from_other(account_id) {
                    return None;
                }
                handler.call(event, new)
            }
            (HandlerEntry::DeletedMessages(handler), EventKind::DeletedMessages(deleted)) => {
                handler.call(event, deleted)
            }
            (HandlerEntry::EditedMessage(handler), EventKind::EditedMessage(edited)) => {
                handler.call(event, edited)
            }
            _ => None,
        }
    }
}

impl<R> fmt::Debug for HandlerEntry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (variant, by_me) = match self {
            HandlerEntry::MessageRead(r) => ("message_read", r.by_me),
            HandlerEntry::NewMessage(r) => ("new_message", r.by_me),
            HandlerEntry::DeletedMessages(r) => ("deleted_messages", r.by_me),
            HandlerEntry::EditedMessage(r) => ("edited_message", r.by_me),
        };
        f.debug_struct("HandlerEntry")
            .field("id", &self.id())
            .field("variant", &variant)
            .field("by_me", &by_me)
            .finish()
    }
}
