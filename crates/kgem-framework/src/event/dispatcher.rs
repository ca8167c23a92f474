//! The event manager.
//!
//! [`Events`] keeps the handler table. Its bound executable,
//! [`EventManager::feed_event`], holds a lock scoped to the account for the
//! whole resolve and dispatch, so one account's updates are handled strictly
//! in delivery order.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use kgem_core::{BoxedClient, ChatKind, IntoOutcome, NamedLock, Outcome, Predicate, RawUpdate};
use parking_lot::RwLock;
use tracing::{debug, trace};

use super::model::{DeletedMessages, EditedMessage, Event, EventContext, EventVariant, MessageRead, NewMessage};
use super::registry::{HandlerEntry, HandlerId, Registration, event_callback};
use super::resolver::{UpdateLookups, resolve_event};
use crate::handler::{self, Executable, ExecutionResult};
use crate::manager::{Manager, ManagerKind};

/// A manager dispatching typed events. `R` is what a handling callback returns.
pub type EventManager<R = ()> = Manager<Events<R>>;

/// Input of an event manager.
#[derive(Clone)]
pub struct EventFeed {
    pub client: BoxedClient,
    pub source: EventSource,
}

/// Where the event of an [`EventFeed`] comes from.
#[derive(Debug, Clone)]
pub enum EventSource {
    /// A raw update, resolved inside the account lock.
    Raw {
        update: Arc<RawUpdate>,
        lookups: Arc<UpdateLookups>,
    },
    /// An event somebody already resolved.
    Resolved(Arc<Event>),
}

impl EventFeed {
    pub fn raw(client: BoxedClient, update: RawUpdate, lookups: UpdateLookups) -> Self {
        Self {
            client,
            source: EventSource::Raw {
                update: Arc::new(update),
                lookups: Arc::new(lookups),
            },
        }
    }

    pub fn resolved(client: BoxedClient, event: Event) -> Self {
        Self {
            client,
            source: EventSource::Resolved(Arc::new(event)),
        }
    }
}

/// State of an event manager.
pub struct Events<R> {
    handlers: RwLock<Vec<Arc<HandlerEntry<R>>>>,
    next_id: AtomicU64,
    lock: NamedLock<i64>,
}

impl<R> Default for Events<R> {
    fn default() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            lock: NamedLock::new(),
        }
    }
}

impl<R: Send + 'static> ManagerKind for Events<R> {
    type Input = EventFeed;
    type Output = R;

    const NAME: &'static str = "EventManager";
    const ENABLED_BY_DEFAULT: bool = false;

    fn executable() -> Option<Executable<Self>> {
        Some(handler::executable(
            |manager: Arc<EventManager<R>>, feed: EventFeed| async move { manager.feed_event(feed).await },
        ))
    }
}

impl<R: Send + 'static> Manager<Events<R>> {
    // ─── Registration ────────────────────────────────────────────────────────

    /// Registers a handler for events of variant `P`.
    ///
    /// Handlers run in registration order. `by_me` narrows which events of a
    /// directional variant reach the handler, see [`HandlerEntry`].
    pub fn register_event_handler<P, F, Fut>(
        &self,
        callback: F,
        filter: Predicate<EventContext<P>>,
        by_me: bool,
    ) -> HandlerId
    where
        P: EventVariant,
        F: Fn(EventContext<P>) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoOutcome<R>,
    {
        let id = HandlerId(self.kind().next_id.fetch_add(1, Ordering::Relaxed));
        let entry = P::into_entry(Registration {
            id,
            filter,
            callback: event_callback(callback),
            by_me,
        });
        self.kind().handlers.write().push(Arc::new(entry));
        debug!(manager = %self, handler = %id, event = P::NAME, by_me, "Registered event handler");
        id
    }

    /// Registers a new-message handler.
    ///
    /// With `by_me` set, messages from other senders are ignored.
    pub fn register_message_handler<F, Fut>(
        &self,
        callback: F,
        filter: Predicate<EventContext<NewMessage>>,
        by_me: bool,
    ) -> HandlerId
    where
        F: Fn(EventContext<NewMessage>) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoOutcome<R>,
    {
        self.register_event_handler(callback, filter, by_me)
    }

    /// Registers a read handler, optionally narrowed to one chat or chat kind.
    pub fn register_messages_read_handler<F, Fut>(
        &self,
        callback: F,
        chat_id: Option<i64>,
        chat_kind: Option<ChatKind>,
        by_me: bool,
    ) -> HandlerId
    where
        F: Fn(EventContext<MessageRead>) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoOutcome<R>,
    {
        let filter = if chat_id.is_none() && chat_kind.is_none() {
            Predicate::any()
        } else {
            Predicate::new(move |ctx: &EventContext<MessageRead>| {
                chat_id.is_none_or(|id| ctx.chat.id == id) && chat_kind.is_none_or(|kind| ctx.chat.kind == kind)
            })
        };
        self.register_event_handler(callback, filter, by_me)
    }

    pub fn register_deleted_messages_handler<F, Fut>(
        &self,
        callback: F,
        filter: Predicate<EventContext<DeletedMessages>>,
    ) -> HandlerId
    where
        F: Fn(EventContext<DeletedMessages>) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoOutcome<R>,
    {
        self.register_event_handler(callback, filter, true)
    }

    pub fn register_edited_message_handler<F, Fut>(
        &self,
        callback: F,
        filter: Predicate<EventContext<EditedMessage>>,
    ) -> HandlerId
    where
        F: Fn(EventContext<EditedMessage>) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoOutcome<R>,
    {
        self.register_event_handler(callback, filter, true)
    }

    /// Removes a handler. Returns `false` if no handler has this id.
    pub fn remove_handler(&self, id: HandlerId) -> bool {
        let mut handlers = self.kind().handlers.write();
        let before = handlers.len();
        handlers.retain(|entry| entry.id() != id);
        let removed = handlers.len() != before;
        if removed {
            debug!(manager = %self, handler = %id, "Removed event handler");
        }
        removed
    }

    pub fn handler_count(&self) -> usize {
        self.kind().handlers.read().len()
    }

    // ─── Dispatch ────────────────────────────────────────────────────────────

    /// Resolves the fed update and runs the first handler that takes it.
    ///
    /// A handler that skips the event hands it on to the next one. Declines
    /// when no event could be resolved or no handler produced a result.
    pub async fn feed_event(self: &Arc<Self>, feed: EventFeed) -> ExecutionResult<R> {
        let EventFeed { client, source } = feed;
        let account_id = client.account().id;
        let _guard = self.kind().lock.lock(account_id).await;

        let event = match source {
            EventSource::Resolved(event) => event,
            EventSource::Raw { update, lookups } => match resolve_event(&*client, &update, &lookups).await? {
                Some(event) => Arc::new(event),
                None => {
                    trace!(manager = %self, account_id, update = update.name(), "No event to dispatch");
                    return Ok(Outcome::Declined);
                }
            },
        };

        let handlers = self.kind().handlers.read().clone();
        for entry in handlers {
            let Some(call) = entry.start(&event, account_id) else {
                continue;
            };

            let outcome = call.await?;
            if event.take_skip() {
                trace!(manager = %self, account_id, event = event.name(), handler = %entry.id(), "Handler skipped the event");
                continue;
            }

            trace!(manager = %self, account_id, event = event.name(), handler = %entry.id(), "Handler took the event");
            return Ok(outcome);
        }

        Ok(Outcome::Declined)
    }
}
