//! Typed events.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use kgem_core::{Account, Chat, Message};
use serde::{Deserialize, Serialize};

use super::registry::{HandlerEntry, Registration};

// ============================================================================
// Payloads
// ============================================================================

/// Messages in a chat were read up to `last_read_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRead {
    pub chat: Chat,
    pub last_read_id: i32,
    /// `true` when the read happened on the account's side.
    pub by_me: bool,
}

/// A message arrived or was sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub message: Message,
}

/// Messages were deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedMessages {
    pub message_ids: Vec<i32>,
    /// Known only for channel-scoped deletions.
    pub chat: Option<Chat>,
}

/// A message was edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditedMessage {
    pub message: Message,
}

/// The payload of an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "_", rename_all = "snake_case")]
pub enum EventKind {
    MessageRead(Arc<MessageRead>),
    NewMessage(Arc<NewMessage>),
    DeletedMessages(Arc<DeletedMessages>),
    EditedMessage(Arc<EditedMessage>),
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::MessageRead(_) => MessageRead::NAME,
            EventKind::NewMessage(_) => NewMessage::NAME,
            EventKind::DeletedMessages(_) => DeletedMessages::NAME,
            EventKind::EditedMessage(_) => EditedMessage::NAME,
        }
    }
}

// ============================================================================
// Event
// ============================================================================

/// An event seen by one account.
///
/// Handlers can [`skip`](Event::skip) an event to pass it on to the next
/// matching handler. The mark is reset by the dispatcher before that handler
/// runs, and is never serialized.
#[derive(Debug, Serialize, Deserialize)]
pub struct Event {
    pub account: Account,
    #[serde(flatten)]
    pub kind: EventKind,
    #[serde(skip)]
    skipped: AtomicBool,
}

impl Event {
    pub fn new(account: Account, kind: EventKind) -> Self {
        Self {
            account,
            kind,
            skipped: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Hands the event on to the next matching handler.
    pub fn skip(&self) {
        self.skipped.store(true, Ordering::SeqCst);
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Clears the skip mark, returning whether it was set.
    pub(crate) fn take_skip(&self) -> bool {
        self.skipped.swap(false, Ordering::SeqCst)
    }
}

impl Clone for Event {
    fn clone(&self) -> Self {
        Self {
            account: self.account.clone(),
            kind: self.kind.clone(),
            skipped: AtomicBool::new(self.is_skipped()),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string_pretty(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

// ============================================================================
// Variants
// ============================================================================

/// One payload type of [`EventKind`].
pub trait EventVariant: Send + Sync + Sized + 'static {
    /// Name of the variant, as used in logs and serialized events.
    const NAME: &'static str;

    /// Returns the payload if `kind` is this variant.
    fn project(kind: &EventKind) -> Option<&Arc<Self>>;

    /// Wraps a registration into the handler table entry of this variant.
    fn into_entry<R>(registration: Registration<Self, R>) -> HandlerEntry<R>;
}

macro_rules! event_variant {
    ($ty:ident, $name:literal) => {
        impl EventVariant for $ty {
            const NAME: &'static str = $name;

            fn project(kind: &EventKind) -> Option<&Arc<Self>> {
                match kind {
                    EventKind::$ty(payload) => Some(payload),
                    _ => None,
                }
            }

            fn into_entry<R>(registration: Registration<Self, R>) -> HandlerEntry<R> {
                HandlerEntry::$ty(registration)
            }
        }
    };
}

event_variant!(MessageRead, "message_read");
event_variant!(NewMessage, "new_message");
event_variant!(DeletedMessages, "deleted_messages");
event_variant!(EditedMessage, "edited_message");

// ============================================================================
// EventContext
// ============================================================================

/// What a handler registered for variant `P` receives.
///
/// Dereferences to the payload, so `ctx.message` or `ctx.chat` work directly.
pub struct EventContext<P> {
    event: Arc<Event>,
    payload: Arc<P>,
}

impl<P: EventVariant> EventContext<P> {
    /// Builds a context if `event` is of variant `P`.
    pub fn from_event(event: Arc<Event>) -> Option<Self> {
        let payload = Arc::clone(P::project(&event.kind)?);
        Some(Self { event, payload })
    }
}

impl<P> EventContext<P> {
    pub(crate) fn new(event: Arc<Event>, payload: Arc<P>) -> Self {
        Self { event, payload }
    }

    /// The full event.
    pub fn event(&self) -> &Arc<Event> {
        &self.event
    }

    /// The account the event was seen by.
    pub fn account(&self) -> &Account {
        &self.event.account
    }

    pub fn payload(&self) -> &Arc<P> {
        &self.payload
    }

    /// Hands the event on to the next matching handler.
    pub fn skip(&self) {
        self.event.skip();
    }
}

impl<P> Clone for EventContext<P> {
    fn clone(&self) -> Self {
        Self {
            event: Arc::clone(&self.event),
            payload: Arc::clone(&self.payload),
        }
    }
}

impl<P> Deref for EventContext<P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.payload
    }
}

impl<P: fmt::Debug> fmt::Debug for EventContext<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventContext")
            .field("account", &self.event.account)
            .field("payload", &self.payload)
            .finish()
    }
}
