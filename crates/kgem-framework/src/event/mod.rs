//! Typed events.
//!
//! Raw updates are resolved into a small [`Event`] model and handed to the
//! handlers registered on an [`EventManager`], in registration order:
//!
//! ```rust,ignore
//! use kgem_framework::event::{EventContext, EventManager, NewMessage};
//!
//! let events = EventManager::<()>::new();
//! events.enable();
//! events.register_message_handler(
//!     |ctx: EventContext<NewMessage>| async move {
//!         tracing::info!(text = ?ctx.message.text, "own message");
//!     },
//!     Predicate::any(),
//!     true,
//! );
//! ```

mod dispatcher;
mod model;
mod registry;
mod resolver;

pub use dispatcher::{EventFeed, EventManager, EventSource, Events};
pub use model::{
    DeletedMessages, EditedMessage, Event, EventContext, EventKind, EventVariant, MessageRead, NewMessage,
};
pub use registry::{EventCallback, HandlerEntry, HandlerId, Registration, event_callback};
pub use resolver::{UpdateLookups, resolve_event};
