//! # kgem framework
//!
//! The dispatch managers built on top of the core types.
//!
//! This layer provides:
//! - The [`Manager`] tree: enable/disable, child inclusion and delegation on
//!   [`Outcome::Declined`](kgem_core::Outcome::Declined)
//! - The [`command`] dispatcher: registration, matching and per-chat
//!   serialization of text commands, with call statistics
//! - The [`event`] resolver and dispatcher: raw updates become typed events
//!   that are fanned out to filtered handlers
//! - A tower [`service`] adapter so hosts can layer managers

pub mod command;
pub mod error;
pub mod event;
pub mod handler;
pub mod manager;
pub mod service;

#[cfg(test)]
mod test_support;

pub use command::{
    CallRecord, Command, CommandBuilder, CommandContext, CommandDefaults, CommandId, CommandInput,
    CommandManager, CommandSpec, Commands,
};
pub use error::{InputRejected, ManagerError, ValidationError, ValidationResult};
pub use event::{
    DeletedMessages, EditedMessage, Event, EventContext, EventFeed, EventKind, EventManager, EventSource,
    EventVariant, Events, HandlerId, MessageRead, NewMessage, UpdateLookups, resolve_event,
};
pub use handler::{ErrorHandler, Executable, ExecutionResult, MessageFilter, executable, message_filter};
pub use manager::{ErrorContext, Manager, ManagerBuilder, ManagerKind, NO_ADDON};
pub use service::{BoxedManagerService, InputPredicate, ManagerService, ServiceBuilderExt};
