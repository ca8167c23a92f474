//! # kgem
//!
//! Asynchronous dispatch managers for a chat-automation client.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────────┐     ┌───────────────────────┐
//! │  Transport  │────▶│ KgemRuntime          │────▶│ root CommandManager   │──▶ addon managers
//! │  (Client)   │     │  handle_message      │     └───────────────────────┘
//! └─────────────┘     │  handle_update       │     ┌───────────────────────┐
//!                     │                      │────▶│ root EventManager     │──▶ addon managers
//!                     └──────────────────────┘     └───────────────────────┘
//! ```
//!
//! - **Managers**: enable/disable switches around one executable. A manager
//!   that declines an input hands it to its included managers in order.
//! - **Commands**: prefixed text commands, matched against message text and
//!   never run twice at once in the same chat
//! - **Events**: raw updates resolved into typed events and fanned out to
//!   filtered handlers, strictly in order per account
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kgem::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = KgemRuntime::new();
//!
//!     runtime
//!         .commands()
//!         .command(["ping"])
//!         .description("Replies with pong")
//!         .register(|client, message, ctx| async move {
//!             info!(chat_id = message.chat_id(), "pong");
//!         })?;
//!
//!     runtime.events().register_message_handler(
//!         |ctx: EventContext<NewMessage>| async move {
//!             debug!(event = %ctx.event(), "own message");
//!         },
//!         Predicate::any(),
//!         true,
//!     );
//!
//!     runtime.serve(transport.incoming()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` (default): TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use kgem_core as core;
pub use kgem_framework as framework;
pub use kgem_runtime as runtime;

/// Commonly used types for writing addons and hosts.
///
/// ```rust,ignore
/// use kgem::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use kgem_runtime::{Incoming, KgemConfig, KgemRuntime};

    // Managers
    pub use kgem_framework::{ErrorContext, Manager, ManagerError};

    // Commands
    pub use kgem_framework::{CommandContext, CommandInput, CommandManager, CommandSpec, Commands};

    // Events
    pub use kgem_framework::{
        DeletedMessages, EditedMessage, Event, EventContext, EventManager, Events, MessageRead, NewMessage,
        UpdateLookups,
    };

    // Core types
    pub use kgem_core::{
        Account, BoxedClient, Chat, ChatKind, Client, ClientError, ClientResult, Message, Outcome, Predicate,
        Propagation, RawUpdate, User,
    };

    // Logging macros
    pub use kgem_runtime::prelude::*;
}
