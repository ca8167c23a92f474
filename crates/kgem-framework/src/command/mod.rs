//! Text commands.
//!
//! Commands are registered on a [`CommandManager`] with a [`CommandSpec`]
//! and an async callback. Incoming message text is matched against every
//! command's prefixes and bodies, and the first match runs:
//!
//! ```rust,ignore
//! use kgem_framework::command::{CommandManager, CommandSpec};
//!
//! let commands = CommandManager::new();
//! commands.register_command(
//!     CommandSpec::new(["ping"]).description("Replies with pong"),
//!     |client, message, ctx| async move {
//!         tracing::info!(args = ?ctx.arguments(), "pong");
//!     },
//! )?;
//! ```

mod context;
mod dispatcher;
mod model;
pub mod split;

pub use context::{CommandContext, CommandInput};
pub use dispatcher::{CallRecord, CommandBuilder, CommandManager, Commands};
pub use model::{
    Command, CommandCallback, CommandDefaults, CommandDetails, CommandId, CommandSpec,
    command_callback,
};
