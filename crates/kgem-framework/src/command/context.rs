//! Per-invocation data handed to command callbacks.

use std::sync::Arc;

use kgem_core::{BoxedClient, Message};

use super::model::Command;
use super::CommandManager;

/// What a command callback knows about its own invocation.
///
/// Built fresh for every call; nothing is attached to the message itself.
#[derive(Clone)]
pub struct CommandContext {
    command: Arc<Command>,
    arguments: Arc<[Vec<String>]>,
    manager: Arc<CommandManager>,
}

impl CommandContext {
    pub(crate) fn new(command: Arc<Command>, arguments: Vec<Vec<String>>, manager: Arc<CommandManager>) -> Self {
        Self {
            command,
            arguments: arguments.into(),
            manager,
        }
    }

    /// The matched command.
    pub fn command(&self) -> &Arc<Command> {
        &self.command
    }

    /// Arguments, one token list per line of the invocation.
    pub fn arguments(&self) -> &[Vec<String>] {
        &self.arguments
    }

    /// Tokens of one argument line.
    pub fn line(&self, index: usize) -> Option<&[String]> {
        self.arguments.get(index).map(Vec::as_slice)
    }

    /// All argument tokens, line breaks ignored.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.arguments.iter().flatten().map(String::as_str)
    }

    /// The manager that dispatched the command.
    pub fn manager(&self) -> &Arc<CommandManager> {
        &self.manager
    }
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("command", &self.command.id())
            .field("arguments", &self.arguments)
            .field("manager", &self.manager.label())
            .finish()
    }
}

/// Input of a command manager: one message seen by one client.
#[derive(Clone)]
pub struct CommandInput {
    pub client: BoxedClient,
    pub message: Arc<Message>,
}

impl CommandInput {
    pub fn new(client: BoxedClient, message: impl Into<Arc<Message>>) -> Self {
        Self {
            client,
            message: message.into(),
        }
    }
}

impl std::fmt::Debug for CommandInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandInput")
            .field("account", self.client.account())
            .field("message", &self.message)
            .finish()
    }
}
