//! Registered commands and their registration parameters.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures::FutureExt;
use kgem_core::{BoxFuture, BoxedClient, IntoOutcome, Message};
use parking_lot::RwLock;
use serde::Serialize;

use super::context::CommandContext;
use crate::error::{ValidationError, ValidationResult};
use crate::handler::{ExecutionResult, MessageFilter, message_filter};

static NEXT_COMMAND_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a stored command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CommandId(u64);

impl CommandId {
    fn next() -> Self {
        Self(NEXT_COMMAND_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The stored command callback.
pub type CommandCallback =
    Arc<dyn Fn(BoxedClient, Arc<Message>, CommandContext) -> BoxFuture<'static, ExecutionResult<()>> + Send + Sync>;

/// Erases an async command callback into a [`CommandCallback`].
pub fn command_callback<F, Fut>(f: F) -> CommandCallback
where
    F: Fn(BoxedClient, Arc<Message>, CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoOutcome<()>,
{
    Arc::new(move |client, message, context| {
        let fut = f(client, message, context);
        async move { fut.await.into_outcome() }.boxed()
    })
}

/// The mutable, descriptive part of a command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandDetails {
    pub description: Option<String>,
    pub argument_names: Vec<String>,
}

// ============================================================================
// Command
// ============================================================================

/// A registered command.
///
/// Two commands are the same command when their bodies and prefixes are
/// equal. Only the description and the argument names can change after
/// registration.
pub struct Command {
    id: CommandId,
    bodies: BTreeSet<String>,
    prefixes: BTreeSet<String>,
    details: RwLock<CommandDetails>,
    pub(crate) callback: CommandCallback,
    pub(crate) filters: Vec<MessageFilter>,
    owner_only: bool,
    enabled: AtomicBool,
}

impl Command {
    pub(crate) fn new(spec: ResolvedSpec, callback: CommandCallback) -> Self {
        Self {
            id: CommandId::next(),
            bodies: spec.bodies,
            prefixes: spec.prefixes,
            details: RwLock::new(CommandDetails {
                description: spec.description,
                argument_names: spec.argument_names,
            }),
            callback,
            filters: spec.filters,
            owner_only: spec.owner_only,
            enabled: AtomicBool::new(spec.enabled),
        }
    }

    pub fn id(&self) -> CommandId {
        self.id
    }

    /// Case-folded bodies.
    pub fn bodies(&self) -> &BTreeSet<String> {
        &self.bodies
    }

    pub fn prefixes(&self) -> &BTreeSet<String> {
        &self.prefixes
    }

    pub fn description(&self) -> Option<String> {
        self.details.read().description.clone()
    }

    pub fn argument_names(&self) -> Vec<String> {
        self.details.read().argument_names.clone()
    }

    /// Snapshot of the description and argument names.
    pub fn details(&self) -> CommandDetails {
        self.details.read().clone()
    }

    /// Whether only the account itself may invoke the command.
    pub fn is_owner_only(&self) -> bool {
        self.owner_only
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    /// Returns `true` if this command answers to `bodies` with `prefixes`.
    pub fn is_same(&self, bodies: &BTreeSet<String>, prefixes: &BTreeSet<String>) -> bool {
        &self.bodies == bodies && &self.prefixes == prefixes
    }

    /// Merges new details into the command.
    ///
    /// `None` and an empty list carry no information and leave the current
    /// value alone. Returns `true` if anything changed.
    pub(crate) fn merge_details(&self, description: Option<String>, argument_names: Vec<String>) -> bool {
        let mut details = self.details.write();
        let mut changed = false;

        if let Some(description) = description
            && details.description.as_ref() != Some(&description)
        {
            details.description = Some(description);
            changed = true;
        }

        if !argument_names.is_empty() && details.argument_names != argument_names {
            details.argument_names = argument_names;
            changed = true;
        }

        changed
    }

    /// Replaces both details unconditionally.
    pub(crate) fn set_details(&self, description: String, argument_names: Vec<String>) {
        *self.details.write() = CommandDetails {
            description: Some(description),
            argument_names,
        };
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("bodies", &self.bodies)
            .field("prefixes", &self.prefixes)
            .field("details", &*self.details.read())
            .field("filters", &self.filters.len())
            .field("owner_only", &self.owner_only)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = self.prefixes.iter().next().map(String::as_str).unwrap_or_default();
        let bodies: Vec<&str> = self.bodies.iter().map(String::as_str).collect();
        write!(f, "{prefix}{}", bodies.join("|"))
    }
}

// ============================================================================
// CommandSpec
// ============================================================================

/// Registration parameters for a command.
///
/// Unset prefixes and owner-only flags fall back to the registering
/// manager's [`CommandDefaults`].
///
/// ```rust,ignore
/// let spec = CommandSpec::new(["ping", "p"])
///     .prefixes("./")
///     .description("Replies with pong")
///     .arguments(["target"]);
/// manager.register_command(spec, |client, message, ctx| async move { ... })?;
/// ```
#[derive(Clone)]
pub struct CommandSpec {
    bodies: Vec<String>,
    prefixes: Option<Vec<String>>,
    description: Option<String>,
    argument_names: Vec<String>,
    filters: Vec<MessageFilter>,
    enabled: bool,
    owner_only: Option<bool>,
}

impl CommandSpec {
    pub fn new<I, S>(bodies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            bodies: bodies.into_iter().map(Into::into).collect(),
            prefixes: None,
            description: None,
            argument_names: Vec::new(),
            filters: Vec::new(),
            enabled: true,
            owner_only: None,
        }
    }

    /// Sets one-character prefixes: every character of `chars` is a prefix.
    pub fn prefixes(mut self, chars: &str) -> Self {
        self.prefixes = Some(chars.chars().map(String::from).collect());
        self
    }

    /// Sets prefixes of any length.
    pub fn prefix_list<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefixes = Some(prefixes.into_iter().map(Into::into).collect());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Names the arguments, for help output.
    pub fn arguments<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argument_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Appends an async predicate. Predicates run in order, inside the
    /// command's lock, and the first `false` skips the command.
    pub fn filter<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(BoxedClient, Arc<Message>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.filters.push(message_filter(f));
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn owner_only(mut self, owner_only: bool) -> Self {
        self.owner_only = Some(owner_only);
        self
    }

    /// Validates the values and fills in the defaults.
    pub(crate) fn resolve(self, defaults: &CommandDefaults) -> ValidationResult<ResolvedSpec> {
        if self.bodies.is_empty() {
            return Err(ValidationError::invalid("bodies", "at least one body is required"));
        }
        for body in &self.bodies {
            if body.is_empty() {
                return Err(ValidationError::invalid("bodies", "body must not be empty"));
            }
            if body.chars().any(char::is_whitespace) {
                return Err(ValidationError::invalid(
                    "bodies",
                    format!("body `{body}` must not contain whitespace"),
                ));
            }
        }

        let prefixes = self.prefixes.unwrap_or_else(|| defaults.prefixes.clone());
        if prefixes.is_empty() {
            return Err(ValidationError::invalid("prefixes", "at least one prefix is required"));
        }
        if prefixes.iter().any(String::is_empty) {
            return Err(ValidationError::invalid("prefixes", "prefix must not be empty"));
        }

        validate_details(self.description.as_deref(), &self.argument_names)?;

        Ok(ResolvedSpec {
            bodies: self.bodies.iter().map(|b| b.to_lowercase()).collect(),
            prefixes: prefixes.into_iter().collect(),
            description: self.description,
            argument_names: self.argument_names,
            filters: self.filters,
            enabled: self.enabled,
            owner_only: self.owner_only.unwrap_or(defaults.owner_only),
        })
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("bodies", &self.bodies)
            .field("prefixes", &self.prefixes)
            .field("description", &self.description)
            .field("argument_names", &self.argument_names)
            .field("filters", &self.filters.len())
            .field("enabled", &self.enabled)
            .field("owner_only", &self.owner_only)
            .finish()
    }
}

pub(crate) fn validate_details(description: Option<&str>, argument_names: &[String]) -> ValidationResult<()> {
    if description.is_some_and(|d| d.trim().is_empty()) {
        return Err(ValidationError::invalid("description", "description must not be empty"));
    }
    if argument_names.iter().any(|name| name.trim().is_empty()) {
        return Err(ValidationError::invalid(
            "argument_names",
            "argument name must not be empty",
        ));
    }
    Ok(())
}

/// A validated spec with defaults applied and bodies case-folded.
pub(crate) struct ResolvedSpec {
    pub(crate) bodies: BTreeSet<String>,
    pub(crate) prefixes: BTreeSet<String>,
    pub(crate) description: Option<String>,
    pub(crate) argument_names: Vec<String>,
    pub(crate) filters: Vec<MessageFilter>,
    pub(crate) enabled: bool,
    pub(crate) owner_only: bool,
}

/// Per-manager defaults for specs that leave them unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDefaults {
    pub prefixes: Vec<String>,
    pub owner_only: bool,
}

impl Default for CommandDefaults {
    fn default() -> Self {
        Self {
            prefixes: vec![".".to_string()],
            owner_only: true,
        }
    }
}
