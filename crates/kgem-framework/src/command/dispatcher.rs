//! The command manager.
//!
//! [`Commands`] is the manager kind that owns the command registry. Its bound
//! executable, [`CommandManager::feed_message`], matches the message text
//! against the registry and runs the first matching command:
//!
//! 1. Owner-only commands ignore messages the account did not send itself.
//! 2. The (chat, command) pair is claimed. A pair that is already running
//!    declines, so a command never runs twice at once in the same chat.
//! 3. The pair's named lock is taken and the command filters run in order.
//! 4. The arguments are split and the callback runs with a [`CommandContext`].
//! 5. A successful call is counted here and at every ancestor manager.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use kgem_core::{BoxedClient, IntoOutcome, Message, NamedLock, Outcome};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use super::context::{CommandContext, CommandInput};
use super::model::{Command, CommandDefaults, CommandId, CommandSpec, command_callback, validate_details};
use super::split::{parse_arguments, strip_invocation};
use crate::error::{ValidationError, ValidationResult};
use crate::handler::{self, Executable, ExecutionResult};
use crate::manager::{Manager, ManagerKind};

/// A manager dispatching text commands.
pub type CommandManager = Manager<Commands>;

/// How often a command ran through a manager.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub command: Arc<Command>,
    pub call_count: u64,
}

/// State of a command manager.
pub struct Commands {
    defaults: CommandDefaults,
    registry: RwLock<Vec<Arc<Command>>>,
    executions: Mutex<HashSet<(i64, CommandId)>>,
    lock: NamedLock<String>,
    statistics: Mutex<Vec<CallRecord>>,
}

impl Commands {
    pub fn new(defaults: CommandDefaults) -> Self {
        Self {
            defaults,
            registry: RwLock::new(Vec::new()),
            executions: Mutex::new(HashSet::new()),
            lock: NamedLock::new(),
            statistics: Mutex::new(Vec::new()),
        }
    }

    pub fn defaults(&self) -> &CommandDefaults {
        &self.defaults
    }

    /// Marks `command` as running in `chat_id`.
    ///
    /// Returns `None` if it already is. The mark is removed when the record
    /// is dropped.
    fn claim(&self, chat_id: i64, command: CommandId) -> Option<ExecutionRecord<'_>> {
        let key = (chat_id, command);
        let claimed = self.executions.lock().insert(key);
        claimed.then(|| ExecutionRecord {
            executions: &self.executions,
            key,
        })
    }
}

impl Default for Commands {
    fn default() -> Self {
        Self::new(CommandDefaults::default())
    }
}

impl ManagerKind for Commands {
    type Input = CommandInput;
    type Output = Arc<Command>;

    const NAME: &'static str = "CommandManager";

    fn executable() -> Option<Executable<Self>> {
        Some(handler::executable(
            |manager: Arc<CommandManager>, input: CommandInput| async move {
                manager.feed_message(input.client, input.message).await
            },
        ))
    }
}

/// "This command is running in this chat", for as long as it lives.
struct ExecutionRecord<'a> {
    executions: &'a Mutex<HashSet<(i64, CommandId)>>,
    key: (i64, CommandId),
}

impl Drop for ExecutionRecord<'_> {
    fn drop(&mut self) {
        self.executions.lock().remove(&self.key);
    }
}

impl Manager<Commands> {
    // ─── Registration ────────────────────────────────────────────────────────

    /// Registers a command.
    ///
    /// If a command with the same bodies and prefixes exists, only its
    /// description and argument names are updated: `Some(existing)` is
    /// returned when something changed and `None` when the registration
    /// added nothing. Otherwise the new command is appended and returned.
    pub fn register_command<F, Fut>(&self, spec: CommandSpec, callback: F) -> ValidationResult<Option<Arc<Command>>>
    where
        F: Fn(BoxedClient, Arc<Message>, CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoOutcome<()>,
    {
        let spec = spec.resolve(&self.kind().defaults)?;
        let mut registry = self.kind().registry.write();

        if let Some(existing) = registry.iter().find(|c| c.is_same(&spec.bodies, &spec.prefixes)) {
            let changed = existing.merge_details(spec.description, spec.argument_names);
            debug!(manager = %self, command = %existing, changed, "Command already registered");
            return Ok(changed.then(|| Arc::clone(existing)));
        }

        let command = Arc::new(Command::new(spec, command_callback(callback)));
        registry.push(Arc::clone(&command));
        debug!(manager = %self, command = %command, id = %command.id(), "Registered command");
        Ok(Some(command))
    }

    /// Starts a command registration on this manager.
    ///
    /// ```rust,ignore
    /// manager
    ///     .command(["ping"])
    ///     .description("Replies with pong")
    ///     .register(|client, message, ctx| async move { ... })?;
    /// ```
    pub fn command<I, S>(self: &Arc<Self>, bodies: I) -> CommandBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandBuilder {
            manager: Arc::clone(self),
            spec: CommandSpec::new(bodies),
        }
    }

    /// Replaces the description and argument names of the first command
    /// answering to `body`.
    pub fn describe_command<I, S>(
        &self,
        body: &str,
        description: impl Into<String>,
        argument_names: I,
    ) -> ValidationResult<Arc<Command>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let description = description.into();
        let argument_names: Vec<String> = argument_names.into_iter().map(Into::into).collect();
        validate_details(Some(&description), &argument_names)?;

        let body = body.to_lowercase();
        let registry = self.kind().registry.read();
        let command = registry
            .iter()
            .find(|c| c.bodies().contains(&body))
            .ok_or(ValidationError::CommandNotFound { body })?;

        command.set_details(description, argument_names);
        Ok(Arc::clone(command))
    }

    /// Removes a command. Returns `false` if no command has this id.
    pub fn remove_command(&self, id: CommandId) -> bool {
        let mut registry = self.kind().registry.write();
        let before = registry.len();
        registry.retain(|c| c.id() != id);
        let removed = registry.len() != before;
        if removed {
            debug!(manager = %self, %id, "Removed command");
        }
        removed
    }

    /// Snapshot of the registry, in registration order.
    pub fn registered_commands(&self) -> Vec<Arc<Command>> {
        self.kind().registry.read().clone()
    }

    // ─── Matching ────────────────────────────────────────────────────────────

    /// Returns the first enabled command `text` invokes.
    pub fn match_command(&self, text: &str) -> Option<Arc<Command>> {
        self.kind()
            .registry
            .read()
            .iter()
            .filter(|command| command.is_enabled())
            .find(|command| {
                command.bodies().iter().any(|body| {
                    command
                        .prefixes()
                        .iter()
                        .any(|prefix| strip_invocation(text, prefix, body).is_some())
                })
            })
            .cloned()
    }

    /// Returns `true` while `command` runs in `chat_id`.
    pub fn is_executing(&self, chat_id: i64, command: CommandId) -> bool {
        self.kind().executions.lock().contains(&(chat_id, command))
    }

    // ─── Dispatch ────────────────────────────────────────────────────────────

    /// Runs the command `message` invokes, if any.
    ///
    /// Declines when nothing matches, when an owner-only command sees a
    /// foreign message, when the command is already running in the chat, or
    /// when a filter rejects the message.
    pub async fn feed_message(
        self: &Arc<Self>,
        client: BoxedClient,
        message: Arc<Message>,
    ) -> ExecutionResult<Arc<Command>> {
        let Some(text) = message.text.as_deref() else {
            return Ok(Outcome::Declined);
        };
        let Some(command) = self.match_command(text) else {
            return Ok(Outcome::Declined);
        };

        let chat_id = message.chat_id();
        if command.is_owner_only() && !message.is_own(client.account().id) {
            trace!(manager = %self, command = %command, chat_id, "Foreign message for owner-only command");
            return Ok(Outcome::Declined);
        }

        let Some(record) = self.kind().claim(chat_id, command.id()) else {
            debug!(manager = %self, command = %command, chat_id, "Command is already running in this chat");
            return Ok(Outcome::Declined);
        };

        // Scoped per-invocation lock. The claim above already excludes a second
        // run for the same key, so this lock is never contended.
        let _guard = self.kind().lock.lock(format!("{chat_id}:C:{}", command.id())).await;

        for filter in &command.filters {
            if !filter(Arc::clone(&client), Arc::clone(&message)).await {
                trace!(manager = %self, command = %command, chat_id, "Command filter rejected the message");
                return Ok(Outcome::Declined);
            }
        }

        let context = CommandContext::new(Arc::clone(&command), parse_arguments(text), Arc::clone(self));
        let outcome = (command.callback)(client, Arc::clone(&message), context).await?;
        drop(record);

        match outcome {
            Outcome::Handled(()) | Outcome::Finished => {
                self.record_call(&command);
                Ok(Outcome::Handled(command))
            }
            Outcome::Declined => Ok(Outcome::Declined),
            Outcome::Propagate(directive) => Ok(Outcome::Propagate(directive)),
        }
    }

    // ─── Statistics ──────────────────────────────────────────────────────────

    /// Counts one call of `command` here and at every ancestor.
    fn record_call(&self, command: &Arc<Command>) {
        if let Some(parent) = self.parent() {
            parent.record_call(command);
        }

        let mut statistics = self.kind().statistics.lock();
        match statistics.iter_mut().find(|r| r.command.id() == command.id()) {
            Some(record) => record.call_count += 1,
            None => statistics.push(CallRecord {
                command: Arc::clone(command),
                call_count: 1,
            }),
        }
    }

    /// Per-command call counts seen by this manager.
    pub fn statistic(&self) -> Vec<CallRecord> {
        self.kind().statistics.lock().clone()
    }

    /// Sum of all per-command call counts.
    pub fn total_call_count(&self) -> u64 {
        self.kind().statistics.lock().iter().map(|r| r.call_count).sum()
    }
}

// ============================================================================
// CommandBuilder
// ============================================================================

/// A [`CommandSpec`] bound to the manager it will be registered on.
pub struct CommandBuilder {
    manager: Arc<CommandManager>,
    spec: CommandSpec,
}

impl CommandBuilder {
    pub fn prefixes(self, chars: &str) -> Self {
        self.map(|spec| spec.prefixes(chars))
    }

    pub fn prefix_list<I, S>(self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map(|spec| spec.prefix_list(prefixes))
    }

    pub fn description(self, description: impl Into<String>) -> Self {
        self.map(|spec| spec.description(description))
    }

    pub fn arguments<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map(|spec| spec.arguments(names))
    }

    pub fn filter<F, Fut>(self, f: F) -> Self
    where
        F: Fn(BoxedClient, Arc<Message>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.map(|spec| spec.filter(f))
    }

    pub fn enabled(self, enabled: bool) -> Self {
        self.map(|spec| spec.enabled(enabled))
    }

    pub fn owner_only(self, owner_only: bool) -> Self {
        self.map(|spec| spec.owner_only(owner_only))
    }

    /// Registers the command with `callback`.
    pub fn register<F, Fut>(self, callback: F) -> ValidationResult<Option<Arc<Command>>>
    where
        F: Fn(BoxedClient, Arc<Message>, CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoOutcome<()>,
    {
        self.manager.register_command(self.spec, callback)
    }

    fn map(self, f: impl FnOnce(CommandSpec) -> CommandSpec) -> Self {
        Self {
            manager: self.manager,
            spec: f(self.spec),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockClient, incoming_message, own_message};
    use kgem_core::Propagation;
    use std::io;
    use tokio::sync::Notify;

    fn noop_manager(bodies: &[&str]) -> (Arc<CommandManager>, Arc<Command>) {
        let manager = CommandManager::new();
        let command = manager
            .register_command(CommandSpec::new(bodies.iter().copied()), |_, _, _| async {})
            .unwrap()
            .unwrap();
        (manager, command)
    }

    fn input(message: Arc<Message>) -> CommandInput {
        CommandInput::new(MockClient::new().boxed(), message)
    }

    #[test]
    fn test_match_requires_boundary() {
        let (manager, command) = noop_manager(&["ping"]);

        let matched = manager.match_command(".ping").unwrap();
        assert_eq!(matched.id(), command.id());
        assert!(manager.match_command(".ping now").is_some());
        assert!(manager.match_command(".ping\nnow").is_some());
        assert!(manager.match_command(".pingpong").is_none());
        assert!(manager.match_command("ping").is_none());
        assert!(manager.match_command(".PING").is_none());
    }

    #[test]
    fn test_match_tries_every_body_and_prefix() {
        let manager = CommandManager::new();
        manager
            .register_command(CommandSpec::new(["Pong", "p"]).prefixes("!/"), |_, _, _| async {})
            .unwrap();

        assert!(manager.match_command("!pong").is_some());
        assert!(manager.match_command("/p x").is_some());
        assert!(manager.match_command(".pong").is_none());
    }

    #[test]
    fn test_disabled_commands_do_not_match() {
        let (manager, command) = noop_manager(&["ping"]);
        command.disable();
        assert!(manager.match_command(".ping").is_none());
        command.enable();
        assert!(manager.match_command(".ping").is_some());
    }

    #[test]
    fn test_first_registered_command_wins() {
        let manager = CommandManager::new();
        let first = manager
            .register_command(CommandSpec::new(["ping"]), |_, _, _| async {})
            .unwrap()
            .unwrap();
        manager
            .register_command(CommandSpec::new(["ping"]).prefixes("./"), |_, _, _| async {})
            .unwrap();

        assert_eq!(manager.match_command(".ping").unwrap().id(), first.id());
        assert_eq!(manager.registered_commands().len(), 2);
    }

    #[test]
    fn test_reregistration_merges() {
        let (manager, command) = noop_manager(&["ping"]);

        let same = manager
            .register_command(CommandSpec::new(["PING"]), |_, _, _| async {})
            .unwrap();
        assert!(same.is_none());

        let updated = manager
            .register_command(
                CommandSpec::new(["ping"]).description("pong").arguments(["who"]),
                |_, _, _| async {},
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.id(), command.id());
        assert_eq!(command.description().as_deref(), Some("pong"));
        assert_eq!(command.argument_names(), vec!["who"]);

        // Empty values never erase.
        assert!(
            manager
                .register_command(CommandSpec::new(["ping"]), |_, _, _| async {})
                .unwrap()
                .is_none()
        );
        assert_eq!(command.description().as_deref(), Some("pong"));
        assert_eq!(manager.registered_commands().len(), 1);
    }

    #[test]
    fn test_describe_and_remove() {
        let (manager, command) = noop_manager(&["ping", "p"]);

        let described = manager.describe_command("P", "pong", ["who"]).unwrap();
        assert_eq!(described.id(), command.id());
        assert_eq!(command.argument_names(), vec!["who"]);

        assert_eq!(
            manager.describe_command("nope", "x", Vec::<String>::new()).unwrap_err(),
            ValidationError::CommandNotFound { body: "nope".into() }
        );
        assert_eq!(
            manager.describe_command("ping", "", Vec::<String>::new()).unwrap_err().parameter(),
            Some("description")
        );

        assert!(manager.remove_command(command.id()));
        assert!(!manager.remove_command(command.id()));
        assert!(manager.match_command(".ping").is_none());
    }

    #[test]
    fn test_manager_defaults_apply() {
        let manager = CommandManager::builder(Commands::new(CommandDefaults {
            prefixes: vec!["!".into()],
            owner_only: false,
        }))
        .build();
        let command = manager
            .register_command(CommandSpec::new(["ping"]), |_, _, _| async {})
            .unwrap()
            .unwrap();
        assert!(!command.is_owner_only());
        assert!(manager.match_command("!ping").is_some());
        assert!(manager.match_command(".ping").is_none());
    }

    #[test]
    fn test_builder_registers() {
        let manager = CommandManager::new();
        let command = manager
            .command(["echo"])
            .prefixes("/")
            .description("Echoes its arguments")
            .arguments(["text"])
            .owner_only(false)
            .register(|_, _, _| async {})
            .unwrap()
            .unwrap();
        assert_eq!(command.to_string(), "/echo");
        assert_eq!(command.description().as_deref(), Some("Echoes its arguments"));
    }

    #[tokio::test]
    async fn test_feed_parses_arguments() {
        let manager = CommandManager::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        manager
            .register_command(CommandSpec::new(["ping"]), move |_, _, ctx: CommandContext| {
                let sink = Arc::clone(&sink);
                async move {
                    *sink.lock() = ctx.arguments().to_vec();
                }
            })
            .unwrap();

        let outcome = manager
            .execute(input(own_message(5, ".ping arg1\narg2 arg3")))
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::Handled(_)));
        assert_eq!(*seen.lock(), vec![vec!["arg1"], vec!["arg2", "arg3"]]);
    }

    #[tokio::test]
    async fn test_unmatched_text_declines() {
        let (manager, _) = noop_manager(&["ping"]);
        let outcome = manager.execute(input(own_message(5, "hello"))).await.unwrap();
        assert!(outcome.is_declined());
    }

    #[tokio::test]
    async fn test_owner_only_ignores_foreign_messages() {
        let (manager, command) = noop_manager(&["ping"]);
        let outcome = manager.execute(input(incoming_message(5, ".ping"))).await.unwrap();
        assert!(outcome.is_declined());
        assert_eq!(manager.total_call_count(), 0);

        let open = manager
            .register_command(CommandSpec::new(["open"]).owner_only(false), |_, _, _| async {})
            .unwrap()
            .unwrap();
        let outcome = manager.execute(input(incoming_message(5, ".open"))).await.unwrap();
        assert_eq!(outcome.value().map(|c| c.id()), Some(open.id()));
        assert_ne!(open.id(), command.id());
    }

    #[tokio::test]
    async fn test_concurrent_invocation_in_same_chat_declines() {
        let manager = CommandManager::new();
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());

        let (s, r) = (Arc::clone(&started), Arc::clone(&release));
        let command = manager
            .register_command(CommandSpec::new(["slow"]), move |_, _, _| {
                let (started, release) = (Arc::clone(&s), Arc::clone(&r));
                async move {
                    started.notify_one();
                    release.notified().await;
                }
            })
            .unwrap()
            .unwrap();

        let first = tokio::spawn(manager.execute(input(own_message(9, ".slow"))));
        started.notified().await;
        let key = format!("9:C:{}", command.id());
        assert!(manager.is_executing(9, command.id()));
        assert!(manager.kind().lock.is_locked(&key));

        // Declined at the claim, without queueing on the named lock.
        let second = manager.execute(input(own_message(9, ".slow"))).await.unwrap();
        assert!(second.is_declined());
        assert_eq!(manager.kind().lock.active_keys(), 1);

        release.notify_one();
        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, Outcome::Handled(_)));
        assert!(!manager.is_executing(9, command.id()));
        assert!(!manager.kind().lock.is_locked(&key));
        assert_eq!(manager.total_call_count(), 1);
    }

    #[tokio::test]
    async fn test_filters_run_in_order_and_release_the_record() {
        let manager = CommandManager::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (Arc::clone(&calls), Arc::clone(&calls));
        let command = manager
            .register_command(
                CommandSpec::new(["guarded"])
                    .filter(move |_, _| {
                        a.lock().push("first");
                        async { true }
                    })
                    .filter(move |_, message: Arc<Message>| {
                        b.lock().push("second");
                        let allowed = message.text.as_deref() == Some(".guarded yes");
                        async move { allowed }
                    }),
                |_, _, _| async {},
            )
            .unwrap()
            .unwrap();

        let outcome = manager.execute(input(own_message(3, ".guarded no"))).await.unwrap();
        assert!(outcome.is_declined());
        assert_eq!(*calls.lock(), vec!["first", "second"]);
        assert!(!manager.is_executing(3, command.id()));

        let outcome = manager.execute(input(own_message(3, ".guarded yes"))).await.unwrap();
        assert!(matches!(outcome, Outcome::Handled(_)));
    }

    #[tokio::test]
    async fn test_failing_callback_releases_the_record() {
        let manager = CommandManager::new();
        let command = manager
            .register_command(CommandSpec::new(["boom"]), |_, _, _| async {
                Err::<(), _>(io::Error::other("boom"))
            })
            .unwrap()
            .unwrap();

        // A root manager without an error handler swallows the failure.
        let outcome = manager.execute(input(own_message(4, ".boom"))).await.unwrap();
        assert_eq!(outcome.value().map(|c| c.id()), None);
        assert!(!manager.is_executing(4, command.id()));
        assert_eq!(manager.total_call_count(), 0);
    }

    #[tokio::test]
    async fn test_callback_directives_pass_through_uncounted() {
        let manager = CommandManager::new();
        manager
            .register_command(CommandSpec::new(["stop"]), |_, _, _| async {
                Outcome::<()>::Propagate(Propagation::Stop)
            })
            .unwrap();

        let outcome = manager.execute(input(own_message(4, ".stop"))).await.unwrap();
        assert!(matches!(outcome, Outcome::Propagate(Propagation::Stop)));
        assert_eq!(manager.total_call_count(), 0);
    }

    #[tokio::test]
    async fn test_statistics_bubble_to_ancestors() {
        let root = CommandManager::new();
        let middle = CommandManager::new();
        let (leaf, command) = noop_manager(&["ping"]);
        root.include(Arc::clone(&middle)).unwrap();
        middle.include(Arc::clone(&leaf)).unwrap();

        for _ in 0..2 {
            let outcome = root.execute(input(own_message(1, ".ping"))).await.unwrap();
            assert_eq!(outcome.value().map(|c| c.id()), Some(command.id()));
        }

        for manager in [&root, &middle, &leaf] {
            let statistic = manager.statistic();
            assert_eq!(statistic.len(), 1);
            assert_eq!(statistic[0].command.id(), command.id());
            assert_eq!(statistic[0].call_count, 2);
            assert_eq!(manager.total_call_count(), 2);
        }
    }

    #[test]
    fn test_default_executable_is_bound() {
        let manager = CommandManager::new();
        assert!(manager.has_executable());
        assert!(manager.is_enabled());
        assert_eq!(manager.to_string(), "CommandManager(addon=NO ADDON, enabled=true)");
    }
}
