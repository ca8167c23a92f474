//! The host facade.
//!
//! [`KgemRuntime`] owns the root command and event managers, configured from
//! [`KgemConfig`]. Addons include their own managers into the roots, and the
//! transport feeds every incoming message and raw update through
//! [`KgemRuntime::handle_message`] and [`KgemRuntime::handle_update`], or
//! hands a whole stream of them to [`KgemRuntime::serve`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use kgem_runtime::KgemRuntime;
//!
//! let runtime = KgemRuntime::builder().config_file("kgem.toml").build()?;
//!
//! let addon = CommandManager::builder(Commands::default()).label("ping").build();
//! addon.command(["ping"]).register(|client, message, ctx| async move { ... })?;
//! runtime.include_commands(addon)?;
//!
//! runtime.serve(transport.incoming()).await?;
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use kgem_core::{BoxedClient, Message, Outcome, RawUpdate};
use kgem_framework::{
    BoxedManagerService, Command, CommandInput, CommandManager, Commands, Event, EventFeed, EventManager, Events,
    UpdateLookups,
};
use tokio::signal;
use tokio::task::JoinSet;
use tower::util::BoxCloneSyncService;
use tower::{ServiceBuilder, ServiceExt};
use tracing::{debug, error, info, warn};

use crate::config::{ConfigLoader, ConfigResult, KgemConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// Label of the root managers when the configuration names none.
const ROOT_LABEL: &str = "kgem";

/// One input the transport delivers.
#[derive(Clone)]
pub enum Incoming {
    /// A parsed message, offered to the command managers.
    Message {
        client: BoxedClient,
        message: Arc<Message>,
    },
    /// A raw update, offered to the event managers.
    Update {
        client: BoxedClient,
        update: RawUpdate,
        lookups: UpdateLookups,
    },
}

/// Owns the root managers and routes transport input into them.
pub struct KgemRuntime {
    config: KgemConfig,
    commands: Arc<CommandManager>,
    events: Arc<EventManager>,
    command_service: BoxedManagerService<Commands>,
}

impl KgemRuntime {
    /// Creates a runtime from the configuration found in the default locations.
    ///
    /// Falls back to the defaults if the configuration cannot be loaded.
    pub fn new() -> Self {
        let config = ConfigLoader::new().with_current_dir().load().unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config ({e}), using defaults");
            KgemConfig::default()
        });

        Self::from_config(&config)
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from `config`, installing its logging setup first.
    pub fn from_config(config: &KgemConfig) -> Self {
        logging::init_from_config(&config.logging);

        let commands = CommandManager::builder(Commands::new(config.commands.defaults()))
            .label(config.commands.label.as_deref().unwrap_or(ROOT_LABEL))
            .enabled(config.commands.enabled)
            .build();

        let events = EventManager::builder(Events::default())
            .label(config.events.label.as_deref().unwrap_or(ROOT_LABEL))
            .enabled(config.events.enabled)
            .build();

        let command_service = match config.commands.timeout() {
            Some(timeout) => BoxCloneSyncService::new(
                ServiceBuilder::new()
                    .timeout(timeout)
                    .service(commands.service()),
            ),
            None => BoxCloneSyncService::new(commands.service()),
        };

        info!(
            log_level = %config.logging.level,
            commands = %commands,
            events = %events,
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            commands,
            events,
            command_service,
        }
    }

    pub fn config(&self) -> &KgemConfig {
        &self.config
    }

    /// The root command manager.
    pub fn commands(&self) -> &Arc<CommandManager> {
        &self.commands
    }

    /// The root event manager.
    pub fn events(&self) -> &Arc<EventManager> {
        &self.events
    }

    /// Includes an addon's command manager into the root.
    pub fn include_commands(&self, manager: Arc<CommandManager>) -> RuntimeResult<()> {
        Ok(self.commands.include(manager)?)
    }

    /// Includes an addon's event manager into the root.
    pub fn include_events(&self, manager: Arc<EventManager>) -> RuntimeResult<()> {
        Ok(self.events.include(manager)?)
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Offers `message` to the command managers.
    ///
    /// Returns the command that handled it, if any.
    pub async fn handle_message(
        &self,
        client: BoxedClient,
        message: Arc<Message>,
    ) -> RuntimeResult<Option<Arc<Command>>> {
        let chat_id = message.chat_id();
        let outcome = self
            .command_service
            .clone()
            .oneshot(CommandInput::new(client, message))
            .await
            .map_err(RuntimeError::Dispatch)?;

        match outcome {
            Outcome::Handled(command) => Ok(Some(command)),
            Outcome::Declined => {
                debug!(chat_id, "Message was not handled by any command");
                Ok(None)
            }
            Outcome::Finished | Outcome::Propagate(_) => Ok(None),
        }
    }

    /// Resolves `update` and offers the event to the event managers.
    pub async fn handle_update(
        &self,
        client: BoxedClient,
        update: RawUpdate,
        lookups: UpdateLookups,
    ) -> RuntimeResult<Outcome<()>> {
        let name = update.name().to_string();
        let outcome = self
            .events
            .execute(EventFeed::raw(client, update, lookups))
            .await
            .map_err(RuntimeError::Dispatch)?;

        if outcome.is_declined() {
            debug!(update = %name, "Update was not handled by any event handler");
        }
        Ok(outcome)
    }

    /// Offers an already resolved event to the event managers.
    pub async fn handle_event(&self, client: BoxedClient, event: Event) -> RuntimeResult<Outcome<()>> {
        let name = event.name();
        let outcome = self
            .events
            .execute(EventFeed::resolved(client, event))
            .await
            .map_err(RuntimeError::Dispatch)?;

        if outcome.is_declined() {
            debug!(event = name, "Event was not handled by any event handler");
        }
        Ok(outcome)
    }

    // =========================================================================
    // Serving
    // =========================================================================

    /// Dispatches `incoming` until it ends or a shutdown signal arrives.
    pub async fn serve<S>(&self, incoming: S) -> RuntimeResult<()>
    where
        S: Stream<Item = Incoming> + Send,
    {
        self.serve_until(incoming, wait_for_shutdown()).await
    }

    /// Dispatches `incoming` until it ends or `shutdown` completes.
    ///
    /// Updates are handled one after another, in delivery order. Commands run
    /// as tasks of their own so a long command does not hold up the stream;
    /// they are awaited before this returns.
    pub async fn serve_until<S, F>(&self, incoming: S, shutdown: F) -> RuntimeResult<()>
    where
        S: Stream<Item = Incoming> + Send,
        F: Future<Output = ()> + Send,
    {
        let mut incoming = std::pin::pin!(incoming);
        let mut shutdown = std::pin::pin!(shutdown);
        let mut commands = JoinSet::new();

        info!("kgem runtime is now serving");

        loop {
            let item = tokio::select! {
                item = incoming.next() => item,
                () = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            };
            let Some(item) = item else {
                debug!("Incoming stream ended");
                break;
            };

            match item {
                Incoming::Message { client, message } => {
                    let service = self.command_service.clone();
                    commands.spawn(async move {
                        let chat_id = message.chat_id();
                        if let Err(error) = service.oneshot(CommandInput::new(client, message)).await {
                            warn!(chat_id, error = %error, "Command dispatch failed");
                        }
                    });
                }
                Incoming::Update { client, update, lookups } => {
                    if let Err(error) = self.handle_update(client, update, lookups).await {
                        warn!(error = %error, "Event dispatch failed");
                    }
                }
            }

            while let Some(result) = commands.try_join_next() {
                if let Err(error) = result {
                    error!(error = %error, "Command task panicked");
                }
            }
        }

        while let Some(result) = commands.join_next().await {
            if let Err(error) = result {
                error!(error = %error, "Command task panicked");
            }
        }

        info!("kgem runtime stopped");
        Ok(())
    }
}

impl Default for KgemRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for Ctrl+C or, on unix, SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(error) => warn!(error = %error, "Cannot listen for SIGTERM"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(error) => {
            error!(error = %error, "Cannot listen for Ctrl+C, serving until the stream ends");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`KgemRuntime`] with custom configuration sources.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    pub fn merge(mut self, config: KgemConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    pub fn build(self) -> ConfigResult<KgemRuntime> {
        let config = self.config_loader.load()?;
        Ok(KgemRuntime::from_config(&config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
