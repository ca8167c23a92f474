//! Hierarchical executors.
//!
//! A [`Manager`] is an enable/disable switch around one bound executable, plus
//! a list of included child managers of the same kind. [`Manager::execute`] is
//! the single entry point:
//!
//! - A disabled manager finishes immediately without doing anything.
//! - A manager with no executable logs a warning and finishes.
//! - When the executable declines, the children are tried in inclusion order
//!   until one of them does not decline. If all decline, so does the parent.
//! - Propagation directives are handed back untouched.
//! - Errors go to the manager's error handler if one is set. Otherwise they
//!   are re-raised to the parent, and a root manager logs and swallows them.
//!
//! The kind parameter `K` carries the manager's domain state (the command
//! registry, the event handler table) and fixes the input and output types.
//! Only managers of the same kind can be included into each other.
//!
//! # Example
//!
//! ```rust,ignore
//! let root = CommandManager::builder(Commands::default()).label("core").build();
//! let addon = CommandManager::new();
//! root.include(addon.clone())?;
//!
//! let outcome = root.execute(CommandInput::new(client, message)).await?;
//! ```

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use futures::FutureExt;
use futures::future::BoxFuture;
use kgem_core::{BoxError, IntoOutcome, Outcome};
use parking_lot::RwLock;
use tracing::{Instrument, debug, debug_span, warn};

use crate::error::ManagerError;
use crate::handler::{ErrorHandler, Executable, ExecutionResult, executable};

/// Label used when a manager was built without one.
pub const NO_ADDON: &str = "NO ADDON";

/// The domain a manager operates in.
pub trait ManagerKind: Send + Sync + Sized + 'static {
    /// Arguments passed to the executable on every call.
    type Input: Clone + Send + Sync + 'static;
    /// Value produced by a handled execution.
    type Output: Send + 'static;

    /// Type name used in `Display` and logs.
    const NAME: &'static str;

    /// Whether a freshly built manager starts enabled.
    const ENABLED_BY_DEFAULT: bool = true;

    /// The executable bound when the manager is built.
    fn executable() -> Option<Executable<Self>> {
        None
    }
}

/// What an error handler gets to see besides the error itself.
pub struct ErrorContext<K: ManagerKind> {
    /// The input the failing execution was called with.
    pub input: K::Input,
    /// The manager that recovered the error.
    pub manager: Arc<Manager<K>>,
}

/// A node of the manager tree.
pub struct Manager<K: ManagerKind> {
    kind: K,
    label: Option<String>,
    enabled: AtomicBool,
    executable: RwLock<Option<Executable<K>>>,
    error_handler: RwLock<Option<ErrorHandler<K>>>,
    parent: RwLock<Weak<Manager<K>>>,
    children: RwLock<Vec<Arc<Manager<K>>>>,
}

/// Builder for [`Manager`].
pub struct ManagerBuilder<K: ManagerKind> {
    kind: K,
    label: Option<String>,
    enabled: bool,
}

impl<K: ManagerKind> ManagerBuilder<K> {
    /// Sets the diagnostic label (usually the addon name).
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the initial enabled state.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builds the manager with the kind's default executable bound.
    pub fn build(self) -> Arc<Manager<K>> {
        Arc::new(Manager {
            kind: self.kind,
            label: self.label,
            enabled: AtomicBool::new(self.enabled),
            executable: RwLock::new(K::executable()),
            error_handler: RwLock::new(None),
            parent: RwLock::new(Weak::new()),
            children: RwLock::new(Vec::new()),
        })
    }
}

impl<K: ManagerKind> Manager<K> {
    /// Creates a builder around the given kind state.
    pub fn builder(kind: K) -> ManagerBuilder<K> {
        ManagerBuilder {
            kind,
            label: None,
            enabled: K::ENABLED_BY_DEFAULT,
        }
    }

    /// Creates a manager with default state, no label and the kind's default
    /// enabled flag.
    pub fn new() -> Arc<Self>
    where
        K: Default,
    {
        Self::builder(K::default()).build()
    }

    /// The kind-specific state.
    pub fn kind(&self) -> &K {
        &self.kind
    }

    /// The diagnostic label, or [`NO_ADDON`].
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(NO_ADDON)
    }

    // ─── Enable / disable ────────────────────────────────────────────────────

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
        debug!(manager = %self, "Manager is enabled");
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        debug!(manager = %self, "Manager is disabled");
    }

    pub fn toggle(&self) {
        self.enabled.fetch_xor(true, Ordering::SeqCst);
        debug!(manager = %self, "Manager is toggled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    // ─── Callbacks ───────────────────────────────────────────────────────────

    /// Binds `f` as the executable, replacing the current one.
    pub fn set_executable<F, Fut>(&self, f: F)
    where
        F: Fn(Arc<Manager<K>>, K::Input) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoOutcome<K::Output>,
    {
        *self.executable.write() = Some(executable(f));
        debug!(manager = %self, "Changed executable");
    }

    /// Unbinds the executable. Later executions finish with a warning.
    pub fn clear_executable(&self) {
        *self.executable.write() = None;
        debug!(manager = %self, "Removed executable");
    }

    /// Returns `true` if an executable is bound.
    pub fn has_executable(&self) -> bool {
        self.executable.read().is_some()
    }

    /// Sets the handler that recovers execution errors at this manager.
    pub fn set_error_handler<F>(&self, handler: F)
    where
        F: Fn(&BoxError, ErrorContext<K>) + Send + Sync + 'static,
    {
        *self.error_handler.write() = Some(Arc::new(handler));
    }

    pub fn clear_error_handler(&self) {
        *self.error_handler.write() = None;
    }

    // ─── Tree ────────────────────────────────────────────────────────────────

    /// The manager this one is included into.
    pub fn parent(&self) -> Option<Arc<Manager<K>>> {
        self.parent.read().upgrade()
    }

    /// Snapshot of the included managers, in inclusion order.
    pub fn included_managers(&self) -> Vec<Arc<Manager<K>>> {
        self.children.read().clone()
    }

    /// Returns the chain of ancestors, nearest first.
    pub fn ancestors(&self) -> Vec<Arc<Manager<K>>> {
        let mut chain = Vec::new();
        let mut current = self.parent();
        while let Some(manager) = current {
            current = manager.parent();
            chain.push(manager);
        }
        chain
    }

    /// Includes `child`, making this manager its parent.
    ///
    /// A child that already has another parent is moved. Including a manager
    /// that is already a child is a no-op.
    pub fn include(self: &Arc<Self>, child: Arc<Manager<K>>) -> Result<(), ManagerError> {
        let creates_cycle = Arc::ptr_eq(self, &child)
            || self.ancestors().iter().any(|a| Arc::ptr_eq(a, &child));
        if creates_cycle {
            return Err(ManagerError::Cycle {
                parent: self.to_string(),
                child: child.to_string(),
            });
        }

        if let Some(previous) = child.parent() {
            if Arc::ptr_eq(&previous, self) {
                return Ok(());
            }
            previous.children.write().retain(|c| !Arc::ptr_eq(c, &child));
        }

        *child.parent.write() = Arc::downgrade(self);
        self.children.write().push(Arc::clone(&child));
        debug!(manager = %self, child = %child, "Included child manager");
        Ok(())
    }

    /// Excludes `child` and clears its parent link.
    pub fn exclude(&self, child: &Arc<Manager<K>>) -> Result<(), ManagerError> {
        {
            let mut children = self.children.write();
            let Some(position) = children.iter().position(|c| Arc::ptr_eq(c, child)) else {
                return Err(ManagerError::NotIncluded {
                    parent: self.to_string(),
                    child: child.to_string(),
                });
            };
            children.remove(position);
        }

        *child.parent.write() = Weak::new();
        debug!(manager = %self, child = %child, "Excluded child manager");
        Ok(())
    }

    // ─── Execution ───────────────────────────────────────────────────────────

    /// Runs the manager on `input` inside an `execute` span carrying the
    /// `manager` field.
    pub fn execute(self: &Arc<Self>, input: K::Input) -> BoxFuture<'static, ExecutionResult<K::Output>> {
        let span = debug_span!("execute", manager = %self);
        Arc::clone(self).run(input).instrument(span).boxed()
    }

    async fn run(self: Arc<Self>, input: K::Input) -> ExecutionResult<K::Output> {
        if !self.is_enabled() {
            debug!(manager = %self, "Manager is disabled, exit");
            return Ok(Outcome::Finished);
        }

        let executable = self.executable.read().clone();
        let Some(executable) = executable else {
            warn!(manager = %self, "Manager doesn't have an executable, but tried to be executed");
            return Ok(Outcome::Finished);
        };

        let start = Instant::now();

        let result = match executable(Arc::clone(&self), input.clone()).await {
            Ok(Outcome::Declined) => self.delegate(input.clone()).await,
            other => other,
        };

        let outcome = match result {
            Ok(outcome) => Ok(outcome),
            Err(error) => self.recover(error, input),
        };

        debug!(
            manager = %self,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Manager executed"
        );

        outcome
    }

    /// Offers the input to every child in turn.
    async fn delegate(&self, input: K::Input) -> ExecutionResult<K::Output> {
        for child in self.included_managers() {
            match child.execute(input.clone()).await? {
                Outcome::Declined => continue,
                outcome => return Ok(outcome),
            }
        }
        Ok(Outcome::Declined)
    }

    fn recover(self: &Arc<Self>, error: BoxError, input: K::Input) -> ExecutionResult<K::Output> {
        let handler = self.error_handler.read().clone();
        if let Some(handler) = handler {
            handler(
                &error,
                ErrorContext {
                    input,
                    manager: Arc::clone(self),
                },
            );
            return Ok(Outcome::Finished);
        }

        if self.parent().is_some() {
            return Err(error);
        }

        warn!(
            manager = %self,
            error = %error,
            "Error occurred while executing manager. Set the error handler to see more details"
        );
        Ok(Outcome::Finished)
    }
}

impl<K: ManagerKind> fmt::Display for Manager<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(addon={}, enabled={})",
            K::NAME,
            self.label(),
            self.is_enabled()
        )
    }
}

impl<K: ManagerKind> fmt::Debug for Manager<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(K::NAME)
            .field("label", &self.label())
            .field("enabled", &self.is_enabled())
            .field("has_executable", &self.has_executable())
            .field("children", &self.children.read().len())
            .finish()
    }
}
