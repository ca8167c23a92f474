//! kgem runtime - configuration, logging and the host facade.
//!
//! This crate provides:
//! - Layered configuration ([`KgemConfig`], [`ConfigLoader`]) on figment
//! - Logging setup on `tracing-subscriber` ([`LoggingBuilder`])
//! - [`KgemRuntime`], which owns the root command and event managers and
//!   routes transport input into them
//!
//! ```ignore
//! use kgem_runtime::KgemRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = KgemRuntime::new();
//!     runtime.include_commands(my_addon_commands())?;
//!     runtime.include_events(my_addon_events())?;
//!
//!     // Dispatch until the transport closes or Ctrl+C
//!     runtime.serve(transport.incoming()).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, KgemConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{Incoming, KgemRuntime, RuntimeBuilder};

// Re-export tracing for use by addon crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for addon code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
