//! Runtime configuration.
//!
//! [`KgemConfig`] is layered from built-in defaults, configuration files and
//! `KGEM_` environment variables by the figment-based [`ConfigLoader`], then
//! checked by [`validate_config`].

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    CommandsConfig, EventsConfig, KgemConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
