//! Configuration for the Cogwheel runtime.
//!
//! Settings are layered with figment: built-in defaults, then config files,
//! then `COGWHEEL_*` environment variables. See [`ConfigLoader`].

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile};
pub use schema::{
    BotSettings, CogwheelConfig, CommandOverride, CommandsConfig, DatabaseConfig, LogFormat,
    LogLevel, LogOutput, LogRotation, LoggingConfig, SpanEventConfig,
};
pub use validation::validate_config;
