//! Runtime error types.

use cogwheel_core::{AdapterError, StoreError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The settings store failed.
    #[error("Settings store error: {0}")]
    Store(#[from] StoreError),

    /// Adapter configuration deserialization failed.
    #[error("Failed to deserialize adapter config: {0}")]
    AdapterConfigDeserialize(String),

    /// An adapter could not be created.
    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    /// A running adapter stopped with an error.
    #[error("Adapter '{adapter}' failed: {source}")]
    AdapterFailed {
        adapter: String,
        #[source]
        source: AdapterError,
    },

    /// No token in the configuration or the settings store.
    #[error("No bot token configured (set bot.token or store a `token` setting)")]
    MissingToken,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
