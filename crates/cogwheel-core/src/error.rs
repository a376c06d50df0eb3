//! Error types shared across Cogwheel crates.
//!
//! Framework-level errors (tag conflicts, handler construction) live in
//! `cogwheel-framework`; this module only carries errors raised by the
//! external collaborators the core talks to.

use thiserror::Error;

// =============================================================================
// Platform Errors
// =============================================================================

/// Errors raised by a [`ChatPlatform`](crate::ChatPlatform) implementation.
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    /// An outbound message could not be delivered.
    #[error("failed to send message to channel '{channel}': {reason}")]
    SendFailed {
        /// The target channel id.
        channel: String,
        /// Reason reported by the platform.
        reason: String,
    },

    /// The referenced guild, channel or user does not exist.
    #[error("{kind} '{id}' not found")]
    NotFound {
        /// What kind of object was looked up.
        kind: &'static str,
        /// The missing id.
        id: String,
    },

    /// The bot lacks the permission to perform the operation.
    #[error("missing permission: {0}")]
    Forbidden(String),

    /// The operation is not supported in this context (e.g. kicking in a DM).
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Any other transport-level failure.
    #[error("platform request failed: {0}")]
    Http(String),
}

impl PlatformError {
    /// Creates a send failure for the given channel.
    pub fn send_failed(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SendFailed {
            channel: channel.into(),
            reason: reason.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors raised by a [`SettingsStore`](crate::SettingsStore).
///
/// A store error always means "the operation had no effect". Callers keep the
/// in-memory registry authoritative until the next successful reconcile.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The underlying database rejected or failed a query.
    #[error("database error: {0}")]
    Database(String),

    /// Schema migration failed while opening the store.
    #[error("migration error: {0}")]
    Migration(String),

    /// The store could not be reached at all.
    #[error("settings store unavailable: {0}")]
    Unavailable(String),

    /// A persisted row could not be decoded.
    #[error("corrupt record for '{key}': {reason}")]
    Corrupt {
        /// Key or handler id of the broken row.
        key: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl StoreError {
    /// Creates a database error from any displayable cause.
    pub fn database(err: impl std::fmt::Display) -> Self {
        Self::Database(err.to_string())
    }
}

// =============================================================================
// Adapter Errors
// =============================================================================

/// Errors raised while running an [`Adapter`](crate::Adapter).
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// The adapter was configured incorrectly (missing token, bad intents, ...).
    #[error("invalid adapter configuration: {0}")]
    Config(String),

    /// Connecting to the platform failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Internal adapter error.
    #[error("adapter error: {0}")]
    Internal(String),
}

impl AdapterError {
    /// Creates an internal adapter error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;
