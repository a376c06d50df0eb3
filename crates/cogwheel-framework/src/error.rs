//! Error types for the Cogwheel framework.

use thiserror::Error;

use cogwheel_core::{PlatformError, StoreError};

/// A handler could not be built from its handler id.
///
/// Always recovered locally: the setting stays disabled and the registry is
/// left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerConstructionError {
    /// No constructor is registered for the handler id.
    #[error("unknown handler '{0}'")]
    UnknownHandler(String),

    /// The constructor needs a collaborator that was never provided.
    #[error("handler '{handler}' requires collaborator '{collaborator}'")]
    MissingCollaborator {
        /// The handler being constructed.
        handler: String,
        /// Type name of the missing collaborator.
        collaborator: &'static str,
    },

    /// The constructor rejected its inputs for another reason.
    #[error("handler '{handler}' could not be constructed: {reason}")]
    Invalid {
        /// The handler being constructed.
        handler: String,
        /// Why construction failed.
        reason: String,
    },
}

/// Reconciling a [`CommandSetting`](cogwheel_core::CommandSetting) failed.
///
/// In both cases the setting passed to
/// [`CommandRegistry::reconcile`](crate::registry::CommandRegistry::reconcile)
/// has already been forced to `enabled = false`, so the caller only has to
/// persist it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// The tag is already bound to a different handler kind.
    #[error("tag '{tag}' is already bound to '{bound}', refusing to bind '{requested}'")]
    TagConflict {
        /// The contested tag.
        tag: String,
        /// Handler id currently holding the tag.
        bound: String,
        /// Handler id that asked for it.
        requested: String,
    },

    /// The setting carries a tag that can never be typed.
    #[error("invalid tag '{tag}' for '{handler}'")]
    InvalidTag {
        /// The offending tag.
        tag: String,
        /// The handler id it was configured for.
        handler: String,
    },

    /// The handler could not be constructed.
    #[error(transparent)]
    Construction(#[from] HandlerConstructionError),
}

/// Errors a handler may return from
/// [`on_command_received`](crate::handler::CommandHandler::on_command_received).
///
/// The dispatcher catches and logs all of them; none reaches the adapter.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The invocation's arguments did not make sense.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The author is not allowed to run the command.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A platform call failed.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// A settings store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Anything else.
    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    /// Creates an invalid-arguments error.
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Creates a permission-denied error.
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    /// Creates a generic failure.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Returns `true` for errors caused by the invoking user rather than the bot.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::InvalidArguments(_) | Self::PermissionDenied(_))
    }
}

/// Result type returned by command handlers.
pub type HandlerResult = Result<(), HandlerError>;

/// A settings edit could not be applied.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// No setting is persisted for the handler id.
    #[error("no setting for handler '{0}'")]
    UnknownSetting(String),

    /// The registry rejected the edit. The corrected setting was persisted.
    #[error(transparent)]
    Rejected(#[from] ReconcileError),

    /// The settings store failed. The in-memory registry stays authoritative.
    #[error(transparent)]
    Store(#[from] StoreError),
}
