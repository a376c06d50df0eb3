//! Persisted settings.
//!
//! Two record kinds are persisted: free-form key/value [`Setting`]s (the bot
//! token, the command prefix, ...) and one [`CommandSetting`] per handler kind.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A key/value pair. Identity is the key alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    /// The setting key.
    pub key: String,
    /// The raw setting value.
    pub value: String,
}

impl Setting {
    /// Creates a new setting.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl PartialEq for Setting {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Setting {}

impl std::hash::Hash for Setting {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// Associates a handler implementation with the tag users type to invoke it.
///
/// Two *enabled* settings never share a tag; the registry enforces this by
/// forcing the later one to `enabled = false` on reconcile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandSetting {
    /// Stable identifier of the handler kind (e.g. `"roll"`).
    pub handler_id: String,
    /// The user-facing command keyword (e.g. `"roll"` for `!roll`).
    pub tag: String,
    /// Whether the command should be live.
    pub enabled: bool,
}

impl CommandSetting {
    /// Creates a new command setting.
    pub fn new(handler_id: impl Into<String>, tag: impl Into<String>, enabled: bool) -> Self {
        Self {
            handler_id: handler_id.into(),
            tag: tag.into(),
            enabled,
        }
    }

    /// Creates an enabled setting.
    pub fn enabled(handler_id: impl Into<String>, tag: impl Into<String>) -> Self {
        Self::new(handler_id, tag, true)
    }

    /// Creates a disabled setting.
    pub fn disabled(handler_id: impl Into<String>, tag: impl Into<String>) -> Self {
        Self::new(handler_id, tag, false)
    }
}

impl fmt::Display for CommandSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.enabled { "enabled" } else { "disabled" };
        write!(f, "{} -> '{}' ({state})", self.handler_id, self.tag)
    }
}
