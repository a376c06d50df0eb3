//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use cogwheel_framework::{DEFAULT_HANDLER_TIMEOUT, DEFAULT_PREFIX, SeedOverride};
use serde::{Deserialize, Serialize};

/// Root configuration structure.
///
/// ```toml
/// [bot]
/// prefix = "?"
///
/// [database]
/// path = "data/cogwheel.db"
///
/// [commands.roll]
/// tag = "dice"
///
/// [adapters.discord]
/// intents = ["guild_messages", "message_content"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CogwheelConfig {
    /// Bot-wide settings.
    #[serde(default)]
    pub bot: BotSettings,

    /// Settings store location.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Per-handler seed overrides.
    #[serde(default)]
    pub commands: CommandsConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Raw adapter sections, keyed by `ConfigurableAdapter::config_key()`.
    #[serde(default)]
    pub adapters: BTreeMap<String, figment::value::Value>,
}

// ─── Bot ────────────────────────────────────────────────────────────

/// Bot-wide settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct BotSettings {
    /// Platform token. Falls back to the `token` settings key when unset.
    #[serde(default)]
    pub token: Option<String>,

    /// Default command prefix. A prefix persisted in the store wins.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Whether messages from other bots are ignored.
    #[serde(default = "default_ignore_bots")]
    pub ignore_bots: bool,

    /// Longest a single handler may run, in milliseconds.
    #[serde(default = "default_handler_timeout_ms")]
    pub handler_timeout_ms: u64,
}

impl BotSettings {
    /// Returns the handler timeout as a [`Duration`].
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_millis(self.handler_timeout_ms)
    }
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            token: None,
            prefix: default_prefix(),
            ignore_bots: default_ignore_bots(),
            handler_timeout_ms: default_handler_timeout_ms(),
        }
    }
}

impl fmt::Debug for BotSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotSettings")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("prefix", &self.prefix)
            .field("ignore_bots", &self.ignore_bots)
            .field("handler_timeout_ms", &self.handler_timeout_ms)
            .finish()
    }
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_ignore_bots() -> bool {
    true
}

fn default_handler_timeout_ms() -> u64 {
    DEFAULT_HANDLER_TIMEOUT.as_millis() as u64
}

// ─── Database ───────────────────────────────────────────────────────

/// Settings store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "cogwheel.db".to_string()
}

// ─── Commands ───────────────────────────────────────────────────────

/// Overrides for one handler kind, applied when its setting is first seeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOverride {
    /// Tag to seed instead of the default.
    #[serde(default)]
    pub tag: Option<String>,

    /// Whether the command starts enabled.
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl From<CommandOverride> for SeedOverride {
    fn from(o: CommandOverride) -> Self {
        Self {
            tag: o.tag,
            enabled: o.enabled,
        }
    }
}

/// The `[commands]` table, keyed by handler id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandsConfig {
    /// Overrides keyed by handler id.
    pub overrides: BTreeMap<String, CommandOverride>,
}

impl CommandsConfig {
    /// Converts into the reconciler's seed overrides.
    pub fn seed_overrides(&self) -> BTreeMap<String, SeedOverride> {
        self.overrides
            .iter()
            .map(|(id, o)| (id.clone(), SeedOverride::from(o.clone())))
            .collect()
    }
}

// ─── Logging ────────────────────────────────────────────────────────

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the level as a filter directive string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a [`tracing::Level`].
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Newline-delimited JSON. Needs the `json-log` feature.
    #[cfg(feature = "json-log")]
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// The file at [`LoggingConfig::file_path`].
    File,
}

/// How often the log file rolls over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base level; `RUST_LOG` replaces it when set.
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread ids.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,

    /// Log file for [`LogOutput::File`].
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub rotation: LogRotation,

    /// Per-target levels, e.g. `sqlx = "warn"`.
    #[serde(default)]
    pub filters: BTreeMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            file_path: None,
            rotation: LogRotation::Never,
            filters: BTreeMap::from([("sqlx".to_string(), LogLevel::Warn)]),
        }
    }
}
