//! # Cogwheel
//!
//! A chat bot whose commands are configured at runtime. Each command handler
//! has a persisted setting `(handler_id, tag, enabled)`; the registry binds
//! enabled tags to live handler instances and the dispatcher routes
//! `<prefix><tag> args...` messages to them.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌──────────────────┐   ┌─────────────┐
//! │ Adapter  │──▶│ Dispatcher │──▶│ CommandRegistry  │──▶│ handler     │──▶ ChatPlatform
//! │(Discord) │   │  (prefix)  │   │ tag → handler    │   │ (own span)  │
//! └──────────┘   └────────────┘   └────────▲─────────┘   └─────────────┘
//!                                          │ reconcile
//!                               ┌──────────┴─────────┐   ┌───────────────┐
//!                               │ SettingsReconciler │◀─▶│ SettingsStore │
//!                               └────────────────────┘   └───────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cogwheel::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = BotRuntime::builder()
//!         .factory(builtin_factory())
//!         .build()
//!         .await?;
//!     runtime.register_adapter::<DiscordAdapter>().await?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `builtin-commands` *(default)*: the stock handlers in `cogwheel-commands`
//! - `toml-config` *(default)* / `yaml-config`: config file formats
//! - `discord`: the serenity-based Discord adapter
//! - `json-log`: JSON log output

pub use cogwheel_core as core;
pub use cogwheel_framework as framework;
pub use cogwheel_runtime as runtime;
pub use cogwheel_store as store;

#[cfg(feature = "builtin-commands")]
pub use cogwheel_commands as commands;

#[cfg(feature = "discord")]
pub use cogwheel_adapter_discord as discord;

/// Commonly used types for building and running a bot.
///
/// ```rust,ignore
/// use cogwheel::prelude::*;
/// ```
pub mod prelude {
    // Runtime
    pub use cogwheel_runtime::{BotRuntime, CogwheelConfig, RuntimeError, RuntimeResult};

    // Writing handlers
    pub use cogwheel_framework::{
        CommandContext, CommandDescription, CommandHandler, HandlerError, HandlerFactory,
        HandlerKind, HandlerResult,
    };

    // Routing and settings
    pub use cogwheel_framework::{CommandRegistry, Dispatcher, SettingsReconciler};

    // Core model
    pub use cogwheel_core::{
        ChannelKind, ChatPlatform, CommandSetting, InboundMessage, Permission, SettingsStore,
    };

    pub use cogwheel_store::{MemorySettingsStore, SqliteSettingsStore};

    #[cfg(feature = "builtin-commands")]
    pub use cogwheel_commands::builtin_factory;

    #[cfg(feature = "discord")]
    pub use cogwheel_adapter_discord::{DiscordAdapter, DiscordConfig};

    pub use cogwheel_runtime::prelude::*;
}
