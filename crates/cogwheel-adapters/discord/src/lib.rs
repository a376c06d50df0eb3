//! # Cogwheel Adapter for Discord
//!
//! Connects a Cogwheel dispatcher to Discord through serenity.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cogwheel_adapter_discord::{DiscordAdapter, DiscordConfig};
//!
//! let token = runtime.resolve_token().await?;
//! let config = DiscordConfig {
//!     token: Some(token),
//!     ..runtime.adapter_config::<DiscordAdapter>()?
//! };
//! runtime.add_adapter(DiscordAdapter::from_config(config)?).await;
//! runtime.run().await?;
//! ```
//!
//! ## Required intents
//!
//! Reading commands needs `guild_messages`, `direct_messages` and the
//! privileged `message_content` intent, which must also be switched on in the
//! Discord developer portal. Permission checks read guilds from the cache, so
//! keep `guilds` enabled.

pub mod adapter;
pub mod config;
pub mod convert;
pub mod platform;

pub use adapter::DiscordAdapter;
pub use config::DiscordConfig;
pub use platform::DiscordPlatform;
