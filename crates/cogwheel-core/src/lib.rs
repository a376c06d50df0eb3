//! # Cogwheel Core
//!
//! Contracts and data model shared by every Cogwheel crate.
//!
//! This crate deliberately holds no behaviour of its own beyond small helpers;
//! it defines the seams the rest of the workspace plugs into:
//!
//! - **Data model**: [`Setting`], [`CommandSetting`], [`InboundMessage`]
//! - **Chat platform**: [`ChatPlatform`], the outbound side of a connected bot
//! - **Persistence**: [`SettingsStore`], the CRUD contract for settings
//! - **Adapters**: [`Adapter`] and [`MessageDispatcher`], the inbound side
//!
//! ```text
//! ┌─────────────┐  InboundMessage  ┌───────────────────┐
//! │   Adapter   │─────────────────▶│ MessageDispatcher │
//! │  (Discord)  │◀─────────────────│   (framework)     │
//! └─────────────┘   ChatPlatform   └───────────────────┘
//! ```

pub mod adapter;
pub mod error;
pub mod message;
pub mod platform;
pub mod setting;
pub mod store;

pub use adapter::{Adapter, BoxedAdapter, ConfigurableAdapter, MessageDispatcher};
pub use error::{
    AdapterError, AdapterResult, PlatformError, PlatformResult, StoreError, StoreResult,
};
pub use message::{Author, ChannelKind, ChannelRef, InboundMessage, UserRef};
pub use platform::{BoxedPlatform, ChatPlatform, Permission};
pub use setting::{CommandSetting, Setting};
pub use store::{BoxedStore, SettingsStore};

// Re-exported so adapters and the runtime agree on the shutdown token type.
pub use tokio_util::sync::CancellationToken;
