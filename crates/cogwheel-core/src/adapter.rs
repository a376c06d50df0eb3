//! Adapter traits.
//!
//! Adapters bridge a chat platform's client library with Cogwheel. The
//! library owns the gateway connection and its reconnection logic; the adapter
//! only translates events into [`InboundMessage`]s and hands them to a
//! [`MessageDispatcher`] together with a [`ChatPlatform`] handle for replies.
//!
//! # Architecture
//!
//! ```text
//! client library ──▶ Adapter ──▶ MessageDispatcher ──▶ handlers
//!                       ▲                                  │
//!                       └──────────── ChatPlatform ◀───────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! #[async_trait]
//! impl Adapter for ConsoleAdapter {
//!     fn name(&self) -> &'static str {
//!         "console"
//!     }
//!
//!     async fn run(
//!         &self,
//!         dispatcher: Arc<dyn MessageDispatcher>,
//!         shutdown: CancellationToken,
//!     ) -> AdapterResult<()> {
//!         while let Some(line) = next_line(&shutdown).await {
//!             dispatcher.dispatch(to_message(line), self.platform()).await;
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::AdapterResult;
use crate::message::InboundMessage;
use crate::platform::BoxedPlatform;

/// Receives inbound messages from an adapter.
///
/// Implementations must never fail outward: whatever goes wrong while handling
/// one message is logged and the adapter keeps delivering the next one.
#[async_trait]
pub trait MessageDispatcher: Send + Sync {
    /// Dispatch `message` (received through `platform`).
    async fn dispatch(&self, message: InboundMessage, platform: BoxedPlatform);
}

/// The core adapter trait.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Returns the adapter name, used in logs.
    fn name(&self) -> &'static str;

    /// Connects to the platform and feeds messages to `dispatcher` until
    /// `shutdown` is cancelled or the connection ends for good.
    async fn run(
        &self,
        dispatcher: Arc<dyn MessageDispatcher>,
        shutdown: CancellationToken,
    ) -> AdapterResult<()>;
}

/// Trait for adapters that can be created from configuration.
///
/// Separates compile-time concerns (`Config` type, `from_config()`) from the
/// object-safe [`Adapter`] trait.
pub trait ConfigurableAdapter: Adapter {
    /// The configuration type, deserialized from the `adapters.<name>` section.
    type Config: serde::de::DeserializeOwned + Default;

    /// Returns the adapter name used as the config key.
    fn config_key() -> &'static str
    where
        Self: Sized;

    /// Creates an adapter instance from its configuration.
    fn from_config(config: Self::Config) -> AdapterResult<Arc<Self>>
    where
        Self: Sized;
}

/// A shared [`Adapter`] trait object.
pub type BoxedAdapter = Arc<dyn Adapter>;
