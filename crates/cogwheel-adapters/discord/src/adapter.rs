//! The Discord adapter.
//!
//! serenity owns the gateway connection, heartbeats and reconnects. The
//! adapter turns each `MESSAGE_CREATE` into an [`InboundMessage`] and hands it
//! to the dispatcher along with a shared [`DiscordPlatform`].
//!
//! ```text
//! serenity shard ──▶ DiscordHandler::message ──▶ MessageDispatcher
//!                          │
//!                          └── DiscordPlatform (Http + Cache) ◀── handlers
//! ```
//!
//! [`InboundMessage`]: cogwheel_core::InboundMessage

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use cogwheel_core::{
    Adapter, AdapterError, AdapterResult, BoxedPlatform, CancellationToken, ConfigurableAdapter,
    MessageDispatcher,
};
use serenity::all::{Client, Context, EventHandler, Message, Ready, ResumedEvent};
use tracing::{debug, info, trace, warn};

use crate::config::DiscordConfig;
use crate::convert::inbound_message;
use crate::platform::DiscordPlatform;

/// Forwards gateway events to the dispatcher.
struct DiscordHandler {
    dispatcher: Arc<dyn MessageDispatcher>,
    platform: OnceLock<Arc<DiscordPlatform>>,
}

impl DiscordHandler {
    fn new(dispatcher: Arc<dyn MessageDispatcher>) -> Self {
        Self {
            dispatcher,
            platform: OnceLock::new(),
        }
    }

    fn platform(&self, ctx: &Context) -> &Arc<DiscordPlatform> {
        self.platform.get_or_init(|| {
            Arc::new(DiscordPlatform::new(
                Arc::clone(&ctx.http),
                Arc::clone(&ctx.cache),
            ))
        })
    }
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        self.platform(&ctx).set_self_id(ready.user.id);
        info!(
            user = %ready.user.name,
            id = %ready.user.id,
            guilds = ready.guilds.len(),
            "Connected to Discord"
        );
    }

    async fn resume(&self, _ctx: Context, _event: ResumedEvent) {
        debug!("Discord session resumed");
    }

    async fn message(&self, ctx: Context, message: Message) {
        trace!(id = %message.id, channel = %message.channel_id, "Discord message received");
        let platform: BoxedPlatform = self.platform(&ctx).clone();
        self.dispatcher
            .dispatch(inbound_message(&message), platform)
            .await;
    }
}

/// Connects a bot account to Discord.
#[derive(Debug, Default)]
pub struct DiscordAdapter {
    config: DiscordConfig,
}

impl DiscordAdapter {
    /// Creates an adapter, checking the token and intents up front.
    pub fn new(config: DiscordConfig) -> AdapterResult<Self> {
        config.require_token()?;
        config.gateway_intents()?;
        Ok(Self { config })
    }

    /// Returns the adapter configuration.
    pub fn config(&self) -> &DiscordConfig {
        &self.config
    }
}

#[async_trait]
impl Adapter for DiscordAdapter {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn run(
        &self,
        dispatcher: Arc<dyn MessageDispatcher>,
        shutdown: CancellationToken,
    ) -> AdapterResult<()> {
        let token = self.config.require_token()?;
        let intents = self.config.gateway_intents()?;

        let mut client = Client::builder(token, intents)
            .event_handler(DiscordHandler::new(dispatcher))
            .await
            .map_err(|e| AdapterError::Connection(format!("failed to create client: {e}")))?;

        let shard_manager = Arc::clone(&client.shard_manager);
        let watcher = tokio::spawn(async move {
            shutdown.cancelled().await;
            info!("Shutting down Discord shards");
            shard_manager.shutdown_all().await;
        });

        let result = client.start_autosharded().await;
        watcher.abort();

        result.map_err(|e| {
            warn!(error = %e, "Discord client stopped");
            AdapterError::Connection(e.to_string())
        })
    }
}

impl ConfigurableAdapter for DiscordAdapter {
    type Config = DiscordConfig;

    fn config_key() -> &'static str {
        "discord"
    }

    fn from_config(config: Self::Config) -> AdapterResult<Arc<Self>> {
        Self::new(config).map(Arc::new)
    }
}
