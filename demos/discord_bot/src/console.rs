//! A stdin/stdout adapter for trying commands without a Discord account.
//!
//! Every line typed is one message from the `operator` user in guild channel
//! `#console`. `<@id>` tokens become mentions. The operator holds every
//! permission.

use std::sync::Arc;

use async_trait::async_trait;
use cogwheel::core::{
    Adapter, AdapterError, AdapterResult, Author, CancellationToken, ChannelRef, ChatPlatform,
    InboundMessage, MessageDispatcher, Permission, PlatformResult, UserRef,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// Prints replies and moderation actions to stdout.
pub struct ConsolePlatform;

#[async_trait]
impl ChatPlatform for ConsolePlatform {
    fn name(&self) -> &'static str {
        "console"
    }

    fn self_id(&self) -> Option<&str> {
        Some("cogwheel")
    }

    async fn send(&self, channel: &ChannelRef, content: &str) -> PlatformResult<()> {
        println!("[#{}] {content}", channel.id);
        Ok(())
    }

    async fn has_permission(
        &self,
        _channel: &ChannelRef,
        _user_id: &str,
        _permission: Permission,
    ) -> PlatformResult<bool> {
        Ok(true)
    }

    async fn kick(&self, guild_id: &str, user_id: &str, reason: Option<&str>) -> PlatformResult<()> {
        println!("* kicked {user_id} from {guild_id} ({})", reason.unwrap_or("no reason"));
        Ok(())
    }

    async fn ban(&self, guild_id: &str, user_id: &str, reason: Option<&str>) -> PlatformResult<()> {
        println!("* banned {user_id} from {guild_id} ({})", reason.unwrap_or("no reason"));
        Ok(())
    }
}

fn mentions_in(line: &str) -> Vec<UserRef> {
    line.split_whitespace()
        .filter_map(|word| word.strip_prefix("<@")?.strip_suffix('>'))
        .filter(|id| !id.is_empty())
        .map(|id| UserRef::new(id, id))
        .collect()
}

/// Reads messages from stdin until EOF or shutdown.
pub struct ConsoleAdapter;

#[async_trait]
impl Adapter for ConsoleAdapter {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn run(
        &self,
        dispatcher: Arc<dyn MessageDispatcher>,
        shutdown: CancellationToken,
    ) -> AdapterResult<()> {
        let platform = Arc::new(ConsolePlatform);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut counter = 0u64;

        loop {
            let line = tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                line = lines.next_line() => line.map_err(|e| AdapterError::internal(e.to_string()))?,
            };
            let Some(line) = line else {
                debug!("Console input closed");
                return Ok(());
            };

            counter += 1;
            let message = InboundMessage::new(
                counter.to_string(),
                line.clone(),
                Author::user("operator", "operator"),
                ChannelRef::text("console", "local"),
            )
            .with_mentions(mentions_in(&line));
            dispatcher.dispatch(message, platform.clone()).await;
        }
    }
}
