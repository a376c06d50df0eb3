//! `ping`: liveness check.

use async_trait::async_trait;

use cogwheel_framework::{CommandContext, CommandDescription, CommandHandler, HandlerResult};

/// Replies "Pong!".
#[derive(Debug, Default)]
pub struct Ping;

#[async_trait]
impl CommandHandler for Ping {
    fn describe(&self) -> CommandDescription {
        CommandDescription::new("Checks that the bot is alive")
    }

    async fn on_command_received(&self, ctx: CommandContext) -> HandlerResult {
        ctx.try_reply("Pong!").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::Harness;

    #[tokio::test]
    async fn test_ping_replies() {
        let harness = Harness::new();
        harness.send("!ping").await;
        assert_eq!(harness.platform.sent(), vec!["Pong!".to_string()]);
    }
}
