//! `help`: lists the live commands.

use async_trait::async_trait;

use cogwheel_framework::{
    CommandContext, CommandDescription, CommandHandler, CommandInfo, HandlerResult,
};

/// Lists registered commands, or describes one.
#[derive(Debug, Default)]
pub struct Help;

fn usage_line(prefix: &str, info: &CommandInfo) -> String {
    if info.description.usage.is_empty() {
        format!("`{prefix}{}`", info.tag)
    } else {
        format!("`{prefix}{} {}`", info.tag, info.description.usage)
    }
}

#[async_trait]
impl CommandHandler for Help {
    fn describe(&self) -> CommandDescription {
        CommandDescription::new("Lists available commands").usage("[command]")
    }

    async fn on_command_received(&self, ctx: CommandContext) -> HandlerResult {
        let commands = ctx.registry().snapshot();
        let prefix = ctx.prefix();

        let reply = match ctx.invocation.arg(0) {
            Some(wanted) => {
                let wanted = wanted.strip_prefix(prefix).unwrap_or(wanted);
                match commands.iter().find(|info| info.tag == wanted) {
                    Some(info) => {
                        format!("{}: {}", usage_line(prefix, info), info.description.summary)
                    }
                    None => format!("No command named `{wanted}`."),
                }
            }
            None if commands.is_empty() => "No commands are enabled.".to_string(),
            None => {
                let mut lines = vec!["**Available commands**".to_string()];
                lines.extend(commands.iter().map(|info| {
                    format!("{} - {}", usage_line(prefix, info), info.description.summary)
                }));
                lines.join("\n")
            }
        };

        ctx.try_reply(&reply).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::Harness;

    #[tokio::test]
    async fn test_help_lists_commands_sorted() {
        let harness = Harness::with_tags(&[("help", "help"), ("roll", "roll"), ("ping", "ping")]);
        harness.send("!help").await;

        let reply = harness.platform.last_sent().unwrap();
        let lines: Vec<_> = reply.lines().collect();
        assert_eq!(lines[0], "**Available commands**");
        assert_eq!(lines[1], "`!help [command]` - Lists available commands");
        assert_eq!(lines[2], "`!ping` - Checks that the bot is alive");
        assert_eq!(lines[3], "`!roll [sides | NdM]` - Rolls dice");
    }

    #[tokio::test]
    async fn test_help_for_one_command() {
        let harness = Harness::with_tags(&[("help", "help"), ("roll", "dice")]);

        harness.send("!help dice").await;
        assert_eq!(
            harness.platform.last_sent().as_deref(),
            Some("`!dice [sides | NdM]`: Rolls dice")
        );

        harness.send("!help !dice").await;
        assert_eq!(
            harness.platform.last_sent().as_deref(),
            Some("`!dice [sides | NdM]`: Rolls dice")
        );

        harness.send("!help nope").await;
        assert_eq!(
            harness.platform.last_sent().as_deref(),
            Some("No command named `nope`.")
        );
    }

    #[tokio::test]
    async fn test_help_reflects_disable() {
        let harness = Harness::with_tags(&[("help", "help"), ("ping", "ping")]);
        harness.registry().disable("ping");

        harness.send("!help").await;
        assert!(!harness.platform.last_sent().unwrap().contains("ping"));
    }
}
