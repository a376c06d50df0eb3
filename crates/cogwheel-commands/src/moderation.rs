//! `kick` and `ban`: remove mentioned members from the guild.
//!
//! Both require the invoking member to hold the matching permission and only
//! run in guild text channels. Words that are not mentions become the audit
//! log reason:
//!
//! ```text
//! !kick @spammer @troll flooding #general
//!        └──── targets ───┘ └─── reason ───┘
//! ```

use async_trait::async_trait;
use tracing::{info, warn};

use cogwheel_core::{ChannelKind, Permission, PlatformError};
use cogwheel_framework::{
    CommandContext, CommandDescription, CommandHandler, HandlerError, HandlerResult,
};

/// What a [`Moderate`] handler does to its targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModAction {
    /// Remove from the guild; the member may rejoin.
    Kick,
    /// Remove from the guild and prevent rejoining.
    Ban,
}

impl ModAction {
    /// Permission the invoker needs.
    pub fn permission(self) -> Permission {
        match self {
            Self::Kick => Permission::KickMembers,
            Self::Ban => Permission::BanMembers,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Self::Kick => "kick",
            Self::Ban => "ban",
        }
    }

    fn past(self) -> &'static str {
        match self {
            Self::Kick => "Kicked",
            Self::Ban => "Banned",
        }
    }
}

/// Returns `true` if `token` is a rendered user mention such as `<@123>`.
fn is_mention(token: &str) -> bool {
    token.starts_with("<@") && token.ends_with('>')
}

/// Kicks or bans every mentioned member.
#[derive(Debug)]
pub struct Moderate {
    action: ModAction,
}

impl Moderate {
    /// Creates a kick handler.
    pub fn kick() -> Self {
        Self {
            action: ModAction::Kick,
        }
    }

    /// Creates a ban handler.
    pub fn ban() -> Self {
        Self {
            action: ModAction::Ban,
        }
    }

    /// Returns the action.
    pub fn action(&self) -> ModAction {
        self.action
    }
}

#[async_trait]
impl CommandHandler for Moderate {
    fn describe(&self) -> CommandDescription {
        match self.action {
            ModAction::Kick => {
                CommandDescription::new("Kicks the mentioned members").usage("@user... [reason]")
            }
            ModAction::Ban => {
                CommandDescription::new("Bans the mentioned members").usage("@user... [reason]")
            }
        }
    }

    fn uses_channel(&self, kind: ChannelKind) -> bool {
        kind == ChannelKind::Text
    }

    async fn on_wrong_channel(&self, ctx: CommandContext) {
        ctx.reply("This command only works in server channels.").await;
    }

    async fn on_command_received(&self, ctx: CommandContext) -> HandlerResult {
        let verb = self.action.verb();
        let Some(guild_id) = ctx.channel().guild_id.clone() else {
            return Err(PlatformError::Unsupported(format!("{verb} outside a guild")).into());
        };

        let self_id = ctx.platform().self_id().map(str::to_string);
        let targets: Vec<_> = ctx
            .message()
            .mentions
            .iter()
            .filter(|user| Some(&user.id) != self_id.as_ref())
            .cloned()
            .collect();

        if targets.is_empty() {
            ctx.reply(&format!(
                "Usage: `{}{} @user... [reason]`",
                ctx.prefix(),
                ctx.invocation.tag
            ))
            .await;
            return Err(HandlerError::invalid_args("no members mentioned"));
        }

        let author = ctx.author();
        let allowed = ctx
            .platform()
            .has_permission(ctx.channel(), &author.id, self.action.permission())
            .await?;
        if !allowed {
            ctx.reply(&format!("You don't have permission to {verb} members."))
                .await;
            return Err(HandlerError::permission_denied(format!(
                "{} may not {verb}",
                author.id
            )));
        }

        let reason_words: Vec<&str> = ctx
            .args()
            .iter()
            .map(String::as_str)
            .filter(|word| !is_mention(word))
            .collect();
        let reason = (!reason_words.is_empty()).then(|| reason_words.join(" "));

        let mut done = Vec::new();
        for target in &targets {
            let result = match self.action {
                ModAction::Kick => {
                    ctx.platform()
                        .kick(&guild_id, &target.id, reason.as_deref())
                        .await
                }
                ModAction::Ban => {
                    ctx.platform()
                        .ban(&guild_id, &target.id, reason.as_deref())
                        .await
                }
            };

            match result {
                Ok(()) => {
                    info!(
                        guild = %guild_id,
                        target = %target.id,
                        moderator = %author.id,
                        action = verb,
                        "Moderation action applied"
                    );
                    done.push(target.name.as_str());
                }
                Err(e) => {
                    warn!(guild = %guild_id, target = %target.id, error = %e, "Moderation action failed");
                    ctx.reply(&format!("Couldn't {verb} {}: {e}", target.name))
                        .await;
                }
            }
        }

        if !done.is_empty() {
            ctx.reply(&format!("{} {}.", self.action.past(), done.join(", ")))
                .await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use cogwheel_core::{Author, ChannelRef, UserRef};
    use cogwheel_framework::DispatchOutcome;
    use cogwheel_framework::testing::Recorded;

    #[tokio::test]
    async fn test_kick_mentioned_user() {
        let harness = Harness::new();
        harness.platform.grant("u1", Permission::KickMembers);

        let message = harness
            .message("!kick <@42> spamming links")
            .with_mentions(vec![UserRef::new("42", "spammer")]);
        assert_eq!(harness.route(message).await, DispatchOutcome::Handled);

        assert_eq!(
            harness.platform.recorded(),
            vec![
                Recorded::Kicked {
                    guild: "g1".into(),
                    user: "42".into(),
                    reason: Some("spamming links".into()),
                },
                Recorded::Sent {
                    channel: "c1".into(),
                    content: "Kicked spammer.".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_ban_requires_permission() {
        let harness = Harness::new();
        harness.platform.grant("u1", Permission::KickMembers);

        let message = harness
            .message("!ban <@42>")
            .with_mentions(vec![UserRef::new("42", "spammer")]);
        assert_eq!(harness.route(message).await, DispatchOutcome::Failed);

        assert_eq!(
            harness.platform.sent(),
            vec!["You don't have permission to ban members.".to_string()]
        );
        assert!(
            !harness
                .platform
                .recorded()
                .iter()
                .any(|r| matches!(r, Recorded::Banned { .. }))
        );
    }

    #[tokio::test]
    async fn test_administrator_may_ban() {
        let harness = Harness::new();
        harness.platform.grant("u1", Permission::Administrator);

        let message = harness
            .message("!ban <@42> <@43>")
            .with_mentions(vec![UserRef::new("42", "a"), UserRef::new("43", "b")]);
        harness.route(message).await;

        assert_eq!(harness.platform.last_sent().as_deref(), Some("Banned a, b."));
    }

    #[tokio::test]
    async fn test_kick_needs_mentions() {
        let harness = Harness::new();
        harness.platform.grant("u1", Permission::KickMembers);

        assert_eq!(harness.send("!kick").await, DispatchOutcome::Failed);
        assert_eq!(
            harness.platform.sent(),
            vec!["Usage: `!kick @user... [reason]`".to_string()]
        );
    }

    #[tokio::test]
    async fn test_kick_never_targets_the_bot() {
        let harness = Harness::new();
        harness.platform.grant("u1", Permission::KickMembers);

        let message = harness
            .message("!kick <@bot>")
            .with_mentions(vec![UserRef::new("bot", "cogwheel")]);
        assert_eq!(harness.route(message).await, DispatchOutcome::Failed);
        assert!(
            !harness
                .platform
                .recorded()
                .iter()
                .any(|r| matches!(r, Recorded::Kicked { .. }))
        );
    }

    #[tokio::test]
    async fn test_kick_in_dm_sends_notice() {
        let harness = Harness::new();
        let message = cogwheel_core::InboundMessage::new(
            "m9",
            "!kick <@42>",
            Author::user("u1", "alice"),
            ChannelRef::private("dm1"),
        )
        .with_mentions(vec![UserRef::new("42", "spammer")]);

        assert_eq!(harness.route(message).await, DispatchOutcome::WrongChannel);
        assert_eq!(
            harness.platform.sent(),
            vec!["This command only works in server channels.".to_string()]
        );
    }
}
