//! [`ChatPlatform`] over serenity's HTTP client and cache.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use cogwheel_core::{ChannelRef, ChatPlatform, Permission, PlatformError, PlatformResult};
use serenity::all::{Cache, ChannelId, GuildId, Http, HttpError, Member, UserId};
use tracing::{debug, trace};

use crate::convert::{MESSAGE_LIMIT, chunk_message, parse_id, permits};

/// Ban without deleting any of the user's messages.
const BAN_DELETE_MESSAGE_DAYS: u8 = 0;

/// Talks to Discord on behalf of handlers.
pub struct DiscordPlatform {
    http: Arc<Http>,
    cache: Arc<Cache>,
    self_id: OnceLock<String>,
}

impl DiscordPlatform {
    /// Creates a platform over a connected client's HTTP handle and cache.
    pub fn new(http: Arc<Http>, cache: Arc<Cache>) -> Self {
        Self {
            http,
            cache,
            self_id: OnceLock::new(),
        }
    }

    /// Records the bot's own user id. Later calls are ignored.
    pub fn set_self_id(&self, id: UserId) {
        let _ = self.self_id.set(id.to_string());
    }

    async fn member(&self, guild_id: GuildId, user_id: UserId) -> PlatformResult<Member> {
        let cached = self
            .cache
            .guild(guild_id)
            .and_then(|guild| guild.members.get(&user_id).cloned());
        if let Some(member) = cached {
            return Ok(member);
        }
        trace!(guild = %guild_id, user = %user_id, "Member not cached, fetching");
        guild_id
            .member(&*self.http, user_id)
            .await
            .map_err(|e| platform_error(e, "member", user_id.to_string()))
    }
}

/// Maps serenity errors onto [`PlatformError`], keeping 403 and 404 apart.
fn platform_error(e: serenity::Error, kind: &'static str, id: String) -> PlatformError {
    if let serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) = &e {
        match response.status_code.as_u16() {
            403 => return PlatformError::Forbidden(response.error.message.clone()),
            404 => return PlatformError::not_found(kind, id),
            _ => {}
        }
    }
    PlatformError::Http(e.to_string())
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    fn name(&self) -> &'static str {
        "discord"
    }

    fn self_id(&self) -> Option<&str> {
        self.self_id.get().map(String::as_str)
    }

    async fn send(&self, channel: &ChannelRef, content: &str) -> PlatformResult<()> {
        let channel_id: ChannelId = parse_id("channel", &channel.id)?;
        for chunk in chunk_message(content, MESSAGE_LIMIT) {
            channel_id
                .say(&*self.http, chunk)
                .await
                .map_err(|e| PlatformError::send_failed(&channel.id, e.to_string()))?;
        }
        Ok(())
    }

    async fn has_permission(
        &self,
        channel: &ChannelRef,
        user_id: &str,
        permission: Permission,
    ) -> PlatformResult<bool> {
        let Some(raw_guild) = channel.guild_id.as_deref() else {
            return Ok(false);
        };
        let guild_id: GuildId = parse_id("guild", raw_guild)?;
        let channel_id: ChannelId = parse_id("channel", &channel.id)?;
        let user: UserId = parse_id("user", user_id)?;

        let member = self.member(guild_id, user).await?;

        let guild = self
            .cache
            .guild(guild_id)
            .ok_or_else(|| PlatformError::not_found("guild", raw_guild))?;
        let guild_channel = guild
            .channels
            .get(&channel_id)
            .ok_or_else(|| PlatformError::not_found("channel", &channel.id))?;
        let granted = guild.user_permissions_in(guild_channel, &member);

        debug!(guild = %guild_id, user = %user, ?permission, ?granted, "Permission check");
        Ok(permits(granted, permission))
    }

    async fn kick(&self, guild_id: &str, user_id: &str, reason: Option<&str>) -> PlatformResult<()> {
        let guild: GuildId = parse_id("guild", guild_id)?;
        let user: UserId = parse_id("user", user_id)?;
        let result = match reason {
            Some(reason) => guild.kick_with_reason(&self.http, user, reason).await,
            None => guild.kick(&self.http, user).await,
        };
        result.map_err(|e| platform_error(e, "user", user_id.to_string()))
    }

    async fn ban(&self, guild_id: &str, user_id: &str, reason: Option<&str>) -> PlatformResult<()> {
        let guild: GuildId = parse_id("guild", guild_id)?;
        let user: UserId = parse_id("user", user_id)?;
        let result = match reason {
            Some(reason) => {
                guild
                    .ban_with_reason(&self.http, user, BAN_DELETE_MESSAGE_DAYS, reason)
                    .await
            }
            None => guild.ban(&self.http, user, BAN_DELETE_MESSAGE_DAYS).await,
        };
        result.map_err(|e| platform_error(e, "user", user_id.to_string()))
    }
}
