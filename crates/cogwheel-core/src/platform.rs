//! Chat platform trait.
//!
//! A [`ChatPlatform`] is the outbound half of a connected bot: it knows who the
//! bot is, can post messages, answer permission queries and perform the few
//! moderation actions the built-in commands need.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PlatformResult;
use crate::message::ChannelRef;

/// Member permissions the core can query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Remove a member from a guild.
    KickMembers,
    /// Ban a member from a guild.
    BanMembers,
    /// Manage messages (pin, delete others' messages).
    ManageMessages,
    /// Full administrative rights.
    Administrator,
}

impl Permission {
    /// Returns the permission as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KickMembers => "kick_members",
            Self::BanMembers => "ban_members",
            Self::ManageMessages => "manage_messages",
            Self::Administrator => "administrator",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outbound chat-platform contract.
///
/// # API Design
///
/// - `send` is fire-and-forget from the core's point of view: a failure is
///   reported to the caller once and never retried.
/// - Moderation calls take the guild explicitly; implementations return
///   [`PlatformError::Unsupported`](crate::PlatformError::Unsupported) when no
///   guild applies.
#[async_trait]
pub trait ChatPlatform: Send + Sync + 'static {
    /// Returns the platform name (e.g. `"discord"`).
    fn name(&self) -> &'static str;

    /// Returns the bot's own user id, once known.
    ///
    /// `None` before the platform has identified the bot; in that window the
    /// dispatcher cannot filter self-messages by id and relies on the author's
    /// bot flag instead.
    fn self_id(&self) -> Option<&str>;

    /// Posts `content` to `channel`.
    async fn send(&self, channel: &ChannelRef, content: &str) -> PlatformResult<()>;

    /// Checks whether `user_id` holds `permission` in `channel`.
    async fn has_permission(
        &self,
        channel: &ChannelRef,
        user_id: &str,
        permission: Permission,
    ) -> PlatformResult<bool>;

    /// Removes `user_id` from `guild_id`.
    async fn kick(&self, guild_id: &str, user_id: &str, reason: Option<&str>)
    -> PlatformResult<()>;

    /// Bans `user_id` from `guild_id`.
    async fn ban(&self, guild_id: &str, user_id: &str, reason: Option<&str>) -> PlatformResult<()>;
}

/// A shared [`ChatPlatform`] trait object.
pub type BoxedPlatform = Arc<dyn ChatPlatform>;
