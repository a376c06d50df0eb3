//! Conversions between serenity models and Cogwheel types.

use std::num::NonZeroU64;

use cogwheel_core::{
    Author, ChannelRef, InboundMessage, Permission, PlatformError, PlatformResult, UserRef,
};
use serenity::all::{Message, Permissions, User};

/// Discord's per-message character limit.
pub const MESSAGE_LIMIT: usize = 2000;

/// Parses a snowflake id string into a serenity id type.
pub fn parse_id<T: From<NonZeroU64>>(kind: &'static str, raw: &str) -> PlatformResult<T> {
    raw.parse::<NonZeroU64>()
        .map(T::from)
        .map_err(|_| PlatformError::not_found(kind, raw))
}

fn author_of(user: &User) -> Author {
    let name = user.global_name.clone().unwrap_or_else(|| user.name.clone());
    if user.bot {
        Author::bot(user.id.to_string(), name)
    } else {
        Author::user(user.id.to_string(), name)
    }
}

fn user_ref(user: &User) -> UserRef {
    UserRef::new(
        user.id.to_string(),
        user.global_name.clone().unwrap_or_else(|| user.name.clone()),
    )
}

/// Converts a gateway message into an [`InboundMessage`].
///
/// Messages with a guild id arrive in text channels; the rest are DMs.
pub fn inbound_message(message: &Message) -> InboundMessage {
    let channel_id = message.channel_id.to_string();
    let channel = match message.guild_id {
        Some(guild_id) => ChannelRef::text(channel_id, guild_id.to_string()),
        None => ChannelRef::private(channel_id),
    };
    InboundMessage::new(
        message.id.to_string(),
        message.content.clone(),
        author_of(&message.author),
        channel,
    )
    .with_mentions(message.mentions.iter().map(user_ref).collect())
}

/// Maps a Cogwheel permission to Discord permission bits.
pub fn permission_bits(permission: Permission) -> Permissions {
    match permission {
        Permission::KickMembers => Permissions::KICK_MEMBERS,
        Permission::BanMembers => Permissions::BAN_MEMBERS,
        Permission::ManageMessages => Permissions::MANAGE_MESSAGES,
        Permission::Administrator => Permissions::ADMINISTRATOR,
    }
}

/// Returns `true` if `granted` satisfies `permission`. Administrators pass
/// every check.
pub fn permits(granted: Permissions, permission: Permission) -> bool {
    granted.contains(Permissions::ADMINISTRATOR) || granted.contains(permission_bits(permission))
}

/// Splits `content` into pieces of at most `limit` characters, preferring
/// line breaks.
pub fn chunk_message(content: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in content.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > limit {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use serenity::all::{ChannelId, GuildId, UserId};

    #[test]
    fn test_parse_id() {
        let id: ChannelId = parse_id("channel", "123456789012345678").unwrap();
        assert_eq!(id.get(), 123456789012345678);

        assert!(matches!(
            parse_id::<GuildId>("guild", "0"),
            Err(PlatformError::NotFound { kind: "guild", .. })
        ));
        assert!(parse_id::<UserId>("user", "<@42>").is_err());
    }

    #[test]
    fn test_permits() {
        let moderator = Permissions::KICK_MEMBERS | Permissions::SEND_MESSAGES;
        assert!(permits(moderator, Permission::KickMembers));
        assert!(!permits(moderator, Permission::BanMembers));
        assert!(permits(Permissions::ADMINISTRATOR, Permission::BanMembers));
    }

    #[test]
    fn test_chunk_short_message_untouched() {
        assert_eq!(chunk_message("hello", 10), vec!["hello".to_string()]);
        assert!(chunk_message("", 10).is_empty());
    }

    #[test]
    fn test_chunk_on_line_breaks() {
        let chunks = chunk_message("aaaa\nbbbb\ncccc", 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb\n".to_string(), "cccc".to_string()]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    }

    #[test]
    fn test_chunk_long_line() {
        let chunks = chunk_message(&"x".repeat(25), 10);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), "x".repeat(25));
    }
}
