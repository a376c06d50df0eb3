//! Inbound chat message model.
//!
//! Adapters translate platform events into [`InboundMessage`] before handing
//! them to the dispatcher. The core only ever reads these values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of channel a message was posted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// A text channel (or thread) inside a guild.
    Text,
    /// A direct-message channel with a single user.
    Private,
}

impl ChannelKind {
    /// Returns the channel kind as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The channel a message was posted in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRef {
    /// Platform channel id.
    pub id: String,
    /// Guild the channel belongs to, if any.
    pub guild_id: Option<String>,
    /// Channel kind.
    pub kind: ChannelKind,
}

impl ChannelRef {
    /// A guild text channel.
    pub fn text(id: impl Into<String>, guild_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            guild_id: Some(guild_id.into()),
            kind: ChannelKind::Text,
        }
    }

    /// A direct-message channel.
    pub fn private(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            guild_id: None,
            kind: ChannelKind::Private,
        }
    }
}

/// The author of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Platform user id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Whether the account is a bot account.
    pub bot: bool,
}

impl Author {
    /// A regular user.
    pub fn user(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bot: false,
        }
    }

    /// A bot account.
    pub fn bot(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bot: true,
        }
    }
}

/// A user referenced by a message (an `@mention`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRef {
    /// Platform user id.
    pub id: String,
    /// Display name at the time of the mention.
    pub name: String,
}

impl UserRef {
    /// Creates a new user reference.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A chat message as delivered by an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Platform message id.
    pub id: String,
    /// Raw message text.
    pub content: String,
    /// Who sent it.
    pub author: Author,
    /// Where it was sent.
    pub channel: ChannelRef,
    /// Users mentioned in the message, in order of appearance.
    #[serde(default)]
    pub mentions: Vec<UserRef>,
}

impl InboundMessage {
    /// Creates a message without mentions.
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        author: Author,
        channel: ChannelRef,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            author,
            channel,
            mentions: Vec::new(),
        }
    }

    /// Adds mentioned users.
    pub fn with_mentions(mut self, mentions: Vec<UserRef>) -> Self {
        self.mentions = mentions;
        self
    }

    /// Returns the channel kind.
    pub fn channel_kind(&self) -> ChannelKind {
        self.channel.kind
    }
}
