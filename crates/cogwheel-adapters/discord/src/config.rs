//! Configuration for the Discord adapter.
//!
//! Read from the `adapters.discord` section:
//!
//! ```toml
//! [adapters.discord]
//! # Usually left unset here and supplied through bot.token,
//! # COGWHEEL_ADAPTERS__DISCORD__TOKEN or the `token` setting.
//! token = "..."
//! intents = ["guilds", "guild_messages", "direct_messages", "message_content"]
//! ```

use std::fmt;

use cogwheel_core::{AdapterError, AdapterResult};
use serde::{Deserialize, Serialize};
use serenity::all::GatewayIntents;

/// Discord adapter configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token.
    pub token: Option<String>,

    /// Gateway intents, by snake_case name.
    pub intents: Vec<String>,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: None,
            intents: ["guilds", "guild_messages", "direct_messages", "message_content"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("intents", &self.intents)
            .finish()
    }
}

impl DiscordConfig {
    /// Creates a default config with `token` set.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }

    /// Returns the token, or a config error if it is missing or blank.
    pub fn require_token(&self) -> AdapterResult<&str> {
        match self.token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(AdapterError::Config("discord token is not set".into())),
        }
    }

    /// Combines the configured intent names.
    pub fn gateway_intents(&self) -> AdapterResult<GatewayIntents> {
        self.intents.iter().try_fold(GatewayIntents::empty(), |acc, name| {
            intent_by_name(name)
                .map(|intent| acc | intent)
                .ok_or_else(|| AdapterError::Config(format!("unknown gateway intent '{name}'")))
        })
    }
}

fn intent_by_name(name: &str) -> Option<GatewayIntents> {
    let intent = match name {
        "guilds" => GatewayIntents::GUILDS,
        "guild_members" => GatewayIntents::GUILD_MEMBERS,
        "guild_moderation" => GatewayIntents::GUILD_MODERATION,
        "guild_messages" => GatewayIntents::GUILD_MESSAGES,
        "guild_message_reactions" => GatewayIntents::GUILD_MESSAGE_REACTIONS,
        "direct_messages" => GatewayIntents::DIRECT_MESSAGES,
        "direct_message_reactions" => GatewayIntents::DIRECT_MESSAGE_REACTIONS,
        "message_content" => GatewayIntents::MESSAGE_CONTENT,
        "non_privileged" => GatewayIntents::non_privileged(),
        _ => return None,
    };
    Some(intent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_intents_read_messages() {
        let intents = DiscordConfig::default().gateway_intents().unwrap();
        assert!(intents.contains(GatewayIntents::GUILD_MESSAGES));
        assert!(intents.contains(GatewayIntents::MESSAGE_CONTENT));
        assert!(!intents.contains(GatewayIntents::GUILD_MEMBERS));
    }

    #[test]
    fn test_unknown_intent_is_rejected() {
        let config = DiscordConfig {
            intents: vec!["guilds".into(), "everything".into()],
            ..Default::default()
        };
        assert!(matches!(
            config.gateway_intents(),
            Err(AdapterError::Config(_))
        ));
    }

    #[test]
    fn test_require_token() {
        assert!(DiscordConfig::default().require_token().is_err());
        assert!(DiscordConfig::with_token("  ").require_token().is_err());
        assert_eq!(DiscordConfig::with_token("abc").require_token().unwrap(), "abc");
    }

    #[test]
    fn test_deserialize_partial_section() {
        let config: DiscordConfig =
            serde_json::from_value(serde_json::json!({ "token": "abc" })).unwrap();
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.intents, DiscordConfig::default().intents);
        assert!(!format!("{config:?}").contains("abc"));
    }
}
