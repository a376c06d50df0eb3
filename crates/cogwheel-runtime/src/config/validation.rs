//! Configuration validation utilities.

use std::collections::HashMap;

use cogwheel_framework::is_valid_tag;

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotSettings, CogwheelConfig, CommandsConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &CogwheelConfig) -> ConfigResult<()> {
    validate_bot_settings(&config.bot)?;
    if config.database.path.trim().is_empty() {
        return Err(ConfigError::missing_field("database.path"));
    }
    validate_commands(&config.commands)?;
    validate_logging(&config.logging)?;
    Ok(())
}

fn validate_bot_settings(bot: &BotSettings) -> ConfigResult<()> {
    if bot.prefix.is_empty() {
        return Err(ConfigError::missing_field("bot.prefix"));
    }
    if bot.prefix.contains(char::is_whitespace) {
        return Err(ConfigError::InvalidPrefix(bot.prefix.clone()));
    }
    if bot.handler_timeout_ms == 0 {
        return Err(ConfigError::validation(
            "Handler timeout must be greater than 0",
        ));
    }
    if let Some(token) = &bot.token
        && token.trim().is_empty()
    {
        return Err(ConfigError::validation("Bot token must not be blank"));
    }
    Ok(())
}

fn validate_commands(commands: &CommandsConfig) -> ConfigResult<()> {
    let mut claimed: HashMap<&str, &str> = HashMap::new();
    for (handler_id, o) in &commands.overrides {
        let Some(tag) = &o.tag else { continue };
        if !is_valid_tag(tag) {
            return Err(ConfigError::InvalidCommandTag {
                handler_id: handler_id.clone(),
                tag: tag.clone(),
            });
        }
        if let Some(first) = claimed.insert(tag, handler_id) {
            return Err(ConfigError::DuplicateCommandTag {
                tag: tag.clone(),
                first: first.to_string(),
                second: handler_id.clone(),
            });
        }
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommandOverride;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&CogwheelConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_bad_prefix() {
        let mut config = CogwheelConfig::default();
        config.bot.prefix = String::new();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));

        config.bot.prefix = "! ".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidPrefix(p)) if p == "! "
        ));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let mut config = CogwheelConfig::default();
        config.bot.handler_timeout_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_blank_token() {
        let mut config = CogwheelConfig::default();
        config.bot.token = Some("  ".into());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_invalid_override_tag() {
        let mut config = CogwheelConfig::default();
        config.commands.overrides.insert(
            "roll".into(),
            CommandOverride {
                tag: Some("two words".into()),
                enabled: None,
            },
        );
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidCommandTag { handler_id, .. }) if handler_id == "roll"
        ));
    }

    #[test]
    fn test_rejects_duplicate_override_tags() {
        let mut config = CogwheelConfig::default();
        for handler_id in ["8ball", "roll"] {
            config.commands.overrides.insert(
                handler_id.into(),
                CommandOverride {
                    tag: Some("r".into()),
                    enabled: None,
                },
            );
        }
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::DuplicateCommandTag { first, second, .. })
                if first == "8ball" && second == "roll"
        ));
    }

    #[test]
    fn test_file_output_needs_path() {
        let mut config = CogwheelConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());
        config.logging.file_path = Some("cogwheel.log".into());
        assert!(validate_config(&config).is_ok());
    }
}
