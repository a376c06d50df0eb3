//! Command parsing.
//!
//! Turns raw message text into a [`CommandInvocation`]:
//!
//! ```text
//! "!roll 2d6  loud"  ──(prefix "!")──▶  tag: "roll", args: ["2d6", "loud"]
//! "hello"            ──────────────▶  NotACommand
//! "!"                ──────────────▶  tag: "", args: []
//! ```
//!
//! Splitting is plain whitespace splitting. Quotes carry no meaning and the
//! prefix is matched literally, without escaping.

use std::sync::Arc;

use cogwheel_core::InboundMessage;

/// The default command prefix.
pub const DEFAULT_PREFIX: &str = "!";

/// A parsed command: the tag plus its arguments.
///
/// Lives for the duration of one dispatch and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    /// The first token after the prefix. Case-sensitive.
    pub tag: String,
    /// The remaining tokens, in order.
    pub args: Vec<String>,
    /// The message this invocation was parsed from.
    pub message: Arc<InboundMessage>,
}

impl CommandInvocation {
    /// Returns `true` if the message held nothing but the prefix.
    pub fn is_empty(&self) -> bool {
        self.tag.is_empty()
    }

    /// Returns the argument at `index`, if present.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Re-joins the arguments with single spaces.
    pub fn rest(&self) -> String {
        self.args.join(" ")
    }
}

/// Result of parsing one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// The text does not start with the prefix.
    NotACommand,
    /// The text is a command.
    Command(CommandInvocation),
}

impl ParseOutcome {
    /// Returns the invocation, if any.
    pub fn into_invocation(self) -> Option<CommandInvocation> {
        match self {
            Self::NotACommand => None,
            Self::Command(invocation) => Some(invocation),
        }
    }
}

/// Splits `text` into `(tag, args)` after stripping `prefix`.
///
/// Returns `None` if `text` does not start with `prefix`. A prefix-only text
/// yields an empty tag and no arguments.
pub fn split_command<'a>(text: &'a str, prefix: &str) -> Option<(&'a str, Vec<&'a str>)> {
    let body = text.strip_prefix(prefix)?;
    let mut tokens = body.split_whitespace();
    let tag = tokens.next().unwrap_or("");
    Some((tag, tokens.collect()))
}

/// Parses messages against a configured prefix.
#[derive(Debug, Clone)]
pub struct CommandParser {
    prefix: Arc<str>,
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl CommandParser {
    /// Creates a parser for `prefix`.
    pub fn new(prefix: impl Into<Arc<str>>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns the configured prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns a shared handle to the prefix.
    pub fn shared_prefix(&self) -> Arc<str> {
        Arc::clone(&self.prefix)
    }

    /// Parses `message` into an invocation.
    pub fn parse(&self, message: Arc<InboundMessage>) -> ParseOutcome {
        let Some((tag, args)) = split_command(&message.content, &self.prefix) else {
            return ParseOutcome::NotACommand;
        };

        ParseOutcome::Command(CommandInvocation {
            tag: tag.to_string(),
            args: args.into_iter().map(str::to_string).collect(),
            message: Arc::clone(&message),
        })
    }

    /// Parses bare text, for callers that have no message at hand.
    pub fn parse_text(&self, text: &str) -> Option<(String, Vec<String>)> {
        split_command(text, &self.prefix).map(|(tag, args)| {
            (
                tag.to_string(),
                args.into_iter().map(str::to_string).collect(),
            )
        })
    }
}
