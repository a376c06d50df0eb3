//! Command handler capability interface.
//!
//! Every command is an independent type implementing [`CommandHandler`]. There
//! is no base class and no inheritance chain: the dispatcher only ever calls
//! the trait methods below through an `Arc<dyn CommandHandler>`.
//!
//! # Example
//!
//! ```rust,ignore
//! use cogwheel_framework::{CommandContext, CommandDescription, CommandHandler, HandlerResult};
//!
//! struct Echo;
//!
//! #[async_trait::async_trait]
//! impl CommandHandler for Echo {
//!     fn describe(&self) -> CommandDescription {
//!         CommandDescription::new("Repeats what you say").usage("<text>")
//!     }
//!
//!     async fn on_command_received(&self, ctx: CommandContext) -> HandlerResult {
//!         ctx.reply(&ctx.invocation.rest()).await;
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use cogwheel_core::{
    Author, BoxedPlatform, ChannelKind, ChannelRef, InboundMessage, PlatformResult,
};

use crate::error::HandlerResult;
use crate::parser::CommandInvocation;
use crate::registry::CommandRegistry;

/// Static metadata about a command, used for listings and help output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDescription {
    /// One-line summary.
    pub summary: &'static str,
    /// Argument syntax, without the prefix and tag (e.g. `"[sides]"`).
    pub usage: &'static str,
}

impl CommandDescription {
    /// Creates a description with no argument syntax.
    pub const fn new(summary: &'static str) -> Self {
        Self { summary, usage: "" }
    }

    /// Sets the argument syntax.
    pub const fn usage(mut self, usage: &'static str) -> Self {
        self.usage = usage;
        self
    }
}

/// Everything a handler gets for one invocation.
#[derive(Clone)]
pub struct CommandContext {
    /// The parsed command.
    pub invocation: CommandInvocation,
    platform: BoxedPlatform,
    registry: Arc<CommandRegistry>,
    prefix: Arc<str>,
}

impl CommandContext {
    /// Creates a new context.
    pub fn new(
        invocation: CommandInvocation,
        platform: BoxedPlatform,
        registry: Arc<CommandRegistry>,
        prefix: Arc<str>,
    ) -> Self {
        Self {
            invocation,
            platform,
            registry,
            prefix,
        }
    }

    /// Returns the originating message.
    pub fn message(&self) -> &InboundMessage {
        &self.invocation.message
    }

    /// Returns the message author.
    pub fn author(&self) -> &Author {
        &self.invocation.message.author
    }

    /// Returns the channel the command was sent in.
    pub fn channel(&self) -> &ChannelRef {
        &self.invocation.message.channel
    }

    /// Returns the invocation arguments.
    pub fn args(&self) -> &[String] {
        &self.invocation.args
    }

    /// Returns the platform handle.
    pub fn platform(&self) -> &BoxedPlatform {
        &self.platform
    }

    /// Returns the registry, for commands that list other commands.
    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Returns the active command prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Sends `content` to the invocation's channel, reporting failures.
    pub async fn try_reply(&self, content: &str) -> PlatformResult<()> {
        self.platform.send(self.channel(), content).await
    }

    /// Sends `content` to the invocation's channel.
    ///
    /// Fire-and-forget: a failed send is logged and not retried.
    pub async fn reply(&self, content: &str) {
        if let Err(e) = self.try_reply(content).await {
            warn!(
                tag = %self.invocation.tag,
                channel = %self.channel().id,
                error = %e,
                "Failed to send reply"
            );
        }
    }
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("invocation", &self.invocation)
            .field("platform", &self.platform.name())
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// The capability interface every command implements.
#[async_trait]
pub trait CommandHandler: Send + Sync + 'static {
    /// Static metadata for listings.
    fn describe(&self) -> CommandDescription;

    /// Whether the command may run in a channel of `kind`.
    ///
    /// Consulted before every invocation. Defaults to all channels.
    fn uses_channel(&self, kind: ChannelKind) -> bool {
        let _ = kind;
        true
    }

    /// Called instead of [`on_command_received`](Self::on_command_received)
    /// when [`uses_channel`](Self::uses_channel) refused the channel.
    ///
    /// Does nothing by default; handlers that want a "wrong channel" notice
    /// send it here.
    async fn on_wrong_channel(&self, ctx: CommandContext) {
        let _ = ctx;
    }

    /// Processes one invocation.
    ///
    /// Long-running work should be spawned; the dispatcher bounds every call
    /// with its handler timeout.
    async fn on_command_received(&self, ctx: CommandContext) -> HandlerResult;
}

/// A shared [`CommandHandler`] trait object.
pub type BoxedCommandHandler = Arc<dyn CommandHandler>;
