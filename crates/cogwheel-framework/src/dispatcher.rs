//! Message dispatcher for the Cogwheel framework.
//!
//! The [`Dispatcher`] is the single entry point invoked once per inbound chat
//! message. For each message it:
//!
//! 1. Drops messages from the bot's own account (and, by default, other bots)
//! 2. Parses the text against the current prefix
//! 3. Looks the tag up in the [`CommandRegistry`]
//! 4. Checks the handler accepts the channel kind
//! 5. Invokes the handler exactly once, bounded by the handler timeout
//!
//! Unknown tags are ignored silently: ordinary chat may start with the prefix
//! by accident. Nothing that happens inside a handler escapes `route`; errors,
//! panics and timeouts are logged and the next message is processed normally.
//!
//! ```rust,ignore
//! use cogwheel_framework::{CommandRegistry, Dispatcher};
//!
//! let registry = CommandRegistry::shared(factory);
//! let dispatcher = Dispatcher::builder(registry).prefix("!").build();
//!
//! let outcome = dispatcher.route(message, platform).await;
//! ```
//!
//! # Tower Service Integration
//!
//! `Dispatcher` implements `tower::Service<DispatchRequest>`, so middleware
//! such as concurrency limits can wrap it:
//!
//! ```rust,ignore
//! use tower::ServiceBuilder;
//!
//! let service = ServiceBuilder::new()
//!     .concurrency_limit(64)
//!     .service(dispatcher.clone());
//! ```

use std::convert::Infallible;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use tower::Service;
use tracing::{Instrument, Level, debug, error, span, trace, warn};

use cogwheel_core::{BoxedPlatform, InboundMessage, MessageDispatcher};

use crate::handler::CommandContext;
use crate::parser::{CommandParser, DEFAULT_PREFIX, ParseOutcome};
use crate::registry::{CommandRegistry, RegisteredHandler};

/// Default upper bound on a single handler invocation.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(30);

/// What happened to one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The bot's own message.
    IgnoredSelf,
    /// Another bot's message, dropped because `ignore_bots` is set.
    IgnoredBot,
    /// No prefix match.
    NotACommand,
    /// Prefix matched but the tag is empty or unbound.
    Unrouted,
    /// The handler refused the channel kind.
    WrongChannel,
    /// The handler ran and returned `Ok`.
    Handled,
    /// The handler returned an error.
    Failed,
    /// The handler panicked.
    Panicked,
    /// The handler exceeded the timeout and was dropped.
    TimedOut,
}

impl DispatchOutcome {
    /// Returns `true` if a handler was invoked.
    pub fn invoked_handler(&self) -> bool {
        matches!(
            self,
            Self::Handled | Self::Failed | Self::Panicked | Self::TimedOut
        )
    }
}

/// A message plus the platform it arrived through.
#[derive(Clone)]
pub struct DispatchRequest {
    /// The inbound message.
    pub message: InboundMessage,
    /// Where replies go.
    pub platform: BoxedPlatform,
}

impl fmt::Debug for DispatchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchRequest")
            .field("message", &self.message.id)
            .field("platform", &self.platform.name())
            .finish()
    }
}

struct DispatcherInner {
    registry: Arc<CommandRegistry>,
    parser: RwLock<CommandParser>,
    handler_timeout: Duration,
    ignore_bots: bool,
}

/// Routes inbound messages to registered handlers.
///
/// # Cheap Cloning
///
/// `Dispatcher` wraps its state in an `Arc`; clones share the registry and the
/// prefix.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl Dispatcher {
    /// Creates a dispatcher with default settings.
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self::builder(registry).build()
    }

    /// Creates a builder.
    pub fn builder(registry: Arc<CommandRegistry>) -> DispatcherBuilder {
        DispatcherBuilder::new(registry)
    }

    /// Returns the registry.
    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.inner.registry
    }

    /// Returns the current prefix.
    pub fn prefix(&self) -> Arc<str> {
        self.inner.parser.read().shared_prefix()
    }

    /// Replaces the prefix. Takes effect for the next message.
    pub fn set_prefix(&self, prefix: impl Into<Arc<str>>) {
        let parser = CommandParser::new(prefix);
        debug!(prefix = %parser.prefix(), "Command prefix changed");
        *self.inner.parser.write() = parser;
    }

    /// Returns the handler timeout.
    pub fn handler_timeout(&self) -> Duration {
        self.inner.handler_timeout
    }

    /// Routes one message.
    pub async fn route(&self, message: InboundMessage, platform: BoxedPlatform) -> DispatchOutcome {
        if platform.self_id() == Some(message.author.id.as_str()) {
            trace!(message_id = %message.id, "Ignoring own message");
            return DispatchOutcome::IgnoredSelf;
        }
        if self.inner.ignore_bots && message.author.bot {
            trace!(message_id = %message.id, author = %message.author.id, "Ignoring bot message");
            return DispatchOutcome::IgnoredBot;
        }

        let parser = self.inner.parser.read().clone();
        let invocation = match parser.parse(Arc::new(message)) {
            ParseOutcome::NotACommand => return DispatchOutcome::NotACommand,
            ParseOutcome::Command(invocation) => invocation,
        };

        if invocation.is_empty() {
            trace!(message_id = %invocation.message.id, "Prefix without tag");
            return DispatchOutcome::Unrouted;
        }

        let Some(RegisteredHandler {
            handler_id,
            handler,
        }) = self.inner.registry.lookup(&invocation.tag)
        else {
            trace!(tag = %invocation.tag, "No handler bound to tag");
            return DispatchOutcome::Unrouted;
        };

        let span = span!(
            Level::DEBUG,
            "dispatch",
            tag = %invocation.tag,
            handler = %handler_id,
            message_id = %invocation.message.id,
        );

        let tag = invocation.tag.clone();
        let message_id = invocation.message.id.clone();
        let channel_kind = invocation.message.channel_kind();
        let ctx = CommandContext::new(
            invocation,
            platform,
            Arc::clone(&self.inner.registry),
            parser.shared_prefix(),
        );

        if !handler.uses_channel(channel_kind) {
            debug!(tag = %tag, handler = %handler_id, channel_kind = %channel_kind, "Handler refused channel");
            let notice = AssertUnwindSafe(handler.on_wrong_channel(ctx)).catch_unwind();
            match tokio::time::timeout(self.inner.handler_timeout, notice)
                .instrument(span)
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(_)) => {
                    error!(tag = %tag, handler = %handler_id, message_id = %message_id, "Wrong-channel hook panicked");
                }
                Err(_) => {
                    warn!(tag = %tag, handler = %handler_id, message_id = %message_id, "Wrong-channel hook timed out");
                }
            }
            return DispatchOutcome::WrongChannel;
        }

        let call = AssertUnwindSafe(handler.on_command_received(ctx)).catch_unwind();
        let result = tokio::time::timeout(self.inner.handler_timeout, call)
            .instrument(span)
            .await;

        match result {
            Ok(Ok(Ok(()))) => {
                debug!(tag = %tag, handler = %handler_id, "Command handled");
                DispatchOutcome::Handled
            }
            Ok(Ok(Err(e))) if e.is_user_error() => {
                debug!(tag = %tag, handler = %handler_id, error = %e, "Command rejected");
                DispatchOutcome::Failed
            }
            Ok(Ok(Err(e))) => {
                warn!(
                    tag = %tag,
                    handler = %handler_id,
                    message_id = %message_id,
                    error = %e,
                    "Command handler failed"
                );
                DispatchOutcome::Failed
            }
            Ok(Err(panic)) => {
                error!(
                    tag = %tag,
                    handler = %handler_id,
                    message_id = %message_id,
                    panic = %panic_message(&*panic),
                    "Command handler panicked"
                );
                DispatchOutcome::Panicked
            }
            Err(_) => {
                warn!(
                    tag = %tag,
                    handler = %handler_id,
                    message_id = %message_id,
                    timeout_ms = self.inner.handler_timeout.as_millis() as u64,
                    "Command handler timed out"
                );
                DispatchOutcome::TimedOut
            }
        }
    }
}

/// Extracts a printable message from a panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("prefix", &self.prefix())
            .field("handler_timeout", &self.inner.handler_timeout)
            .field("ignore_bots", &self.inner.ignore_bots)
            .field("registry", &self.inner.registry)
            .finish()
    }
}

#[async_trait]
impl MessageDispatcher for Dispatcher {
    async fn dispatch(&self, message: InboundMessage, platform: BoxedPlatform) {
        self.route(message, platform).await;
    }
}

// ============================================================================
// Tower Service Implementation for Dispatcher
// ============================================================================

impl Service<DispatchRequest> for Dispatcher {
    type Response = DispatchOutcome;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: DispatchRequest) -> Self::Future {
        let dispatcher = self.clone();
        async move { Ok(dispatcher.route(req.message, req.platform).await) }.boxed()
    }
}

// =============================================================================
// DispatcherBuilder
// =============================================================================

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder {
    registry: Arc<CommandRegistry>,
    prefix: Arc<str>,
    handler_timeout: Duration,
    ignore_bots: bool,
}

impl DispatcherBuilder {
    /// Creates a builder with the default prefix and timeout.
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self {
            registry,
            prefix: Arc::from(DEFAULT_PREFIX),
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
            ignore_bots: true,
        }
    }

    /// Sets the command prefix.
    pub fn prefix(mut self, prefix: impl Into<Arc<str>>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the per-invocation timeout.
    pub fn handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = timeout;
        self
    }

    /// Whether messages from other bot accounts are dropped (default: `true`).
    pub fn ignore_bots(mut self, ignore: bool) -> Self {
        self.ignore_bots = ignore;
        self
    }

    /// Builds the dispatcher.
    pub fn build(self) -> Dispatcher {
        Dispatcher {
            inner: Arc::new(DispatcherInner {
                registry: self.registry,
                parser: RwLock::new(CommandParser::new(self.prefix)),
                handler_timeout: self.handler_timeout,
                ignore_bots: self.ignore_bots,
            }),
        }
    }
}
