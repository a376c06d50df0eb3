//! # Cogwheel Framework
//!
//! Command routing for chat bots: the tag → handler registry, the per-message
//! parse/dispatch protocol and reconciliation against persisted settings.
//!
//! ```text
//! InboundMessage ─▶ CommandParser ─▶ Dispatcher ─▶ CommandRegistry ─▶ CommandHandler
//!                                                        ▲
//!                 SettingsStore ─▶ SettingsReconciler ───┘
//! ```
//!
//! This layer provides:
//! - [`CommandParser`]: prefix matching and whitespace tokenizing
//! - [`CommandRegistry`]: the serialized tag map with conflict detection
//! - [`Dispatcher`]: routes one message to zero or one handler, isolating
//!   handler failures, panics and timeouts
//! - [`HandlerFactory`]: builds handlers from persisted handler ids
//! - [`SettingsReconciler`]: seeds, replays and edits [`CommandSetting`]s
//!
//! [`CommandSetting`]: cogwheel_core::CommandSetting

pub mod dispatcher;
pub mod error;
pub mod factory;
pub mod handler;
pub mod parser;
pub mod reconcile;
pub mod registry;
pub mod testing;

pub use dispatcher::{
    DEFAULT_HANDLER_TIMEOUT, DispatchOutcome, DispatchRequest, Dispatcher, DispatcherBuilder,
};
pub use error::{
    HandlerConstructionError, HandlerError, HandlerResult, ReconcileError, SettingsError,
};
pub use factory::{Collaborators, HandlerConstructor, HandlerFactory, HandlerKind};
pub use handler::{BoxedCommandHandler, CommandContext, CommandDescription, CommandHandler};
pub use parser::{CommandInvocation, CommandParser, DEFAULT_PREFIX, ParseOutcome, split_command};
pub use reconcile::{
    BootstrapReport, PREFIX_KEY, SeedOverride, SettingsReconciler, TOKEN_KEY,
};
pub use registry::{CommandInfo, CommandRegistry, ReconcileOutcome, RegisteredHandler, is_valid_tag};
