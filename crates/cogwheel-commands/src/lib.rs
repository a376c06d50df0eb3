//! # Cogwheel Commands
//!
//! The built-in command handlers and the [`HandlerFactory`] table that knows
//! how to build them from persisted handler ids.
//!
//! | handler id | default tag | handler        |
//! |------------|-------------|----------------|
//! | `8ball`    | `8ball`     | [`EightBall`]  |
//! | `ban`      | `ban`       | [`Moderate`]   |
//! | `help`     | `help`      | [`Help`]       |
//! | `kick`     | `kick`      | [`Moderate`]   |
//! | `ping`     | `ping`      | [`Ping`]       |
//! | `poll`     | `poll`      | [`StrawPoll`]  |
//! | `roll`     | `roll`      | [`Roll`]       |
//!
//! `ban` is seeded disabled; everything else starts enabled.
//!
//! ```rust,ignore
//! let registry = CommandRegistry::shared(cogwheel_commands::builtin_factory());
//! ```

use std::sync::Arc;

use cogwheel_framework::{BoxedCommandHandler, HandlerFactory, HandlerKind};

pub mod eight_ball;
pub mod help;
pub mod moderation;
pub mod ping;
pub mod poll;
pub mod roll;

pub use eight_ball::EightBall;
pub use help::Help;
pub use moderation::{ModAction, Moderate};
pub use ping::Ping;
pub use poll::{Poll, PollBook, StrawPoll};
pub use roll::{Dice, Roll};

/// Returns the kind table for every built-in handler.
pub fn builtin_kinds() -> Vec<HandlerKind> {
    vec![
        HandlerKind::new("8ball", "8ball", |_| {
            Ok(Arc::new(EightBall) as BoxedCommandHandler)
        }),
        HandlerKind::new("ban", "ban", |_| {
            Ok(Arc::new(Moderate::ban()) as BoxedCommandHandler)
        })
        .enabled_by_default(false),
        HandlerKind::new("help", "help", |_| Ok(Arc::new(Help) as BoxedCommandHandler)),
        HandlerKind::new("kick", "kick", |_| {
            Ok(Arc::new(Moderate::kick()) as BoxedCommandHandler)
        }),
        HandlerKind::new("ping", "ping", |_| Ok(Arc::new(Ping) as BoxedCommandHandler)),
        HandlerKind::new("poll", "poll", |c| {
            let book = c.require::<PollBook>("poll")?;
            Ok(Arc::new(StrawPoll::new(book)) as BoxedCommandHandler)
        }),
        HandlerKind::new("roll", "roll", |_| {
            Ok(Arc::new(Roll::default()) as BoxedCommandHandler)
        }),
    ]
}

/// Returns a factory holding every built-in kind and the shared [`PollBook`].
pub fn builtin_factory() -> HandlerFactory {
    builtin_kinds()
        .into_iter()
        .fold(HandlerFactory::new(), HandlerFactory::with_kind)
        .with_collaborator(Arc::new(PollBook::new()))
}
