//! `poll`: straw polls, one per channel.
//!
//! ```text
//! !poll new Pizza tonight? | yes | no | maybe
//! !poll vote 2
//! !poll show
//! !poll close
//! ```
//!
//! Open polls live in a [`PollBook`] shared through the handler factory's
//! collaborators, so re-enabling the command keeps running polls.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use cogwheel_core::Permission;
use cogwheel_framework::{
    CommandContext, CommandDescription, CommandHandler, HandlerError, HandlerResult,
};

/// Fewest options a poll may have.
pub const MIN_OPTIONS: usize = 2;

/// Most options a poll may have.
pub const MAX_OPTIONS: usize = 10;

/// One open poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poll {
    /// Who opened the poll.
    pub author_id: String,
    /// The question.
    pub question: String,
    /// Answer options, in display order.
    pub options: Vec<String>,
    votes: HashMap<String, usize>,
}

impl Poll {
    /// Creates a poll with no votes.
    pub fn new(author_id: impl Into<String>, question: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            author_id: author_id.into(),
            question: question.into(),
            options,
            votes: HashMap::new(),
        }
    }

    /// Records `voter`'s choice of the zero-based `option`, replacing any
    /// earlier vote. Returns the previous choice.
    pub fn vote(&mut self, voter: impl Into<String>, option: usize) -> Option<usize> {
        self.votes.insert(voter.into(), option)
    }

    /// Returns the vote count per option.
    pub fn tally(&self) -> Vec<usize> {
        let mut counts = vec![0; self.options.len()];
        for &choice in self.votes.values() {
            if let Some(count) = counts.get_mut(choice) {
                *count += 1;
            }
        }
        counts
    }

    /// Returns the number of voters.
    pub fn voters(&self) -> usize {
        self.votes.len()
    }

    /// Renders the poll with its current tally.
    pub fn render(&self) -> String {
        let mut lines = vec![format!("📊 **{}**", self.question)];
        for (i, (option, count)) in self.options.iter().zip(self.tally()).enumerate() {
            let noun = if count == 1 { "vote" } else { "votes" };
            lines.push(format!("{}. {option} ({count} {noun})", i + 1));
        }
        lines.join("\n")
    }
}

/// Open polls, keyed by channel id.
#[derive(Debug, Default)]
pub struct PollBook {
    polls: Mutex<HashMap<String, Poll>>,
}

impl PollBook {
    /// Creates an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `poll` in `channel_id` unless one is already open there.
    pub fn open(&self, channel_id: &str, poll: Poll) -> Result<(), Poll> {
        let mut polls = self.polls.lock();
        if let Some(existing) = polls.get(channel_id) {
            return Err(existing.clone());
        }
        polls.insert(channel_id.to_string(), poll);
        Ok(())
    }

    /// Runs `f` on the poll open in `channel_id`.
    pub fn with_poll<R>(&self, channel_id: &str, f: impl FnOnce(&mut Poll) -> R) -> Option<R> {
        self.polls.lock().get_mut(channel_id).map(f)
    }

    /// Removes and returns the poll open in `channel_id`.
    pub fn close(&self, channel_id: &str) -> Option<Poll> {
        self.polls.lock().remove(channel_id)
    }

    /// Returns the number of open polls.
    pub fn len(&self) -> usize {
        self.polls.lock().len()
    }

    /// Returns `true` if no poll is open.
    pub fn is_empty(&self) -> bool {
        self.polls.lock().is_empty()
    }
}

/// Parses `"question | a | b"` into the question and its options.
fn parse_poll(text: &str) -> Result<(String, Vec<String>), String> {
    let mut parts = text.split('|').map(str::trim);
    let question = parts.next().unwrap_or_default();
    if question.is_empty() {
        return Err("the poll needs a question".to_string());
    }
    let options: Vec<String> = parts
        .filter(|option| !option.is_empty())
        .map(str::to_string)
        .collect();
    if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&options.len()) {
        return Err(format!(
            "a poll needs between {MIN_OPTIONS} and {MAX_OPTIONS} options"
        ));
    }
    Ok((question.to_string(), options))
}

/// Runs straw polls.
#[derive(Debug)]
pub struct StrawPoll {
    book: Arc<PollBook>,
}

impl StrawPoll {
    /// Creates a handler over `book`.
    pub fn new(book: Arc<PollBook>) -> Self {
        Self { book }
    }

    async fn usage(&self, ctx: &CommandContext, reason: &str) -> HandlerResult {
        let call = format!("{}{}", ctx.prefix(), ctx.invocation.tag);
        ctx.reply(&format!(
            "Usage: `{call} new <question> | <option> | <option>...`, `{call} vote <n>`, \
             `{call} show`, `{call} close`"
        ))
        .await;
        Err(HandlerError::invalid_args(reason))
    }
}

#[async_trait]
impl CommandHandler for StrawPoll {
    fn describe(&self) -> CommandDescription {
        CommandDescription::new("Runs a straw poll in this channel")
            .usage("new <question> | <option>... | vote <n> | show | close")
    }

    async fn on_command_received(&self, ctx: CommandContext) -> HandlerResult {
        let channel_id = ctx.channel().id.clone();
        let Some(subcommand) = ctx.invocation.arg(0) else {
            return self.usage(&ctx, "missing subcommand").await;
        };

        match subcommand {
            "new" => {
                let text = ctx.args()[1..].join(" ");
                let (question, options) = match parse_poll(&text) {
                    Ok(parsed) => parsed,
                    Err(reason) => {
                        ctx.reply(&format!("Sorry, {reason}.")).await;
                        return Err(HandlerError::invalid_args(reason));
                    }
                };
                let poll = Poll::new(&ctx.author().id, question, options);
                let rendered = poll.render();
                if self.book.open(&channel_id, poll).is_err() {
                    ctx.reply(&format!(
                        "A poll is already open here. Close it with `{}{} close`.",
                        ctx.prefix(),
                        ctx.invocation.tag
                    ))
                    .await;
                    return Ok(());
                }
                debug!(channel = %channel_id, "Poll opened");
                ctx.try_reply(&rendered).await?;
            }
            "vote" => {
                let Some(choice) = ctx.invocation.arg(1).and_then(|n| n.parse::<usize>().ok())
                else {
                    return self.usage(&ctx, "vote needs an option number").await;
                };
                let voter = ctx.author().id.clone();
                let reply = self.book.with_poll(&channel_id, |poll| {
                    if choice == 0 || choice > poll.options.len() {
                        return format!("Pick an option between 1 and {}.", poll.options.len());
                    }
                    let option = poll.options[choice - 1].clone();
                    match poll.vote(voter, choice - 1) {
                        Some(previous) if previous == choice - 1 => {
                            format!("You already voted for {option}.")
                        }
                        Some(_) => format!("Vote moved to {option}."),
                        None => format!("Voted for {option}."),
                    }
                });
                ctx.try_reply(reply.as_deref().unwrap_or("There is no open poll here."))
                    .await?;
            }
            "show" => {
                let rendered = self.book.with_poll(&channel_id, |poll| poll.render());
                ctx.try_reply(rendered.as_deref().unwrap_or("There is no open poll here."))
                    .await?;
            }
            "close" => {
                let Some(owner) = self
                    .book
                    .with_poll(&channel_id, |poll| poll.author_id.clone())
                else {
                    ctx.try_reply("There is no open poll here.").await?;
                    return Ok(());
                };

                let author = &ctx.author().id;
                if *author != owner
                    && !ctx
                        .platform()
                        .has_permission(ctx.channel(), author, Permission::ManageMessages)
                        .await?
                {
                    ctx.reply("Only the poll's author can close it.").await;
                    return Err(HandlerError::permission_denied("not the poll author"));
                }

                if let Some(poll) = self.book.close(&channel_id) {
                    debug!(channel = %channel_id, voters = poll.voters(), "Poll closed");
                    ctx.try_reply(&format!("Poll closed.\n{}", poll.render()))
                        .await?;
                }
            }
            _ => return self.usage(&ctx, "unknown subcommand").await,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use cogwheel_core::Author;
    use cogwheel_framework::DispatchOutcome;

    #[test]
    fn test_parse_poll() {
        assert_eq!(
            parse_poll("Pizza? | yes |  no "),
            Ok(("Pizza?".to_string(), vec!["yes".to_string(), "no".to_string()]))
        );
        assert!(parse_poll("Pizza? | yes").is_err());
        assert!(parse_poll(" | a | b").is_err());
        assert!(parse_poll("Lonely question").is_err());
    }

    #[test]
    fn test_revote_moves_vote() {
        let mut poll = Poll::new("u1", "q", vec!["a".into(), "b".into()]);
        assert_eq!(poll.vote("u2", 0), None);
        assert_eq!(poll.vote("u2", 1), Some(0));
        assert_eq!(poll.tally(), vec![0, 1]);
        assert_eq!(poll.voters(), 1);
    }

    #[tokio::test]
    async fn test_poll_lifecycle() {
        let harness = Harness::new();

        harness.send("!poll new Pizza tonight? | yes | no").await;
        assert_eq!(
            harness.platform.last_sent().as_deref(),
            Some("📊 **Pizza tonight?**\n1. yes (0 votes)\n2. no (0 votes)")
        );

        harness.send("!poll vote 1").await;
        assert_eq!(harness.platform.last_sent().as_deref(), Some("Voted for yes."));

        let bob = harness.message_from(Author::user("u2", "bob"), "!poll vote 2");
        harness.route(bob).await;
        harness.send("!poll vote 2").await;
        assert_eq!(harness.platform.last_sent().as_deref(), Some("Vote moved to no."));

        harness.send("!poll close").await;
        assert_eq!(
            harness.platform.last_sent().as_deref(),
            Some("Poll closed.\n📊 **Pizza tonight?**\n1. yes (0 votes)\n2. no (2 votes)")
        );
        assert!(harness.poll_book().is_empty());
    }

    #[tokio::test]
    async fn test_one_poll_per_channel() {
        let harness = Harness::new();
        harness.send("!poll new A? | x | y").await;
        harness.send("!poll new B? | x | y").await;

        assert_eq!(
            harness.platform.last_sent().as_deref(),
            Some("A poll is already open here. Close it with `!poll close`.")
        );
        assert_eq!(harness.poll_book().len(), 1);
    }

    #[tokio::test]
    async fn test_only_author_closes() {
        let harness = Harness::new();
        harness.send("!poll new A? | x | y").await;

        let bob = harness.message_from(Author::user("u2", "bob"), "!poll close");
        assert_eq!(harness.route(bob.clone()).await, DispatchOutcome::Failed);
        assert_eq!(harness.poll_book().len(), 1);

        harness.platform.grant("u2", Permission::ManageMessages);
        assert_eq!(harness.route(bob).await, DispatchOutcome::Handled);
        assert!(harness.poll_book().is_empty());
    }

    #[tokio::test]
    async fn test_vote_without_poll() {
        let harness = Harness::new();
        harness.send("!poll vote 1").await;
        assert_eq!(
            harness.platform.last_sent().as_deref(),
            Some("There is no open poll here.")
        );
        harness.send("!poll vote x").await;
        assert!(harness.platform.last_sent().unwrap().starts_with("Usage: `!poll new"));
    }
}
