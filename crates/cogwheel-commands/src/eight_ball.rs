//! `8ball`: the magic eight ball.

use async_trait::async_trait;
use rand::seq::SliceRandom;

use cogwheel_framework::{
    CommandContext, CommandDescription, CommandHandler, HandlerError, HandlerResult,
};

/// The twenty classic answers.
pub const ANSWERS: &[&str] = &[
    "It is certain.",
    "It is decidedly so.",
    "Without a doubt.",
    "Yes, definitely.",
    "You may rely on it.",
    "As I see it, yes.",
    "Most likely.",
    "Outlook good.",
    "Yes.",
    "Signs point to yes.",
    "Reply hazy, try again.",
    "Ask again later.",
    "Better not tell you now.",
    "Cannot predict now.",
    "Concentrate and ask again.",
    "Don't count on it.",
    "My reply is no.",
    "My sources say no.",
    "Outlook not so good.",
    "Very doubtful.",
];

/// Answers yes/no questions at random.
#[derive(Debug, Default)]
pub struct EightBall;

#[async_trait]
impl CommandHandler for EightBall {
    fn describe(&self) -> CommandDescription {
        CommandDescription::new("Answers a yes/no question").usage("<question>")
    }

    async fn on_command_received(&self, ctx: CommandContext) -> HandlerResult {
        if ctx.args().is_empty() {
            ctx.reply("Ask me a question first.").await;
            return Err(HandlerError::invalid_args("no question"));
        }

        let answer = ANSWERS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("Ask again later.");
        ctx.try_reply(&format!("🎱 {answer}")).await?;
        Ok(())
    }
}
