//! `roll`: dice rolls.
//!
//! ```text
//! !roll        → one d6
//! !roll 20     → one d20
//! !roll 3d8    → three d8, summed
//! ```

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use cogwheel_framework::{
    CommandContext, CommandDescription, CommandHandler, HandlerError, HandlerResult,
};

/// Sides used when none are given.
pub const DEFAULT_SIDES: u32 = 6;

/// Most dice a single roll may throw.
pub const MAX_DICE: u32 = 100;

/// Most sides a die may have.
pub const MAX_SIDES: u32 = 1_000_000;

/// A dice expression: `count` dice with `sides` sides each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dice {
    /// Number of dice.
    pub count: u32,
    /// Sides per die.
    pub sides: u32,
}

impl Default for Dice {
    fn default() -> Self {
        Self {
            count: 1,
            sides: DEFAULT_SIDES,
        }
    }
}

impl fmt::Display for Dice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)
    }
}

impl FromStr for Dice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (count, sides) = match s.to_ascii_lowercase().split_once('d') {
            Some(("", sides)) => (1, parse_number(sides, "sides")?),
            Some((count, sides)) => (parse_number(count, "dice")?, parse_number(sides, "sides")?),
            None => (1, parse_number(s, "sides")?),
        };

        if !(1..=MAX_DICE).contains(&count) {
            return Err(format!("roll between 1 and {MAX_DICE} dice"));
        }
        if !(2..=MAX_SIDES).contains(&sides) {
            return Err(format!("a die needs between 2 and {MAX_SIDES} sides"));
        }
        Ok(Self { count, sides })
    }
}

fn parse_number(s: &str, what: &str) -> Result<u32, String> {
    s.parse()
        .map_err(|_| format!("'{s}' is not a valid number of {what}"))
}

/// Rolls dice.
pub struct Roll {
    rng: Mutex<StdRng>,
}

impl Default for Roll {
    fn default() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }
}

impl Roll {
    /// Creates a roller with a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Throws `dice` and returns each face.
    pub fn throw(&self, dice: Dice) -> Vec<u32> {
        let mut rng = self.rng.lock();
        (0..dice.count)
            .map(|_| rng.gen_range(1..=dice.sides))
            .collect()
    }
}

impl fmt::Debug for Roll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Roll").finish_non_exhaustive()
    }
}

#[async_trait]
impl CommandHandler for Roll {
    fn describe(&self) -> CommandDescription {
        CommandDescription::new("Rolls dice").usage("[sides | NdM]")
    }

    async fn on_command_received(&self, ctx: CommandContext) -> HandlerResult {
        let dice = match ctx.invocation.arg(0) {
            None => Dice::default(),
            Some(expr) => match expr.parse::<Dice>() {
                Ok(dice) => dice,
                Err(reason) => {
                    ctx.reply(&format!(
                        "Sorry, {reason}. Usage: `{}{} [sides | NdM]`",
                        ctx.prefix(),
                        ctx.invocation.tag
                    ))
                    .await;
                    return Err(HandlerError::invalid_args(reason));
                }
            },
        };

        let faces = self.throw(dice);
        let name = &ctx.author().name;
        let reply = match faces.as_slice() {
            [face] => format!("{name} rolled **{face}** ({dice})"),
            _ => {
                let total: u64 = faces.iter().map(|&f| u64::from(f)).sum();
                let shown: Vec<String> = faces.iter().map(u32::to_string).collect();
                format!("{name} rolled {dice}: {} = **{total}**", shown.join(" + "))
            }
        };
        ctx.try_reply(&reply).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use cogwheel_framework::DispatchOutcome;

    #[test]
    fn test_parse_dice() {
        assert_eq!("20".parse::<Dice>(), Ok(Dice { count: 1, sides: 20 }));
        assert_eq!("3d8".parse::<Dice>(), Ok(Dice { count: 3, sides: 8 }));
        assert_eq!("D12".parse::<Dice>(), Ok(Dice { count: 1, sides: 12 }));
        assert!("0d6".parse::<Dice>().is_err());
        assert!("1d1".parse::<Dice>().is_err());
        assert!("101d6".parse::<Dice>().is_err());
        assert!("banana".parse::<Dice>().is_err());
        assert!("2d".parse::<Dice>().is_err());
    }

    #[test]
    fn test_throw_stays_in_range() {
        let roll = Roll::seeded(7);
        let faces = roll.throw(Dice { count: 50, sides: 4 });
        assert_eq!(faces.len(), 50);
        assert!(faces.iter().all(|f| (1..=4).contains(f)));
    }

    #[tokio::test]
    async fn test_roll_default_d6() {
        let harness = Harness::new();
        assert_eq!(harness.send("!roll").await, DispatchOutcome::Handled);

        let reply = harness.platform.last_sent().unwrap();
        assert!(reply.starts_with("alice rolled **"));
        assert!(reply.ends_with("(1d6)"));
    }

    #[tokio::test]
    async fn test_roll_many_dice_shows_total() {
        let harness = Harness::new();
        harness.send("!roll 3d6").await;

        let reply = harness.platform.last_sent().unwrap();
        assert!(reply.starts_with("alice rolled 3d6: "));
        assert_eq!(reply.matches(" + ").count(), 2);
    }

    #[tokio::test]
    async fn test_roll_rejects_garbage() {
        let harness = Harness::new();
        assert_eq!(harness.send("!roll lots").await, DispatchOutcome::Failed);
        assert!(harness.platform.last_sent().unwrap().contains("Usage: `!roll"));
    }
}
