//! Discord Bot Demo
//!
//! Runs the built-in commands on Discord, or on the local console, and
//! edits the persisted command settings.
//!
//! # Usage
//!
//! ```bash
//! # Try commands locally, no token needed
//! cargo run --package discord-bot -- console
//!
//! # Connect to Discord
//! DISCORD_TOKEN=... cargo run --package discord-bot -- run
//!
//! # Edit settings (applied on the next start)
//! cargo run --package discord-bot -- commands list
//! cargo run --package discord-bot -- commands enable ban
//! cargo run --package discord-bot -- commands retag roll dice
//! cargo run --package discord-bot -- prefix '?'
//! ```

mod console;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use clap::{Parser, Subcommand};
use cogwheel::core::{ConfigurableAdapter, Setting};
use cogwheel::discord::{DiscordAdapter, DiscordConfig};
use cogwheel::framework::TOKEN_KEY;
use cogwheel::prelude::*;

use crate::console::ConsoleAdapter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Configuration file (default: search for cogwheel.toml).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Configuration profile.
    #[arg(short, long, global = true, env = "COGWHEEL_PROFILE")]
    profile: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Connect to Discord (default).
    Run {
        /// Bot token; overrides bot.token and the stored token.
        #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
    /// Read commands from stdin instead of Discord.
    Console,
    /// Inspect or edit command settings.
    #[command(subcommand)]
    Commands(CommandsAction),
    /// Persist a new command prefix.
    Prefix { prefix: String },
    /// Persist the bot token in the settings store.
    Token { token: String },
}

#[derive(Subcommand)]
enum CommandsAction {
    /// List every command setting.
    List,
    /// Enable a command by handler id.
    Enable { handler_id: String },
    /// Disable a command by handler id.
    Disable { handler_id: String },
    /// Change the tag a command answers to.
    Retag { handler_id: String, tag: String },
}

async fn build_runtime(cli: &Cli) -> Result<BotRuntime> {
    let mut builder = BotRuntime::builder().factory(builtin_factory());
    if let Some(path) = &cli.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &cli.profile {
        builder = builder.profile(profile);
    }
    builder.build().await.context("failed to start runtime")
}

async fn run_discord(runtime: &BotRuntime, token: Option<String>) -> Result<()> {
    let token = match token {
        Some(token) => token,
        None => runtime.resolve_token().await?,
    };
    let config = DiscordConfig {
        token: Some(token),
        ..runtime.adapter_config::<DiscordAdapter>()?
    };
    runtime
        .add_adapter(DiscordAdapter::from_config(config)?)
        .await;
    runtime.run().await?;
    Ok(())
}

async fn edit_commands(runtime: &BotRuntime, action: CommandsAction) -> Result<()> {
    runtime.init().await?;
    let reconciler = runtime.reconciler();

    let changed = match action {
        CommandsAction::List => {
            let mut settings = runtime.store().select_all().await?;
            settings.sort_by(|a, b| a.handler_id.cmp(&b.handler_id));
            for setting in settings {
                let state = if setting.enabled { "enabled" } else { "disabled" };
                println!("{:<8} {:<12} {state}", setting.handler_id, setting.tag);
            }
            return Ok(());
        }
        CommandsAction::Enable { handler_id } => reconciler.set_enabled(&handler_id, true).await,
        CommandsAction::Disable { handler_id } => reconciler.set_enabled(&handler_id, false).await,
        CommandsAction::Retag { handler_id, tag } => reconciler.retag(&handler_id, &tag).await,
    };

    let setting = changed?;
    println!("{setting}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let runtime = build_runtime(&cli).await?;

    match cli.command.unwrap_or(Command::Run { token: None }) {
        Command::Run { token } => run_discord(&runtime, token).await?,
        Command::Console => {
            runtime.add_adapter(Arc::new(ConsoleAdapter)).await;
            let prefix = runtime
                .reconciler()
                .resolve_prefix(&runtime.config().bot.prefix)
                .await;
            info!(prefix = %prefix, "Type commands, Ctrl+D to quit");
            runtime.run().await?;
        }
        Command::Commands(action) => edit_commands(&runtime, action).await?,
        Command::Prefix { prefix } => {
            ensure!(
                !prefix.is_empty() && !prefix.contains(char::is_whitespace),
                "prefix must be non-empty and contain no whitespace"
            );
            runtime.reconciler().store_prefix(&prefix).await?;
            println!("prefix set to {prefix}");
        }
        Command::Token { token } => {
            runtime.store().set_value(&Setting::new(TOKEN_KEY, token)).await?;
            println!("token stored");
        }
    }
    Ok(())
}
