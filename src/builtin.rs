// ABOUTME: Built-in command set: echo, ping, choice, whois, present, guess, help.
// ABOUTME: One handler type per command; guess demonstrates the suspend/resume continuation flow.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use warble_core::{
    resume_fn, Args, ArgsMode, ChannelId, CommandContext, CommandError, CommandHandler,
    CommandRegistry, CommandSpec, Message, RegistryError, ReplyOutcome, SendTarget,
};

/// Repeats the trailing argument string back verbatim.
pub struct EchoCommand;

#[async_trait]
impl CommandHandler for EchoCommand {
    async fn run(&self, ctx: &CommandContext, args: Args) -> Result<(), CommandError> {
        ctx.reply(args.trailing()).await?;
        Ok(())
    }
}

/// Reports round-trip latency from the message's arrival timestamp.
pub struct PingCommand {
    /// Pinned latency for deterministic tests
    fixed_latency_ms: Option<i64>,
}

impl PingCommand {
    pub fn new() -> Self {
        Self {
            fixed_latency_ms: None,
        }
    }

    pub fn with_fixed_latency(ms: i64) -> Self {
        Self {
            fixed_latency_ms: Some(ms),
        }
    }
}

impl Default for PingCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandHandler for PingCommand {
    async fn run(&self, ctx: &CommandContext, _args: Args) -> Result<(), CommandError> {
        let ms = match self.fixed_latency_ms {
            Some(ms) => ms,
            None => {
                let delta = Utc::now() - ctx.message.timestamp;
                // Round to the nearest millisecond
                let micros = delta.num_microseconds().unwrap_or(0);
                (micros as f64 / 1000.0).round() as i64
            }
        };
        ctx.reply(format!("Pong! {ms}ms")).await?;
        Ok(())
    }
}

/// Picks uniformly at random among the provided tokens.
pub struct ChoiceCommand {
    rng: Mutex<StdRng>,
}

impl ChoiceCommand {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for ChoiceCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandHandler for ChoiceCommand {
    async fn run(&self, ctx: &CommandContext, args: Args) -> Result<(), CommandError> {
        // min: 1 is enforced by the router; tokens() is never empty here
        let pick = {
            let mut rng = self.rng.lock().expect("choice rng poisoned");
            args.tokens()
                .choose(&mut *rng)
                .cloned()
                .unwrap_or_default()
        };
        ctx.reply(pick).await?;
        Ok(())
    }
}

/// Looks up a member by display name or mention and reports their identity.
pub struct WhoisCommand;

#[async_trait]
impl CommandHandler for WhoisCommand {
    async fn run(&self, ctx: &CommandContext, args: Args) -> Result<(), CommandError> {
        let member = args
            .member()
            .ok_or_else(|| CommandError::Handler(anyhow::anyhow!("whois requires MemberLookup args")))?;

        let mut line = format!("{} (id {})", member.name, member.id);
        for channel in ctx.presence.monitored_channels() {
            if ctx.presence.members_in(&channel).contains(&member.id) {
                line.push_str(&format!(", currently in #{channel}"));
                break;
            }
        }
        ctx.reply(line).await?;
        Ok(())
    }
}

/// Lists the members currently inside a monitored voice channel.
pub struct PresentCommand;

#[async_trait]
impl CommandHandler for PresentCommand {
    async fn run(&self, ctx: &CommandContext, args: Args) -> Result<(), CommandError> {
        let channel = match args.tokens().first() {
            Some(name) => ChannelId::new(name.as_str()),
            None => match ctx.presence.monitored_channels().into_iter().next() {
                Some(channel) => channel,
                None => {
                    ctx.reply("No voice channels are being monitored.").await?;
                    return Ok(());
                }
            },
        };

        if !ctx.presence.is_monitored(&channel) {
            ctx.reply(format!("#{channel} is not a monitored channel."))
                .await?;
            return Ok(());
        }

        let occupants = ctx.presence.members_in(&channel);
        if occupants.is_empty() {
            ctx.reply(format!("Nobody is in #{channel}.")).await?;
            return Ok(());
        }

        let mut names: Vec<String> = occupants
            .iter()
            .map(|id| {
                ctx.roster
                    .get(id)
                    .map(|m| m.name)
                    .unwrap_or_else(|| id.to_string())
            })
            .collect();
        names.sort();
        ctx.reply(format!("In #{channel}: {}", names.join(", ")))
            .await?;
        Ok(())
    }
}

/// Number guessing game: prompts, then suspends on a continuation that
/// accepts the first integer reply from the invoking author.
pub struct GuessCommand {
    rng: Mutex<StdRng>,
    /// Pinned target for deterministic tests
    fixed_target: Option<i64>,
}

impl GuessCommand {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
            fixed_target: None,
        }
    }

    pub fn with_target(target: i64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(0)),
            fixed_target: Some(target),
        }
    }
}

impl Default for GuessCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandHandler for GuessCommand {
    async fn run(&self, ctx: &CommandContext, _args: Args) -> Result<(), CommandError> {
        let target = match self.fixed_target {
            Some(t) => t,
            None => self.rng.lock().expect("guess rng poisoned").gen_range(1..=10),
        };

        if ctx.continuations.is_pending(&ctx.author().id) {
            return Err(CommandError::AlreadyPending);
        }

        // The prompt must land before the continuation exists: a failed
        // send leaves nothing pending, so a retry is not AlreadyPending.
        let secs = ctx.continuations.default_timeout().as_secs();
        ctx.reply(format!(
            "Guess a number between 1 and 10. You have {secs} seconds!"
        ))
        .await?;

        let sink = ctx.sink.clone();
        let channel = ctx.message.channel.clone();
        // Suspend: replies that don't parse as integers leave the
        // continuation pending.
        ctx.continuations.await_reply(
            ctx.author().id.clone(),
            Box::new(|m: &Message| m.body.trim().parse::<i64>().is_ok()),
            resume_fn(move |outcome| async move {
                let text = match outcome {
                    ReplyOutcome::Message(reply) => match reply.body.trim().parse::<i64>() {
                        Ok(v) if v == target => format!("Correct! It was {target}."),
                        Ok(_) => format!("Incorrect, it was {target}."),
                        // The validator only admits integers
                        Err(_) => return Ok(()),
                    },
                    ReplyOutcome::TimedOut => format!("Time's up! The number was {target}."),
                };
                sink.send(SendTarget::Channel(channel), &text).await
            }),
        )?;
        Ok(())
    }
}

/// Lists the registered commands with their summaries.
pub struct HelpCommand {
    prefix: String,
    entries: Vec<(String, String)>,
}

impl HelpCommand {
    pub fn new(prefix: impl Into<String>, entries: Vec<(String, String)>) -> Self {
        Self {
            prefix: prefix.into(),
            entries,
        }
    }
}

#[async_trait]
impl CommandHandler for HelpCommand {
    async fn run(&self, ctx: &CommandContext, _args: Args) -> Result<(), CommandError> {
        let mut text = String::from("Available commands:");
        for (name, summary) in &self.entries {
            text.push_str(&format!("\n  {}{} - {}", self.prefix, name, summary));
        }
        ctx.reply(text).await?;
        Ok(())
    }
}

/// Build the standard command table. Registration failures here are
/// configuration bugs and abort startup.
pub fn builtin_registry(prefix: &str) -> Result<CommandRegistry, RegistryError> {
    let mut specs = vec![
        CommandSpec::new(
            "echo",
            "repeat the text back verbatim",
            ArgsMode::Trailing,
            Arc::new(EchoCommand),
        ),
        CommandSpec::new(
            "ping",
            "measure round-trip latency",
            ArgsMode::None,
            Arc::new(PingCommand::new()),
        ),
        CommandSpec::new(
            "choice",
            "pick one of the given options at random",
            ArgsMode::Variadic { min: 1 },
            Arc::new(ChoiceCommand::new()),
        ),
        CommandSpec::new(
            "whois",
            "look up a member by name or mention",
            ArgsMode::MemberLookup,
            Arc::new(WhoisCommand),
        ),
        CommandSpec::new(
            "present",
            "list who is in a monitored voice channel",
            ArgsMode::Variadic { min: 0 },
            Arc::new(PresentCommand),
        ),
        CommandSpec::new(
            "guess",
            "play a number guessing game",
            ArgsMode::None,
            Arc::new(GuessCommand::new()),
        ),
    ];

    let mut entries: Vec<(String, String)> = specs
        .iter()
        .map(|s| (s.name.clone(), s.summary.clone()))
        .collect();
    entries.push(("help".to_string(), "show this list".to_string()));
    entries.sort();

    specs.push(CommandSpec::new(
        "help",
        "show this list",
        ArgsMode::None,
        Arc::new(HelpCommand::new(prefix, entries)),
    ));

    let mut registry = CommandRegistry::new();
    for spec in specs {
        registry.register(spec)?;
    }
    Ok(registry)
}
