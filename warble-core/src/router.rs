// ABOUTME: Command table and routing — resolves invocations to registered handlers.
// ABOUTME: Owns argument-parsing modes and the handler-boundary failure containment of the loop.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::FutureExt;

use crate::commands::{parse_message, Command, ParseResult};
use crate::continuation::ContinuationEngine;
use crate::errors::{CommandError, RegistryError};
use crate::events::{Member, Message};
use crate::metrics;
use crate::presence::PresenceTracker;
use crate::roster::Roster;
use crate::traits::{SendTarget, SharedSink};

/// How the text after the command name is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgsMode {
    /// Extra text is ignored
    None,
    /// Everything after the name and one whitespace, verbatim
    Trailing,
    /// Whitespace-separated tokens; fewer than `min` is MissingArgument
    Variadic { min: usize },
    /// One token resolved to a known member (name or mention syntax)
    MemberLookup,
}

/// Parsed arguments handed to a handler, shaped by its [`ArgsMode`].
#[derive(Debug, Clone)]
pub enum Args {
    None,
    Trailing(String),
    Tokens(Vec<String>),
    Member(Member),
}

impl Args {
    pub fn trailing(&self) -> &str {
        match self {
            Args::Trailing(s) => s,
            _ => "",
        }
    }

    pub fn tokens(&self) -> &[String] {
        match self {
            Args::Tokens(t) => t,
            _ => &[],
        }
    }

    pub fn member(&self) -> Option<&Member> {
        match self {
            Args::Member(m) => Some(m),
            _ => None,
        }
    }
}

/// Everything a handler may touch while running: the invoking message, the
/// outbound sink, and read access to runtime state. Handlers suspend by
/// registering a continuation on `continuations` and returning.
#[derive(Clone)]
pub struct CommandContext {
    pub message: Message,
    pub sink: SharedSink,
    pub presence: PresenceTracker,
    pub roster: Roster,
    pub continuations: ContinuationEngine,
}

impl CommandContext {
    pub fn author(&self) -> &Member {
        &self.message.author
    }

    /// Send text to the invoking channel.
    pub async fn reply(&self, text: impl Into<String>) -> Result<()> {
        let text: String = text.into();
        self.sink
            .send(SendTarget::Channel(self.message.channel.clone()), &text)
            .await
    }
}

/// A command implementation. One impl per command, registered at startup.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn run(&self, ctx: &CommandContext, args: Args) -> Result<(), CommandError>;
}

/// A registered command: unique name, argument mode, handler, and a
/// one-line summary for the help listing.
#[derive(Clone)]
pub struct CommandSpec {
    pub name: String,
    pub summary: String,
    pub args: ArgsMode,
    pub handler: Arc<dyn CommandHandler>,
}

impl CommandSpec {
    pub fn new(
        name: impl Into<String>,
        summary: impl Into<String>,
        args: ArgsMode,
        handler: Arc<dyn CommandHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            summary: summary.into(),
            args,
            handler,
        }
    }
}

/// Outcome of offering a message to the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// No invocation marker matched; silently ignored
    NotACommand,
    /// Marker matched but the name is unregistered; reported to the channel
    NotFound(String),
    /// Arguments (or a handler precondition) were rejected; reported
    Rejected(String),
    /// Handler ran to completion or suspended on a continuation
    Completed(String),
    /// Handler body failed; logged and reported generically
    Failed(String),
}

/// The command table. Built once at startup with [`register`], then moved
/// into the dispatcher; no mutation happens while dispatch is active.
///
/// [`register`]: CommandRegistry::register
#[derive(Default)]
pub struct CommandRegistry {
    table: HashMap<String, CommandSpec>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command. Names are unique: a second registration under the
    /// same name is a configuration error, not a replacement.
    pub fn register(&mut self, spec: CommandSpec) -> Result<(), RegistryError> {
        if self.table.contains_key(&spec.name) {
            return Err(RegistryError::DuplicateCommand(spec.name));
        }
        self.table.insert(spec.name.clone(), spec);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// (name, summary) pairs, sorted by name. Backs the help command.
    pub fn summaries(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .table
            .values()
            .map(|s| (s.name.clone(), s.summary.clone()))
            .collect();
        entries.sort();
        entries
    }

    /// Offer a message to the command table.
    ///
    /// Returns `Ok` for every *handled* disposition, including handler
    /// failures; an `Err` here means an outbound send itself failed, which
    /// the dispatcher logs as a message-processing error.
    pub async fn route(
        &self,
        ctx: &CommandContext,
        prefix: &str,
        self_id: &str,
    ) -> Result<Routed> {
        let command = match parse_message(&ctx.message.body, prefix, self_id) {
            ParseResult::NotACommand => return Ok(Routed::NotACommand),
            ParseResult::Invocation(cmd) => cmd,
        };

        let Some(spec) = self.table.get(&command.name) else {
            tracing::debug!(command = %command.name, author = %ctx.author().id, "unknown command");
            metrics::record_route_outcome("not_found");
            ctx.reply(format!(
                "Unknown command: {}. Try {}help.",
                command.name, prefix
            ))
            .await?;
            return Ok(Routed::NotFound(command.name));
        };

        metrics::record_command(&spec.name);

        let args = match self.parse_args(spec, &command, ctx) {
            Ok(args) => args,
            Err(e) => {
                metrics::record_route_outcome("rejected");
                ctx.reply(e.to_string()).await?;
                return Ok(Routed::Rejected(spec.name.clone()));
            }
        };

        self.invoke(spec, ctx, args).await
    }

    fn parse_args(
        &self,
        spec: &CommandSpec,
        command: &Command,
        ctx: &CommandContext,
    ) -> Result<Args, CommandError> {
        match spec.args {
            ArgsMode::None => Ok(Args::None),
            ArgsMode::Trailing => Ok(Args::Trailing(command.raw_args.clone())),
            ArgsMode::Variadic { min } => {
                if command.tokens.len() < min {
                    return Err(CommandError::MissingArgument {
                        command: spec.name.clone(),
                        min,
                    });
                }
                Ok(Args::Tokens(command.tokens.clone()))
            }
            ArgsMode::MemberLookup => {
                let token = command.token(0).ok_or(CommandError::MissingArgument {
                    command: spec.name.clone(),
                    min: 1,
                })?;
                let member =
                    ctx.roster
                        .resolve(token)
                        .ok_or_else(|| CommandError::ArgumentResolution {
                            token: token.to_string(),
                        })?;
                Ok(Args::Member(member))
            }
        }
    }

    /// Run the handler with failure containment: errors and panics stop at
    /// this boundary, are logged with reproduction context, and turn into a
    /// generic report in the invoking channel.
    async fn invoke(
        &self,
        spec: &CommandSpec,
        ctx: &CommandContext,
        args: Args,
    ) -> Result<Routed> {
        let run = AssertUnwindSafe(spec.handler.run(ctx, args)).catch_unwind();
        let outcome = match run.await {
            Ok(result) => result,
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                Err(CommandError::Handler(anyhow::anyhow!(
                    "handler panicked: {detail}"
                )))
            }
        };

        match outcome {
            Ok(()) => {
                metrics::record_route_outcome("completed");
                Ok(Routed::Completed(spec.name.clone()))
            }
            Err(CommandError::Handler(cause)) => {
                tracing::error!(
                    command = %spec.name,
                    author = %ctx.author().id,
                    channel = %ctx.message.channel,
                    error = %cause,
                    "handler failed"
                );
                metrics::record_route_outcome("failed");
                ctx.reply(format!("Something went wrong running '{}'.", spec.name))
                    .await?;
                Ok(Routed::Failed(spec.name.clone()))
            }
            // Preconditions a handler raised itself (missing argument after
            // inspection, a prompt already pending): reported, non-fatal.
            Err(e) => {
                tracing::debug!(command = %spec.name, author = %ctx.author().id, error = %e, "command rejected");
                metrics::record_route_outcome("rejected");
                ctx.reply(e.to_string()).await?;
                Ok(Routed::Rejected(spec.name.clone()))
            }
        }
    }
}
