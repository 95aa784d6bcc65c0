// ABOUTME: Single control point of the runtime — fans gateway events out in delivery order.
// ABOUTME: Continuation check precedes command routing; holds the recoverable/fatal error policy.

use anyhow::Result;
use futures_util::StreamExt;
use tokio::time::{interval, Duration, Instant};

use crate::config::BotConfig;
use crate::continuation::{ContinuationEngine, FeedOutcome};
use crate::events::{ErrorSource, Event, Member, MemberId, Message};
use crate::metrics;
use crate::presence::PresenceTracker;
use crate::roster::Roster;
use crate::router::{CommandContext, CommandRegistry};
use crate::traits::{EventStream, SendTarget, SharedSink};

/// Whether the loop keeps running after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Fatal,
}

/// Receives each event exactly once, in source order, and fans it out to
/// the continuation engine, command router, presence tracker, and roster.
pub struct Dispatcher {
    registry: CommandRegistry,
    sink: SharedSink,
    continuations: ContinuationEngine,
    presence: PresenceTracker,
    roster: Roster,
    prefix: String,
    self_id: MemberId,
    greeting: String,
}

impl Dispatcher {
    pub fn new(config: &BotConfig, registry: CommandRegistry, sink: SharedSink) -> Self {
        Self {
            registry,
            sink,
            continuations: ContinuationEngine::new(config.reply_timeout()),
            presence: PresenceTracker::new(config.monitored()),
            roster: Roster::new(),
            prefix: config.prefix.clone(),
            self_id: MemberId::new(config.self_id.clone()),
            greeting: config.greeting.clone(),
        }
    }

    pub fn presence(&self) -> PresenceTracker {
        self.presence.clone()
    }

    pub fn roster(&self) -> Roster {
        self.roster.clone()
    }

    pub fn continuations(&self) -> ContinuationEngine {
        self.continuations.clone()
    }

    /// The error policy table: which error sources terminate the loop.
    ///
    /// Errors raised while processing a message are logged and absorbed;
    /// everything else means connection or session state can no longer be
    /// trusted and stops the loop.
    pub fn fatal_for(source: ErrorSource) -> bool {
        match source {
            ErrorSource::Message => false,
            ErrorSource::Ready
            | ErrorSource::MemberJoined
            | ErrorSource::VoiceState
            | ErrorSource::Gateway => true,
        }
    }

    /// Process one event. Invoked once per delivery, in delivery order.
    pub async fn dispatch(&self, event: Event) -> Flow {
        metrics::record_event(event.kind());
        match event {
            Event::Ready(info) => {
                tracing::info!(user = %info.user, guilds = info.guilds.len(), "connected");
                for guild in &info.guilds {
                    tracing::info!(guild = %guild.name, id = %guild.id, "serving guild");
                }
                Flow::Continue
            }
            Event::MemberJoined(member) => {
                self.greet(&member).await;
                Flow::Continue
            }
            Event::VoiceStateChanged {
                member,
                before,
                after,
            } => {
                self.roster.observe(&member);
                if let Some(change) = self.presence.apply(&member, before.as_ref(), after.as_ref())
                {
                    tracing::info!(member = %member.id, change = change.kind(), "voice presence");
                }
                Flow::Continue
            }
            Event::MessageReceived(message) => {
                self.handle_message(message).await;
                Flow::Continue
            }
            Event::GatewayError { source, detail } => {
                self.sink
                    .log(&format!("gateway error from {source}: {detail}"));
                if Self::fatal_for(source) {
                    tracing::error!(%source, %detail, "fatal gateway error");
                    Flow::Fatal
                } else {
                    tracing::warn!(%source, %detail, "gateway error absorbed");
                    Flow::Continue
                }
            }
        }
    }

    async fn greet(&self, member: &Member) {
        self.roster.observe(member);
        let greeting = self.greeting.replace("{name}", &member.name);
        if let Err(e) = self
            .sink
            .send(SendTarget::Member(member.id.clone()), &greeting)
            .await
        {
            tracing::warn!(member = %member.id, error = %e, "greeting send failed");
        }
    }

    async fn handle_message(&self, message: Message) {
        // Never react to our own output
        if message.author.id == self.self_id {
            return;
        }
        self.roster.observe(&message.author);

        // A pending continuation intercepts matching messages before they
        // can be interpreted as a new command.
        match self.continuations.feed(&message).await {
            Ok(FeedOutcome::Consumed) => return,
            Ok(FeedOutcome::Rejected) | Ok(FeedOutcome::NotPending) => {}
            Err(e) => {
                tracing::error!(author = %message.author.id, error = %e, "continuation resume failed");
                return;
            }
        }

        let ctx = CommandContext {
            message,
            sink: self.sink.clone(),
            presence: self.presence.clone(),
            roster: self.roster.clone(),
            continuations: self.continuations.clone(),
        };
        if let Err(e) = self
            .registry
            .route(&ctx, &self.prefix, self.self_id.as_str())
            .await
        {
            // Outbound send failed; a message-processing error, never fatal
            tracing::error!(
                author = %ctx.message.author.id,
                channel = %ctx.message.channel,
                error = %e,
                "message dispatch failed"
            );
        }
    }

    /// Drive the dispatcher from an event stream until the stream ends or a
    /// fatal error arrives. A one-second tick expires due continuations;
    /// whatever is still pending at shutdown is resumed as timed out.
    pub async fn run(&self, mut stream: EventStream) -> Result<()> {
        let mut expiry = interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                maybe_event = stream.next() => match maybe_event {
                    Some(event) => {
                        if self.dispatch(event).await == Flow::Fatal {
                            self.continuations.drain().await;
                            anyhow::bail!("fatal gateway error, dispatcher stopped");
                        }
                    }
                    None => break,
                },
                _ = expiry.tick() => {
                    self.continuations.expire_due(Instant::now()).await;
                }
            }
        }
        let drained = self.continuations.drain().await;
        if drained > 0 {
            tracing::info!(drained, "timed out pending continuations at shutdown");
        }
        tracing::info!("event stream ended, dispatcher stopped");
        Ok(())
    }
}
