// ABOUTME: Platform-agnostic chat bot runtime core.
// ABOUTME: Event dispatch, command routing, reply continuations, and voice presence tracking.

pub mod commands;
pub mod config;
pub mod continuation;
pub mod dispatcher;
pub mod errors;
pub mod events;
pub mod metrics;
pub mod presence;
pub mod roster;
pub mod router;
pub mod testing;
pub mod traits;

// Re-export the types an embedding binary touches most
pub use config::BotConfig;
pub use continuation::{resume_fn, ContinuationEngine, FeedOutcome, ReplyOutcome};
pub use dispatcher::{Dispatcher, Flow};
pub use errors::{CommandError, ContinuationError, RegistryError};
pub use events::{ChannelId, ErrorSource, Event, Guild, Member, MemberId, Message, ReadyInfo};
pub use presence::{PresenceChange, PresenceTracker};
pub use roster::Roster;
pub use router::{Args, ArgsMode, CommandContext, CommandHandler, CommandRegistry, CommandSpec, Routed};
pub use traits::{EventStream, OutboundSink, SendTarget, SharedSink};
