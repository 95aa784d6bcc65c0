// ABOUTME: Seams to the runtime's two external collaborators.
// ABOUTME: EventStream (gateway -> core) and OutboundSink (core -> platform/diagnostics).

use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio_stream::Stream;

use crate::events::{ChannelId, Event, MemberId};

/// Boxed stream of gateway events. The gateway connection owns ordering,
/// heartbeat, and reconnect; the core only requires strict delivery order.
pub type EventStream = Pin<Box<dyn Stream<Item = Event> + Send>>;

/// Destination for an outbound send.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SendTarget {
    /// A text channel
    Channel(ChannelId),
    /// A direct message to a member
    Member(MemberId),
}

impl std::fmt::Display for SendTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendTarget::Channel(c) => write!(f, "#{c}"),
            SendTarget::Member(m) => write!(f, "@{m}"),
        }
    }
}

/// Outbound side of the platform connection, plus the diagnostic sink.
///
/// Sends are fire-and-forget from the core's perspective: delivery
/// success is the platform client's concern. A send error is treated as a
/// message-processing failure (logged, never fatal to the loop).
#[async_trait]
pub trait OutboundSink: Send + Sync {
    /// Send text to a channel or member.
    async fn send(&self, target: SendTarget, text: &str) -> Result<()>;

    /// Append a line to the diagnostic sink. Defaults to the tracing stack;
    /// test sinks override this to capture the line.
    fn log(&self, line: &str) {
        tracing::info!("{line}");
    }
}

/// Shared handle to the sink, cloned into command contexts.
pub type SharedSink = Arc<dyn OutboundSink>;
