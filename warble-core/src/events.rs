// ABOUTME: Typed gateway event model — the closed set of platform occurrences the runtime consumes.
// ABOUTME: Defines Event, Member, Message, channel/member identifiers, and error source classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque member identifier. Compared by value, never by display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberId(pub String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Channel identifier. A value type: presence tracking and configuration
/// compare channels by id only (display names are not identity).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a guild member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Unique identifier within the guild session
    pub id: MemberId,
    /// Human-readable display name
    pub name: String,
}

impl Member {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: MemberId::new(id),
            name: name.into(),
        }
    }
}

/// A guild the bot is connected to, reported in the ready payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    pub id: String,
    pub name: String,
}

/// Session information delivered once the gateway connection is live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyInfo {
    /// The bot's own display name
    pub user: String,
    /// Guilds the connection is attached to
    pub guilds: Vec<Guild>,
}

/// An inbound text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent it
    pub author: Member,
    /// Where it was sent
    pub channel: ChannelId,
    /// Raw text content
    pub body: String,
    /// Arrival time, used for ordering and latency/deadline computation
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(author: Member, channel: ChannelId, body: impl Into<String>) -> Self {
        Self {
            author,
            channel,
            body: body.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Which event kind an error originated from. Drives the dispatcher's
/// recoverable-versus-fatal policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSource {
    Ready,
    MemberJoined,
    VoiceState,
    Message,
    Gateway,
}

impl ErrorSource {
    /// All variants, for exhaustive policy tests.
    pub const ALL: [ErrorSource; 5] = [
        ErrorSource::Ready,
        ErrorSource::MemberJoined,
        ErrorSource::VoiceState,
        ErrorSource::Message,
        ErrorSource::Gateway,
    ];
}

impl std::fmt::Display for ErrorSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorSource::Ready => "ready",
            ErrorSource::MemberJoined => "member_joined",
            ErrorSource::VoiceState => "voice_state",
            ErrorSource::Message => "message",
            ErrorSource::Gateway => "gateway",
        };
        f.write_str(s)
    }
}

/// Events delivered by the gateway connection, in strict delivery order.
///
/// This is a closed union: the dispatcher fans each variant out to a fixed
/// handler, resolved by pattern match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Connection is live and the session is established
    Ready(ReadyInfo),
    /// A new member joined the guild
    MemberJoined(Member),
    /// A member changed voice channels (either side may be absent)
    VoiceStateChanged {
        member: Member,
        before: Option<ChannelId>,
        after: Option<ChannelId>,
    },
    /// A text message arrived
    MessageReceived(Message),
    /// The gateway surfaced an error while processing an event
    GatewayError { source: ErrorSource, detail: String },
}

impl Event {
    /// Short kind name for logging and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Ready(_) => "ready",
            Event::MemberJoined(_) => "member_joined",
            Event::VoiceStateChanged { .. } => "voice_state_changed",
            Event::MessageReceived(_) => "message_received",
            Event::GatewayError { .. } => "gateway_error",
        }
    }
}
