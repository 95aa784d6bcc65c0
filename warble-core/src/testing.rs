// ABOUTME: Test support — recording sink and event constructors.
// ABOUTME: Used by the crate's own tests and by embedding binaries' test suites.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use crate::events::{ChannelId, Event, Member, Message};
use crate::traits::{OutboundSink, SendTarget};

/// An [`OutboundSink`] that records every send and log line for assertions.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(SendTarget, String)>>,
    logged: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent, in order, as (target, text) pairs.
    pub fn sent(&self) -> Vec<(SendTarget, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Just the sent texts, in order.
    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn last_text(&self) -> Option<String> {
        self.sent.lock().unwrap().last().map(|(_, t)| t.clone())
    }

    /// Diagnostic lines captured via the sink's log capability.
    pub fn logged(&self) -> Vec<String> {
        self.logged.lock().unwrap().clone()
    }

    /// Wrap a fresh sink in the Arc shape the runtime expects.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl OutboundSink for RecordingSink {
    async fn send(&self, target: SendTarget, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push((target, text.to_string()));
        Ok(())
    }

    fn log(&self, line: &str) {
        self.logged.lock().unwrap().push(line.to_string());
    }
}

/// Build a message from `author` in the named channel.
pub fn message(author: &Member, channel: &str, body: &str) -> Message {
    Message::new(author.clone(), ChannelId::new(channel), body)
}

/// Build a MessageReceived event.
pub fn message_event(author: &Member, channel: &str, body: &str) -> Event {
    Event::MessageReceived(message(author, channel, body))
}

/// Build a VoiceStateChanged event from optional channel names.
pub fn voice_event(member: &Member, before: Option<&str>, after: Option<&str>) -> Event {
    Event::VoiceStateChanged {
        member: member.clone(),
        before: before.map(ChannelId::new),
        after: after.map(ChannelId::new),
    }
}
