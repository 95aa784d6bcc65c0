// ABOUTME: Local console gateway — stdin lines become events, sends print to stdout.
// ABOUTME: Lets the runtime be exercised without a platform connection (which is external).

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use warble_core::{
    BotConfig, ChannelId, ErrorSource, Event, EventStream, Guild, Member, OutboundSink,
    ReadyInfo, SendTarget,
};

/// Channel name used for console chat lines.
const CONSOLE_CHANNEL: &str = "console";

/// Prints outbound sends to stdout.
pub struct ConsoleSink;

#[async_trait]
impl OutboundSink for ConsoleSink {
    async fn send(&self, target: SendTarget, text: &str) -> Result<()> {
        println!("[{target}] {text}");
        Ok(())
    }
}

/// What a console line turned into.
enum ConsoleInput {
    Event(Event),
    Quit,
    Unrecognized(String),
}

/// Spawn the stdin reader and return the event stream it feeds.
///
/// Line protocol: plain text is a message from the console member;
/// `/join <id> <name>`, `/voice <id> <from|-> <to|->`, and
/// `/error <source> <detail>` synthesize the other event kinds;
/// `/quit` ends the stream (and with it the dispatcher run loop).
pub fn console_events(config: &BotConfig) -> EventStream {
    let (tx, rx) = mpsc::channel::<Event>(64);
    let self_name = config.self_id.clone();

    tokio::spawn(async move {
        let ready = Event::Ready(ReadyInfo {
            user: self_name,
            guilds: vec![Guild {
                id: "local".into(),
                name: "console".into(),
            }],
        });
        if tx.send(ready).await.is_err() {
            return;
        }

        let user = Member::new("console", "console");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match parse_line(&line, &user) {
                ConsoleInput::Event(event) => {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
                ConsoleInput::Quit => break,
                ConsoleInput::Unrecognized(reason) => eprintln!("? {reason}"),
            }
        }
    });

    Box::pin(ReceiverStream::new(rx))
}

fn parse_line(line: &str, user: &Member) -> ConsoleInput {
    let trimmed = line.trim_end();
    if trimmed.is_empty() {
        return ConsoleInput::Unrecognized("empty line".into());
    }
    if !trimmed.starts_with('/') {
        return ConsoleInput::Event(Event::MessageReceived(warble_core::Message::new(
            user.clone(),
            ChannelId::new(CONSOLE_CHANNEL),
            trimmed,
        )));
    }

    let mut parts = trimmed.split_whitespace();
    match parts.next() {
        Some("/quit") => ConsoleInput::Quit,
        Some("/join") => match (parts.next(), parts.next()) {
            (Some(id), Some(name)) => {
                ConsoleInput::Event(Event::MemberJoined(Member::new(id, name)))
            }
            _ => ConsoleInput::Unrecognized("usage: /join <id> <name>".into()),
        },
        Some("/voice") => match (parts.next(), parts.next(), parts.next()) {
            (Some(id), Some(from), Some(to)) => ConsoleInput::Event(Event::VoiceStateChanged {
                member: Member::new(id, id),
                before: channel_arg(from),
                after: channel_arg(to),
            }),
            _ => ConsoleInput::Unrecognized("usage: /voice <id> <from|-> <to|->".into()),
        },
        Some("/error") => match parts.next() {
            Some(source) => {
                let detail: String = parts.collect::<Vec<_>>().join(" ");
                match error_source(source) {
                    Some(source) => ConsoleInput::Event(Event::GatewayError { source, detail }),
                    None => ConsoleInput::Unrecognized(format!("unknown error source '{source}'")),
                }
            }
            None => ConsoleInput::Unrecognized("usage: /error <source> [detail]".into()),
        },
        Some(other) => ConsoleInput::Unrecognized(format!("unknown directive '{other}'")),
        None => ConsoleInput::Unrecognized("empty line".into()),
    }
}

/// "-" means no channel on that side of the transition.
fn channel_arg(arg: &str) -> Option<ChannelId> {
    (arg != "-").then(|| ChannelId::new(arg))
}

fn error_source(name: &str) -> Option<ErrorSource> {
    match name {
        "ready" => Some(ErrorSource::Ready),
        "member_joined" => Some(ErrorSource::MemberJoined),
        "voice_state" => Some(ErrorSource::VoiceState),
        "message" => Some(ErrorSource::Message),
        "gateway" => Some(ErrorSource::Gateway),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Member {
        Member::new("console", "console")
    }

    #[test]
    fn test_plain_line_is_a_message() {
        match parse_line("!ping", &user()) {
            ConsoleInput::Event(Event::MessageReceived(msg)) => {
                assert_eq!(msg.body, "!ping");
                assert_eq!(msg.channel, ChannelId::new("console"));
            }
            _ => panic!("expected message event"),
        }
    }

    #[test]
    fn test_voice_directive() {
        match parse_line("/voice m1 - fortnite", &user()) {
            ConsoleInput::Event(Event::VoiceStateChanged { before, after, .. }) => {
                assert_eq!(before, None);
                assert_eq!(after, Some(ChannelId::new("fortnite")));
            }
            _ => panic!("expected voice event"),
        }
    }

    #[test]
    fn test_error_directive() {
        match parse_line("/error gateway connection reset", &user()) {
            ConsoleInput::Event(Event::GatewayError { source, detail }) => {
                assert_eq!(source, ErrorSource::Gateway);
                assert_eq!(detail, "connection reset");
            }
            _ => panic!("expected error event"),
        }
    }

    #[test]
    fn test_quit_and_unknown() {
        assert!(matches!(parse_line("/quit", &user()), ConsoleInput::Quit));
        assert!(matches!(
            parse_line("/nope", &user()),
            ConsoleInput::Unrecognized(_)
        ));
    }
}
