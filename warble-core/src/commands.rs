// ABOUTME: Invocation grammar for chat commands — prefix-literal and self-mention markers.
// ABOUTME: Parses message bodies into Command {name, raw_args, tokens} or NotACommand.

/// A recognized command invocation, before spec lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command name (case-sensitive, without the invocation marker)
    pub name: String,
    /// Everything after the name and one whitespace, verbatim
    pub raw_args: String,
    /// The raw argument string split on whitespace
    pub tokens: Vec<String>,
}

impl Command {
    pub fn new(name: impl Into<String>, raw_args: impl Into<String>) -> Self {
        let raw_args = raw_args.into();
        let tokens = raw_args.split_whitespace().map(str::to_string).collect();
        Self {
            name: name.into(),
            raw_args,
            tokens,
        }
    }

    /// Get a token by index
    pub fn token(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(|s| s.as_str())
    }
}

/// Result of matching a message body against the invocation grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult {
    /// The body matched an invocation marker and names a command
    Invocation(Command),
    /// Ordinary chat: no marker matched. Always a silent no-op.
    NotACommand,
}

impl ParseResult {
    pub fn is_invocation(&self) -> bool {
        matches!(self, ParseResult::Invocation(_))
    }

    pub fn as_invocation(&self) -> Option<&Command> {
        match self {
            ParseResult::Invocation(cmd) => Some(cmd),
            ParseResult::NotACommand => None,
        }
    }
}

/// Parse a message body against the two invocation markers.
///
/// # Arguments
/// * `body` - The message body
/// * `prefix` - The literal command prefix (e.g., "!")
/// * `self_id` - The bot's own member id, for mention-style invocation
///
/// # Command Recognition
/// * `<prefix><name>[ <args>]` - literal prefix, e.g. `!echo hi`
/// * `<@self_id> <name>[ <args>]` - mention of the bot followed by
///   whitespace (the `<@!id>` nickname-mention form is accepted too)
///
/// Name matching is case-sensitive and exact; whether the name is known is
/// the router's concern, not the grammar's. Anything that matches neither
/// marker (including empty input, a bare marker, or a body with leading
/// whitespace before the marker) is `NotACommand`.
///
/// The body is matched as delivered: a marker must be the very first thing
/// in the message, and trailing whitespace survives into `raw_args`.
pub fn parse_message(body: &str, prefix: &str, self_id: &str) -> ParseResult {
    // Mention marker: "<@id> name args" or "<@!id> name args"
    for mention in [format!("<@{self_id}>"), format!("<@!{self_id}>")] {
        if let Some(rest) = body.strip_prefix(&mention) {
            // A mention alone, or with no whitespace after it, is chat
            if rest.starts_with(char::is_whitespace) {
                return parse_invocation(rest.trim_start());
            }
            return ParseResult::NotACommand;
        }
    }

    // Literal prefix marker: "!name args"
    if !prefix.is_empty() {
        if let Some(rest) = body.strip_prefix(prefix) {
            return parse_invocation(rest);
        }
    }

    ParseResult::NotACommand
}

/// Split marker-stripped text into command name and verbatim remainder.
fn parse_invocation(text: &str) -> ParseResult {
    if text.is_empty() || text.starts_with(char::is_whitespace) {
        // Bare marker, or whitespace between marker and name
        return ParseResult::NotACommand;
    }

    match text.split_once(char::is_whitespace) {
        Some((name, raw_args)) => ParseResult::Invocation(Command::new(name, raw_args)),
        None => ParseResult::Invocation(Command::new(text, "")),
    }
}
