// ABOUTME: Acceptance tests for the builtin command set, driven through the dispatcher.
// ABOUTME: Covers echo, ping, choice, whois, present, guess (including suspend/resume), and help.

use std::sync::{Arc, Mutex};

use warble::builtin::{
    builtin_registry, ChoiceCommand, EchoCommand, GuessCommand, PingCommand, PresentCommand,
    WhoisCommand,
};
use warble::testing::{message_event, voice_event, RecordingSink};
use warble_core::{
    ArgsMode, BotConfig, CommandRegistry, CommandSpec, Dispatcher, Event, Member, OutboundSink,
    SendTarget, SharedSink,
};

fn config() -> BotConfig {
    BotConfig {
        self_id: "900".into(),
        monitored_channels: vec!["fortnite".into()],
        reply_timeout_secs: 30,
        ..BotConfig::default()
    }
}

fn dispatcher_with(specs: Vec<CommandSpec>, sink: &Arc<RecordingSink>) -> Dispatcher {
    let mut registry = CommandRegistry::new();
    for spec in specs {
        registry.register(spec).unwrap();
    }
    Dispatcher::new(&config(), registry, Arc::clone(sink) as SharedSink)
}

fn harper() -> Member {
    Member::new("m1", "harper")
}

#[tokio::test]
async fn test_echo_emits_trailing_string_verbatim() {
    let sink = RecordingSink::shared();
    let d = dispatcher_with(
        vec![CommandSpec::new(
            "echo",
            "echoes",
            ArgsMode::Trailing,
            Arc::new(EchoCommand),
        )],
        &sink,
    );

    d.dispatch(message_event(&harper(), "general", "!echo hello world"))
        .await;
    assert_eq!(sink.texts(), vec!["hello world"]);
}

#[tokio::test]
async fn test_ping_reports_fixed_latency() {
    let sink = RecordingSink::shared();
    let d = dispatcher_with(
        vec![CommandSpec::new(
            "ping",
            "pings",
            ArgsMode::None,
            Arc::new(PingCommand::with_fixed_latency(42)),
        )],
        &sink,
    );

    d.dispatch(message_event(&harper(), "general", "!ping")).await;
    assert_eq!(sink.texts(), vec!["Pong! 42ms"]);
}

#[tokio::test]
async fn test_choice_with_no_tokens_is_missing_argument() {
    let sink = RecordingSink::shared();
    let d = dispatcher_with(
        vec![CommandSpec::new(
            "choice",
            "chooses",
            ArgsMode::Variadic { min: 1 },
            Arc::new(ChoiceCommand::seeded(1)),
        )],
        &sink,
    );

    d.dispatch(message_event(&harper(), "general", "!choice")).await;
    assert_eq!(sink.texts(), vec!["'choice' needs at least 1 argument(s)"]);
}

#[tokio::test]
async fn test_choice_picks_one_of_the_tokens() {
    let sink = RecordingSink::shared();
    let d = dispatcher_with(
        vec![CommandSpec::new(
            "choice",
            "chooses",
            ArgsMode::Variadic { min: 1 },
            Arc::new(ChoiceCommand::seeded(1)),
        )],
        &sink,
    );

    d.dispatch(message_event(&harper(), "general", "!choice rock paper scissors"))
        .await;
    let picked = sink.last_text().unwrap();
    assert!(["rock", "paper", "scissors"].contains(&picked.as_str()));
}

#[tokio::test]
async fn test_choice_with_one_token_picks_it() {
    let sink = RecordingSink::shared();
    let d = dispatcher_with(
        vec![CommandSpec::new(
            "choice",
            "chooses",
            ArgsMode::Variadic { min: 1 },
            Arc::new(ChoiceCommand::seeded(7)),
        )],
        &sink,
    );

    d.dispatch(message_event(&harper(), "general", "!choice onlyoption"))
        .await;
    assert_eq!(sink.texts(), vec!["onlyoption"]);
}

fn guess_dispatcher(target: i64, sink: &Arc<RecordingSink>) -> Dispatcher {
    dispatcher_with(
        vec![CommandSpec::new(
            "guess",
            "guessing game",
            ArgsMode::None,
            Arc::new(GuessCommand::with_target(target)),
        )],
        sink,
    )
}

#[tokio::test]
async fn test_guess_correct_answer() {
    let sink = RecordingSink::shared();
    let d = guess_dispatcher(7, &sink);
    let m = harper();

    d.dispatch(message_event(&m, "general", "!guess")).await;
    assert_eq!(
        sink.texts(),
        vec!["Guess a number between 1 and 10. You have 30 seconds!"]
    );

    d.dispatch(message_event(&m, "general", "7")).await;
    assert_eq!(sink.last_text().unwrap(), "Correct! It was 7.");
    assert_eq!(d.continuations().pending_count(), 0);
}

#[tokio::test]
async fn test_guess_incorrect_answer() {
    let sink = RecordingSink::shared();
    let d = guess_dispatcher(7, &sink);
    let m = harper();

    d.dispatch(message_event(&m, "general", "!guess")).await;
    d.dispatch(message_event(&m, "general", "3")).await;
    assert_eq!(sink.last_text().unwrap(), "Incorrect, it was 7.");
}

#[tokio::test]
async fn test_guess_ignores_non_numeric_replies() {
    let sink = RecordingSink::shared();
    let d = guess_dispatcher(7, &sink);
    let m = harper();

    d.dispatch(message_event(&m, "general", "!guess")).await;
    d.dispatch(message_event(&m, "general", "banana")).await;

    // Validator rejected it: still pending, no extra output
    assert_eq!(d.continuations().pending_count(), 1);
    assert_eq!(sink.texts().len(), 1);

    d.dispatch(message_event(&m, "general", "7")).await;
    assert_eq!(sink.last_text().unwrap(), "Correct! It was 7.");
}

#[tokio::test]
async fn test_guess_only_resolves_for_the_invoking_author() {
    let sink = RecordingSink::shared();
    let d = guess_dispatcher(7, &sink);
    let m = harper();
    let bystander = Member::new("m2", "quinn");

    d.dispatch(message_event(&m, "general", "!guess")).await;
    d.dispatch(message_event(&bystander, "general", "7")).await;

    // The bystander's integer is ordinary chat, not an answer
    assert_eq!(d.continuations().pending_count(), 1);
    assert_eq!(sink.texts().len(), 1);
}

#[tokio::test]
async fn test_second_guess_while_pending_is_rejected() {
    let sink = RecordingSink::shared();
    let d = guess_dispatcher(7, &sink);
    let m = harper();

    d.dispatch(message_event(&m, "general", "!guess")).await;
    d.dispatch(message_event(&m, "general", "!guess")).await;

    // The validator rejects "!guess" (not an integer), so it routes as a
    // command and hits the already-pending guard.
    assert_eq!(
        sink.last_text().unwrap(),
        "you already have a pending prompt; answer it first or wait for it to expire"
    );
    assert_eq!(d.continuations().pending_count(), 1);
}

/// Fails a set number of sends, then delegates to a recording sink.
struct FlakySink {
    failures_left: Mutex<u32>,
    inner: RecordingSink,
}

impl FlakySink {
    fn failing_once() -> Arc<Self> {
        Arc::new(Self {
            failures_left: Mutex::new(1),
            inner: RecordingSink::new(),
        })
    }
}

#[async_trait::async_trait]
impl OutboundSink for FlakySink {
    async fn send(&self, target: SendTarget, text: &str) -> anyhow::Result<()> {
        {
            let mut left = self.failures_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                anyhow::bail!("outbound send failed");
            }
        }
        self.inner.send(target, text).await
    }
}

#[tokio::test]
async fn test_guess_prompt_send_failure_leaves_nothing_pending() {
    let sink = FlakySink::failing_once();
    let mut registry = CommandRegistry::new();
    registry
        .register(CommandSpec::new(
            "guess",
            "guessing game",
            ArgsMode::None,
            Arc::new(GuessCommand::with_target(7)),
        ))
        .unwrap();
    let d = Dispatcher::new(&config(), registry, Arc::clone(&sink) as SharedSink);
    let m = harper();

    // The prompt send fails: no continuation may be left behind
    d.dispatch(message_event(&m, "general", "!guess")).await;
    assert_eq!(d.continuations().pending_count(), 0);

    // A retry starts a fresh game instead of hitting the pending guard
    d.dispatch(message_event(&m, "general", "!guess")).await;
    assert_eq!(d.continuations().pending_count(), 1);
    assert!(sink
        .inner
        .texts()
        .iter()
        .any(|t| t.starts_with("Guess a number")));
}

#[tokio::test(start_paused = true)]
async fn test_guess_times_out_at_the_default_deadline() {
    let sink = RecordingSink::shared();
    let d = guess_dispatcher(7, &sink);
    let m = harper();

    d.dispatch(message_event(&m, "general", "!guess")).await;

    tokio::time::advance(tokio::time::Duration::from_secs(31)).await;
    d.continuations()
        .expire_due(tokio::time::Instant::now())
        .await;

    assert_eq!(sink.last_text().unwrap(), "Time's up! The number was 7.");
    assert_eq!(d.continuations().pending_count(), 0);

    // A late answer is no longer intercepted
    d.dispatch(message_event(&m, "general", "7")).await;
    assert_eq!(d.continuations().pending_count(), 0);
}

#[tokio::test]
async fn test_whois_resolves_by_name_and_mention() {
    let sink = RecordingSink::shared();
    let d = dispatcher_with(
        vec![CommandSpec::new(
            "whois",
            "who is",
            ArgsMode::MemberLookup,
            Arc::new(WhoisCommand),
        )],
        &sink,
    );
    let m = harper();

    d.dispatch(Event::MemberJoined(m.clone())).await;
    d.dispatch(message_event(&Member::new("m2", "quinn"), "general", "!whois harper"))
        .await;
    assert_eq!(sink.last_text().unwrap(), "harper (id m1)");

    d.dispatch(message_event(&Member::new("m2", "quinn"), "general", "!whois <@m1>"))
        .await;
    assert_eq!(sink.last_text().unwrap(), "harper (id m1)");
}

#[tokio::test]
async fn test_whois_reports_voice_presence() {
    let sink = RecordingSink::shared();
    let d = dispatcher_with(
        vec![CommandSpec::new(
            "whois",
            "who is",
            ArgsMode::MemberLookup,
            Arc::new(WhoisCommand),
        )],
        &sink,
    );
    let m = harper();

    d.dispatch(voice_event(&m, None, Some("fortnite"))).await;
    d.dispatch(message_event(&Member::new("m2", "quinn"), "general", "!whois harper"))
        .await;
    assert_eq!(
        sink.last_text().unwrap(),
        "harper (id m1), currently in #fortnite"
    );
}

#[tokio::test]
async fn test_present_tracks_enter_and_leave() {
    let sink = RecordingSink::shared();
    let d = dispatcher_with(
        vec![CommandSpec::new(
            "present",
            "who is around",
            ArgsMode::Variadic { min: 0 },
            Arc::new(PresentCommand),
        )],
        &sink,
    );
    let m = harper();

    d.dispatch(message_event(&m, "general", "!present")).await;
    assert_eq!(sink.last_text().unwrap(), "Nobody is in #fortnite.");

    d.dispatch(voice_event(&m, None, Some("fortnite"))).await;
    d.dispatch(message_event(&m, "general", "!present fortnite"))
        .await;
    assert_eq!(sink.last_text().unwrap(), "In #fortnite: harper");

    d.dispatch(voice_event(&m, Some("fortnite"), None)).await;
    d.dispatch(message_event(&m, "general", "!present")).await;
    assert_eq!(sink.last_text().unwrap(), "Nobody is in #fortnite.");
}

#[tokio::test]
async fn test_present_rejects_unmonitored_channel() {
    let sink = RecordingSink::shared();
    let d = dispatcher_with(
        vec![CommandSpec::new(
            "present",
            "who is around",
            ArgsMode::Variadic { min: 0 },
            Arc::new(PresentCommand),
        )],
        &sink,
    );

    d.dispatch(message_event(&harper(), "general", "!present afk"))
        .await;
    assert_eq!(sink.last_text().unwrap(), "#afk is not a monitored channel.");
}

#[tokio::test]
async fn test_mention_invocation_routes_like_prefix() {
    let sink = RecordingSink::shared();
    let d = dispatcher_with(
        vec![CommandSpec::new(
            "echo",
            "echoes",
            ArgsMode::Trailing,
            Arc::new(EchoCommand),
        )],
        &sink,
    );

    d.dispatch(message_event(&harper(), "general", "<@900> echo hi there"))
        .await;
    assert_eq!(sink.texts(), vec!["hi there"]);
}

#[tokio::test]
async fn test_help_lists_all_builtins() {
    let sink = RecordingSink::shared();
    let registry = builtin_registry("!").unwrap();
    let d = Dispatcher::new(&config(), registry, Arc::clone(&sink) as SharedSink);

    d.dispatch(message_event(&harper(), "general", "!help")).await;
    let help = sink.last_text().unwrap();
    assert!(help.starts_with("Available commands:"));
    for name in ["echo", "ping", "choice", "whois", "present", "guess", "help"] {
        assert!(help.contains(&format!("!{name}")), "missing {name}");
    }
}

#[tokio::test]
async fn test_unknown_command_reply_names_help() {
    let sink = RecordingSink::shared();
    let registry = builtin_registry("!").unwrap();
    let d = Dispatcher::new(&config(), registry, Arc::clone(&sink) as SharedSink);

    d.dispatch(message_event(&harper(), "general", "!frobnicate"))
        .await;
    assert_eq!(sink.texts(), vec!["Unknown command: frobnicate. Try !help."]);
}
