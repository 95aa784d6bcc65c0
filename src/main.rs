// ABOUTME: Main entry point — initializes logging, config, the command table, and the run loop.
// ABOUTME: Drives the dispatcher from the console gateway until the stream ends or a fatal error.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use warble::builtin::builtin_registry;
use warble::console::{console_events, ConsoleSink};
use warble::{BotConfig, Dispatcher};

#[derive(Parser, Debug)]
#[command(name = "warble", about = "Guild chat bot runtime")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Directory for the append-only log file (stderr only if unset)
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Log panics before they take the process down
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC! Bot crashed with the following error:");
        eprintln!("{panic_info}");
    }));

    let args = Args::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    // The appender guard must outlive the runtime or buffered lines are lost
    let _file_guard = match &args.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "warble.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            None
        }
    };

    tracing::info!("Starting warble");

    dotenvy::dotenv().ok();
    let config = BotConfig::load(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;

    tracing::info!(
        prefix = %config.prefix,
        self_id = %config.self_id,
        monitored_channels = config.monitored_channels.len(),
        reply_timeout_secs = config.reply_timeout_secs,
        "Configuration loaded"
    );

    let registry = builtin_registry(&config.prefix).context("failed to build command table")?;
    tracing::info!(commands = registry.len(), "Command table ready");

    let stream = console_events(&config);
    let dispatcher = Dispatcher::new(&config, registry, Arc::new(ConsoleSink));

    tracing::info!("Bot ready - type a command, /quit to exit");
    dispatcher.run(stream).await
}
