// ABOUTME: Runtime configuration from TOML with environment variable overrides.
// ABOUTME: Supplies the prefix, self identity, monitored channels, greeting, and reply timeout.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use crate::events::ChannelId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Literal invocation prefix (e.g., "!")
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// The bot's own member id, used for self-mention invocation and to
    /// ignore the bot's own messages
    #[serde(default = "default_self_id")]
    pub self_id: String,
    /// Voice channel ids whose membership the presence tracker follows
    #[serde(default)]
    pub monitored_channels: Vec<String>,
    /// Greeting sent to newly joined members; `{name}` is substituted
    #[serde(default = "default_greeting")]
    pub greeting: String,
    /// Deadline for reply continuations, in seconds
    #[serde(default = "default_reply_timeout")]
    pub reply_timeout_secs: u64,
}

fn default_prefix() -> String {
    "!".to_string()
}

fn default_self_id() -> String {
    "warble".to_string()
}

fn default_greeting() -> String {
    "Hi {name}, welcome to the server!".to_string()
}

fn default_reply_timeout() -> u64 {
    30
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            self_id: default_self_id(),
            monitored_channels: Vec::new(),
            greeting: default_greeting(),
            reply_timeout_secs: default_reply_timeout(),
        }
    }
}

impl BotConfig {
    /// Load configuration from a TOML file (if it exists), apply environment
    /// overrides, and validate. A validation failure here is the startup
    /// half of the fatal-error policy: the runtime refuses to start.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Self::from_toml(&content)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Environment variables win over file values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("WARBLE_PREFIX") {
            self.prefix = val;
        }
        if let Ok(val) = std::env::var("WARBLE_SELF_ID") {
            self.self_id = val;
        }
        if let Ok(val) = std::env::var("WARBLE_CHANNELS") {
            self.monitored_channels = val
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Ok(val) = std::env::var("WARBLE_GREETING") {
            self.greeting = val;
        }
        if let Ok(val) = std::env::var("WARBLE_REPLY_TIMEOUT_SECS") {
            match val.parse() {
                Ok(secs) => self.reply_timeout_secs = secs,
                Err(_) => {
                    tracing::warn!(value = %val, "ignoring non-numeric WARBLE_REPLY_TIMEOUT_SECS")
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.prefix.is_empty(), "prefix must not be empty");
        anyhow::ensure!(!self.self_id.is_empty(), "self_id must not be empty");
        anyhow::ensure!(
            self.reply_timeout_secs > 0,
            "reply_timeout_secs must be positive"
        );
        Ok(())
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_secs)
    }

    pub fn monitored(&self) -> Vec<ChannelId> {
        self.monitored_channels
            .iter()
            .map(ChannelId::new)
            .collect()
    }

    /// Apply the `{name}` substitution to the greeting template.
    pub fn greeting_for(&self, name: &str) -> String {
        self.greeting.replace("{name}", name)
    }
}
