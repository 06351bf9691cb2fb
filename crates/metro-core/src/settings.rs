use chrono_tz::Tz;
use clap::builder::FalseyValueParser;
use clap::{Parser, ValueEnum};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::chunking::MIN_CHUNK_LIMIT;
use crate::detector::DetectionPolicy;
use crate::error::{MetroError, Result};
use crate::models::Line;
use crate::time_utils::{parse_timezone, DEFAULT_TIMEZONE};

/// Operator page listing the current status of every line.
pub const DEFAULT_STATUS_URL: &str = "http://app.metrolisboa.pt/status/estado_Linhas.php";

/// Character limit applied to each post on the microblogging channel.
pub const DEFAULT_TWEET_LIMIT: usize = 270;

pub const DEFAULT_TWITTER_API_BASE: &str = "https://api.twitter.com/1.1";
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

// ── Channel ────────────────────────────────────────────────────────────────────

/// Messaging platforms a notification can be published to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Channel {
    Twitter,
    Telegram,
}

impl Channel {
    pub fn name(self) -> &'static str {
        match self {
            Channel::Twitter => "twitter",
            Channel::Telegram => "telegram",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Settings (CLI + environment) ───────────────────────────────────────────────

/// Metro line status bot
///
/// Every option can also be given through the environment variable shown in
/// `--help`, which is how the bot is normally configured under a scheduler.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "metrobot",
    about = "Polls the metro status page and announces line status changes",
    version
)]
pub struct Settings {
    /// File holding the last observed status of every line
    #[arg(long, env = "BOT_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    /// Status page URL
    #[arg(long, env = "BOT_STATUS_URL", default_value = DEFAULT_STATUS_URL)]
    pub status_url: String,

    /// Timezone used for the [HH:MM] marker on posts
    #[arg(long, env = "BOT_TIMEZONE", default_value = DEFAULT_TIMEZONE)]
    pub timezone: String,

    /// Lines to track (comma separated)
    #[arg(long, env = "BOT_LINES", value_delimiter = ',', default_values_t = Line::ALL.to_vec())]
    pub lines: Vec<Line>,

    /// Channels to publish to, in publishing order (comma separated)
    #[arg(
        long,
        env = "BOT_PUBLISHERS",
        value_enum,
        value_delimiter = ',',
        default_values_t = vec![Channel::Twitter]
    )]
    pub publishers: Vec<Channel>,

    /// Announce a line's status the first time it is observed
    #[arg(
        long,
        env = "BOT_NOTIFY_ON_FIRST_OBSERVATION",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub notify_on_first_observation: bool,

    /// Detect and log changes without sending anything or saving state. Any
    /// value other than false/no/off/0 in the environment enables it
    #[arg(long, env = "BOT_PRETEND", value_parser = FalseyValueParser::new())]
    pub pretend: bool,

    /// Logging level
    #[arg(long, env = "BOT_LOG_LEVEL", default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Enable debug logging. Any value other than false/no/off/0 in the
    /// environment enables it
    #[arg(long, env = "BOT_DEBUG", value_parser = FalseyValueParser::new())]
    pub debug: bool,

    /// Timeout for every HTTP request, in seconds (1-600)
    #[arg(long, env = "BOT_HTTP_TIMEOUT", default_value = "30", value_parser = clap::value_parser!(u64).range(1..=600))]
    pub http_timeout: u64,

    /// Maximum characters per post on Twitter
    #[arg(long, env = "TWITTER_CHAR_LIMIT", default_value_t = DEFAULT_TWEET_LIMIT)]
    pub tweet_limit: usize,

    /// Twitter API base URL
    #[arg(long, env = "TWITTER_API_BASE", default_value = DEFAULT_TWITTER_API_BASE)]
    pub twitter_api_base: String,

    #[arg(long, env = "TWITTER_CONSUMER_KEY", hide_env_values = true)]
    pub twitter_consumer_key: Option<String>,

    #[arg(long, env = "TWITTER_CONSUMER_SECRET", hide_env_values = true)]
    pub twitter_consumer_secret: Option<String>,

    #[arg(long, env = "TWITTER_ACCESS_TOKEN_KEY", hide_env_values = true)]
    pub twitter_access_token_key: Option<String>,

    #[arg(long, env = "TWITTER_ACCESS_TOKEN_SECRET", hide_env_values = true)]
    pub twitter_access_token_secret: Option<String>,

    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_TOKEN", hide_env_values = true)]
    pub telegram_token: Option<String>,

    /// Telegram chat or channel ids to broadcast to (comma separated)
    #[arg(long, env = "TELEGRAM_CHAT_IDS", value_delimiter = ',')]
    pub telegram_chat_ids: Vec<String>,

    /// Telegram Bot API base URL
    #[arg(long, env = "TELEGRAM_API_BASE", default_value = DEFAULT_TELEGRAM_API_BASE)]
    pub telegram_api_base: String,
}

// ── Validated configuration ───────────────────────────────────────────────────

/// OAuth 1.0a user-context credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct TwitterCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token_key: String,
    pub access_token_secret: String,
}

impl fmt::Debug for TwitterCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwitterCredentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("access_token_key", &"<redacted>")
            .field("access_token_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwitterConfig {
    pub credentials: TwitterCredentials,
    pub api_base: String,
    pub char_limit: usize,
}

#[derive(Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_ids: Vec<String>,
    pub api_base: String,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"<redacted>")
            .field("chat_ids", &self.chat_ids)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Everything one check cycle needs, validated.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub state_file: PathBuf,
    pub status_url: String,
    pub timezone: Tz,
    /// Tracked lines, deduplicated, in declaration order.
    pub lines: Vec<Line>,
    pub policy: DetectionPolicy,
    pub pretend: bool,
    pub http_timeout: Duration,
    /// Enabled channels, deduplicated, in publishing order.
    pub channels: Vec<Channel>,
    /// Present whenever Twitter is enabled, unless running in pretend mode.
    pub twitter: Option<TwitterConfig>,
    /// Present whenever Telegram is enabled, unless running in pretend mode.
    pub telegram: Option<TelegramConfig>,
}

impl Settings {
    /// Effective log level after applying `--debug`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }

    /// Validate the raw settings into a [`BotConfig`].
    ///
    /// Credentials are only required for enabled channels, and not at all in
    /// pretend mode. The first missing setting is reported by its environment
    /// variable name.
    pub fn into_config(self) -> Result<BotConfig> {
        let state_file = self
            .state_file
            .ok_or(MetroError::MissingSetting("BOT_STATE_FILE"))?;

        let status_url = self.status_url.trim().to_string();
        if status_url.is_empty() {
            return Err(MetroError::MissingSetting("BOT_STATUS_URL"));
        }

        let timezone = parse_timezone(&self.timezone)?;

        let mut lines = self.lines;
        lines.sort();
        lines.dedup();
        if lines.is_empty() {
            return Err(MetroError::MissingSetting("BOT_LINES"));
        }

        let mut channels: Vec<Channel> = Vec::with_capacity(self.publishers.len());
        for channel in self.publishers {
            if !channels.contains(&channel) {
                channels.push(channel);
            }
        }

        if self.tweet_limit < MIN_CHUNK_LIMIT {
            return Err(MetroError::Config(format!(
                "TWITTER_CHAR_LIMIT must be at least {}, got {}",
                MIN_CHUNK_LIMIT, self.tweet_limit
            )));
        }

        let needs_credentials = !self.pretend;

        let twitter = if needs_credentials && channels.contains(&Channel::Twitter) {
            Some(TwitterConfig {
                credentials: TwitterCredentials {
                    consumer_key: required(self.twitter_consumer_key, "TWITTER_CONSUMER_KEY")?,
                    consumer_secret: required(
                        self.twitter_consumer_secret,
                        "TWITTER_CONSUMER_SECRET",
                    )?,
                    access_token_key: required(
                        self.twitter_access_token_key,
                        "TWITTER_ACCESS_TOKEN_KEY",
                    )?,
                    access_token_secret: required(
                        self.twitter_access_token_secret,
                        "TWITTER_ACCESS_TOKEN_SECRET",
                    )?,
                },
                api_base: self.twitter_api_base.trim_end_matches('/').to_string(),
                char_limit: self.tweet_limit,
            })
        } else {
            None
        };

        let telegram = if needs_credentials && channels.contains(&Channel::Telegram) {
            let chat_ids: Vec<String> = self
                .telegram_chat_ids
                .iter()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect();
            if chat_ids.is_empty() {
                return Err(MetroError::MissingSetting("TELEGRAM_CHAT_IDS"));
            }
            Some(TelegramConfig {
                token: required(self.telegram_token, "TELEGRAM_TOKEN")?,
                chat_ids,
                api_base: self.telegram_api_base.trim_end_matches('/').to_string(),
            })
        } else {
            None
        };

        Ok(BotConfig {
            state_file,
            status_url,
            timezone,
            lines,
            policy: DetectionPolicy {
                notify_on_first_observation: self.notify_on_first_observation,
            },
            pretend: self.pretend,
            http_timeout: Duration::from_secs(self.http_timeout),
            channels,
            twitter,
            telegram,
        })
    }
}

/// Unwrap a non-blank setting or report it as missing.
fn required(value: Option<String>, name: &'static str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(MetroError::MissingSetting(name)),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
