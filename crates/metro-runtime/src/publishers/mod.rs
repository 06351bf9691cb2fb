//! Outbound delivery of formatted notifications.
//!
//! Every channel implements [`Publisher`]. [`build_publishers`] turns a
//! validated [`BotConfig`] into the ordered list the orchestrator fans out to.

mod dry_run;
mod telegram;
mod twitter;

pub use dry_run::DryRunPublisher;
pub use telegram::TelegramPublisher;
pub use twitter::{TwitterPublisher, DUPLICATE_STATUS_CODE, MAX_DUPLICATE_ATTEMPTS};

use async_trait::async_trait;
use metro_core::error::MetroError;
use metro_core::settings::{BotConfig, Channel};
use reqwest::Client;
use thiserror::Error;

// ── PublishError ──────────────────────────────────────────────────────────────

/// One destination that did not receive a broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationFailure {
    pub destination: String,
    pub reason: String,
}

/// Errors surfaced by a [`Publisher`].
#[derive(Error, Debug)]
pub enum PublishError {
    /// The request never produced an HTTP response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform answered with a structured error.
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    /// The platform answered with a non-success status and no decodable error.
    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// Every attempt at a duplicate-free variant of the message was rejected.
    #[error("post still rejected as duplicate after {attempts} attempts")]
    DuplicateRetriesExhausted { attempts: u32 },

    /// A broadcast reached only some of its destinations.
    #[error(
        "delivery failed for {} of {total} destinations: {}",
        .failures.len(),
        summarize(.failures)
    )]
    Destinations {
        total: usize,
        failures: Vec<DestinationFailure>,
    },
}

impl PublishError {
    /// `true` for the microblogging platform's "status is a duplicate" rejection.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, PublishError::Api { code, .. } if *code == DUPLICATE_STATUS_CODE)
    }
}

fn summarize(failures: &[DestinationFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.destination, f.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Publisher ─────────────────────────────────────────────────────────────────

/// A messaging channel notifications are delivered to.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Channel name used in logs and reports.
    fn name(&self) -> &str;

    /// Check the configured credentials before any cycle work is done.
    async fn verify(&self) -> Result<(), PublishError> {
        Ok(())
    }

    /// Deliver `message`, applying the channel's own recovery rules.
    async fn publish(&self, message: &str) -> Result<(), PublishError>;
}

/// Build the publishers for every enabled channel, in configured order.
///
/// In pretend mode every channel is replaced by a [`DryRunPublisher`].
pub fn build_publishers(
    config: &BotConfig,
    client: &Client,
) -> Result<Vec<Box<dyn Publisher>>, MetroError> {
    config
        .channels
        .iter()
        .map(|&channel| -> Result<Box<dyn Publisher>, MetroError> {
            if config.pretend {
                return Ok(Box::new(DryRunPublisher::new(channel.name())));
            }
            match channel {
                Channel::Twitter => {
                    let twitter = config
                        .twitter
                        .clone()
                        .ok_or(MetroError::MissingSetting("TWITTER_CONSUMER_KEY"))?;
                    Ok(Box::new(TwitterPublisher::new(
                        client.clone(),
                        twitter,
                        config.timezone,
                    )))
                }
                Channel::Telegram => {
                    let telegram = config
                        .telegram
                        .clone()
                        .ok_or(MetroError::MissingSetting("TELEGRAM_TOKEN"))?;
                    Ok(Box::new(TelegramPublisher::new(client.clone(), telegram)))
                }
            }
        })
        .collect()
}

/// Decode a JSON error body with `decode`, falling back to the raw status.
pub(crate) async fn error_from_response<F>(response: reqwest::Response, decode: F) -> PublishError
where
    F: FnOnce(&str) -> Option<(i64, String)>,
{
    let status = response.status().as_u16();
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => return PublishError::Http(e.without_url()),
    };
    match decode(&body) {
        Some((code, message)) => PublishError::Api { code, message },
        None => PublishError::Status { status, body },
    }
}
