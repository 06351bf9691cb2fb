//! Length-limited microblogging channel.
//!
//! Messages are split into `[HH:MM]`-prefixed chunks posted one after the
//! other. A "duplicate status" rejection is recovered by appending a full stop
//! to the original message and re-running the chunk-and-post sequence, at most
//! [`MAX_DUPLICATE_ATTEMPTS`] times in total.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Tz;
use metro_core::chunking::chunk_message;
use metro_core::settings::TwitterConfig;
use metro_core::time_utils::timestamp_marker;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{error_from_response, PublishError, Publisher};
use crate::oauth;

/// Error code the platform uses for "Status is a duplicate."
pub const DUPLICATE_STATUS_CODE: i64 = 187;

/// Total attempts (first try included) before a duplicate rejection is final.
pub const MAX_DUPLICATE_ATTEMPTS: u32 = 5;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    code: i64,
    #[serde(default)]
    message: String,
}

/// First `{code, message}` of a Twitter error document.
fn decode_error(body: &str) -> Option<(i64, String)> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let first = parsed.errors.into_iter().next()?;
    Some((first.code, first.message))
}

// ── TwitterPublisher ──────────────────────────────────────────────────────────

pub struct TwitterPublisher {
    client: Client,
    config: TwitterConfig,
    timezone: Tz,
}

impl TwitterPublisher {
    pub fn new(client: Client, config: TwitterConfig, timezone: Tz) -> Self {
        Self {
            client,
            config,
            timezone,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base, path)
    }

    /// Post every chunk of `text` in order, skipping chunks already posted
    /// earlier in the same logical publish.
    async fn post_chunks(
        &self,
        text: &str,
        prefix: &str,
        posted: &mut HashSet<String>,
    ) -> Result<(), PublishError> {
        let chunks = chunk_message(text, prefix, self.config.char_limit);
        let total = chunks.len();

        for (index, chunk) in chunks.into_iter().enumerate() {
            if posted.contains(&chunk) {
                debug!(part = index + 1, total, "chunk already posted, skipping");
                continue;
            }
            debug!(part = index + 1, total, chars = chunk.chars().count(), "posting chunk");
            self.post_update(&chunk).await?;
            posted.insert(chunk);
        }

        Ok(())
    }

    async fn post_update(&self, status: &str) -> Result<(), PublishError> {
        let url = self.endpoint("statuses/update.json");
        let params = [("status", status)];
        let authorization =
            oauth::authorization_header(&self.config.credentials, "POST", &url, &params);

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(oauth::form_encode(&params))
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }
        Err(error_from_response(response, decode_error).await)
    }
}

#[async_trait]
impl Publisher for TwitterPublisher {
    fn name(&self) -> &str {
        "twitter"
    }

    async fn verify(&self) -> Result<(), PublishError> {
        let url = self.endpoint("account/verify_credentials.json");
        let authorization = oauth::authorization_header(&self.config.credentials, "GET", &url, &[]);

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, authorization)
            .send()
            .await?;

        if response.status().is_success() {
            debug!("twitter credentials verified");
            return Ok(());
        }
        Err(error_from_response(response, decode_error).await)
    }

    async fn publish(&self, message: &str) -> Result<(), PublishError> {
        info!(channel = "twitter", text = message, "publishing");

        let prefix = timestamp_marker(Utc::now(), self.timezone);
        let mut text = message.to_string();
        let mut posted = HashSet::new();

        for attempt in 1..=MAX_DUPLICATE_ATTEMPTS {
            match self.post_chunks(&text, &prefix, &mut posted).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_duplicate() => {
                    warn!(attempt, "rejected as duplicate, retrying with an extra full stop");
                    text.push('.');
                }
                Err(e) => return Err(e),
            }
        }

        Err(PublishError::DuplicateRetriesExhausted {
            attempts: MAX_DUPLICATE_ATTEMPTS,
        })
    }
}
