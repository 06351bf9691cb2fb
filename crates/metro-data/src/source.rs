//! Download and parsing of the operator's status page.
//!
//! Each line has a table cell `td.linha_<name>` containing a list item with
//! the status text. The list item's parent carries the `semperturbacao` class
//! when the line runs without disruption.

use async_trait::async_trait;
use metro_core::error::{MetroError, Result};
use metro_core::models::{Line, LineStatus, Snapshot};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Class marking a line without disruption.
pub const NO_DISRUPTION_CLASS: &str = "semperturbacao";

// ── StatusSource ──────────────────────────────────────────────────────────────

/// Provider of the current per-line status.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Poll the current status of every line in `lines`.
    ///
    /// The returned snapshot covers every requested line; anything less is an
    /// error so that an incomplete snapshot is never committed.
    async fn fetch(&self, lines: &[Line]) -> Result<Snapshot>;
}

// ── HttpStatusSource ──────────────────────────────────────────────────────────

/// [`StatusSource`] that scrapes the operator's HTML status page.
pub struct HttpStatusSource {
    client: Client,
    url: String,
}

impl HttpStatusSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    fn fetch_error(&self, reason: impl ToString) -> MetroError {
        MetroError::Fetch {
            url: self.url.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch(&self, lines: &[Line]) -> Result<Snapshot> {
        debug!(url = %self.url, "downloading status page");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.fetch_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.fetch_error(format!("HTTP {}", status)));
        }

        let body = response.text().await.map_err(|e| self.fetch_error(e))?;

        debug!(bytes = body.len(), "parsing status page");
        parse_status_page(&body, lines)
    }
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Extract the status of each of `lines` from the status page markup.
///
/// The first `li` inside each line's cell is used. Whitespace runs in the
/// message collapse to single spaces.
pub fn parse_status_page(html: &str, lines: &[Line]) -> Result<Snapshot> {
    let document = Html::parse_document(html);

    lines
        .iter()
        .map(|&line| {
            let status = parse_line(&document, line)?;
            debug!(line = %line, ok = status.is_ok(), text = status.message(), "parsed line status");
            Ok((line, status))
        })
        .collect()
}

fn parse_line(document: &Html, line: Line) -> Result<LineStatus> {
    let css = format!("td.{} li", line.css_class());
    let selector = Selector::parse(&css)
        .map_err(|e| MetroError::Parse(format!("invalid selector {}: {}", css, e)))?;

    let item = document
        .select(&selector)
        .next()
        .ok_or_else(|| MetroError::Parse(format!("no status entry for line {}", line)))?;

    let raw: String = item.text().collect();
    let message = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let ok = item
        .parent()
        .and_then(ElementRef::wrap)
        .map(|parent| parent.value().classes().any(|c| c == NO_DISRUPTION_CLASS))
        .unwrap_or(false);

    LineStatus::new(message, ok)
        .map_err(|_| MetroError::Parse(format!("empty status message for line {}", line)))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
