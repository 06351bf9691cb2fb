//! The `check` cycle.
//!
//! One invocation fetches the current status of every tracked line, diffs it
//! against the committed state, publishes one message per change to every
//! channel, and commits the fetched snapshot. Publish failures are recorded in
//! the [`CycleReport`] and never prevent the commit. A pretend run leaves the
//! committed state untouched.

use metro_core::detector::{detect, DetectionPolicy};
use metro_core::error::Result;
use metro_core::formatting::format_event;
use metro_core::models::{ChangeEvent, Line};
use metro_data::source::StatusSource;
use metro_data::store::StateStore;
use tracing::{debug, error, info};

use crate::publishers::{PublishError, Publisher};

// ── Public types ──────────────────────────────────────────────────────────────

/// A message that one channel failed to deliver.
#[derive(Debug)]
pub struct PublishFailure {
    pub line: Line,
    pub channel: String,
    pub text: String,
    pub error: PublishError,
}

/// Outcome of one completed cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Change events, in line declaration order.
    pub events: Vec<ChangeEvent>,
    /// Successful (event, channel) deliveries.
    pub delivered: usize,
    pub failures: Vec<PublishFailure>,
    /// `false` for a pretend run.
    pub committed: bool,
}

impl CycleReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

// ── StatusChecker ─────────────────────────────────────────────────────────────

/// Wires the status source, state store and publishers into a single cycle.
pub struct StatusChecker {
    source: Box<dyn StatusSource>,
    store: Box<dyn StateStore>,
    publishers: Vec<Box<dyn Publisher>>,
    lines: Vec<Line>,
    policy: DetectionPolicy,
    pretend: bool,
}

impl StatusChecker {
    pub fn new(
        source: Box<dyn StatusSource>,
        store: Box<dyn StateStore>,
        publishers: Vec<Box<dyn Publisher>>,
        lines: Vec<Line>,
        policy: DetectionPolicy,
    ) -> Self {
        Self {
            source,
            store,
            publishers,
            lines,
            policy,
            pretend: false,
        }
    }

    /// In pretend mode the cycle runs as usual but the state is not committed,
    /// so the next real run still announces what a pretend run saw.
    pub fn pretend(mut self, pretend: bool) -> Self {
        self.pretend = pretend;
        self
    }

    /// Run one cycle.
    ///
    /// Fetch and load errors abort the cycle before anything is published or
    /// committed. A commit error is returned after publishing has happened.
    pub async fn check(&self) -> Result<CycleReport> {
        let current = self.source.fetch(&self.lines).await?;
        let previous = self.store.load()?;

        if let Some(previous) = &previous {
            let missing = previous.missing(&self.lines);
            if !missing.is_empty() {
                debug!(?missing, "no committed status for some lines");
            }
        }

        let events = detect(previous.as_ref(), &current, self.policy);
        info!(changes = events.len(), "status checked");

        let mut report = CycleReport::default();

        for event in &events {
            let text = format_event(event);
            for publisher in &self.publishers {
                match publisher.publish(&text).await {
                    Ok(()) => report.delivered += 1,
                    Err(e) => {
                        error!(
                            line = %event.line,
                            channel = publisher.name(),
                            text = %text,
                            error = %e,
                            "publish failed"
                        );
                        report.failures.push(PublishFailure {
                            line: event.line,
                            channel: publisher.name().to_string(),
                            text: text.clone(),
                            error: e,
                        });
                    }
                }
            }
        }

        if self.pretend {
            info!("pretend mode, state not committed");
        } else {
            self.store.commit(&current)?;
            report.committed = true;
            debug!(lines = current.len(), "state committed");
        }

        report.events = events;
        Ok(report)
    }
}
