use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::MetroError;

// ── Line ──────────────────────────────────────────────────────────────────────

/// A metro line tracked by the bot.
///
/// Variant order is the per-line order used for notifications and the state
/// file. The derived `Ord` follows it, so maps keyed by `Line` iterate in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Line {
    Amarela,
    Vermelha,
    Azul,
    Verde,
}

impl Line {
    /// Every known line, in declaration order.
    pub const ALL: [Line; 4] = [Line::Amarela, Line::Vermelha, Line::Azul, Line::Verde];

    /// Display name as it appears in notifications and the state file.
    pub fn name(self) -> &'static str {
        match self {
            Line::Amarela => "Amarela",
            Line::Vermelha => "Vermelha",
            Line::Azul => "Azul",
            Line::Verde => "Verde",
        }
    }

    /// CSS class of the table cell holding this line's status on the
    /// operator's status page (e.g. `linha_amarela`).
    pub fn css_class(self) -> String {
        format!("linha_{}", self.name().to_lowercase())
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Line {
    type Err = MetroError;

    /// Case-insensitive lookup by display name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Line::ALL
            .into_iter()
            .find(|line| line.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| MetroError::UnknownLine(wanted.to_string()))
    }
}

// ── LineStatus ────────────────────────────────────────────────────────────────

/// One line's condition at a single poll instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LineStatusRecord")]
pub struct LineStatus {
    message: String,
    ok: bool,
}

impl LineStatus {
    /// Build a status, trimming surrounding whitespace from `message`.
    ///
    /// Returns [`MetroError::Parse`] when the message is empty after trimming.
    pub fn new(message: impl Into<String>, ok: bool) -> Result<Self, MetroError> {
        let message = message.into();
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return Err(MetroError::Parse("line status message is empty".to_string()));
        }
        Ok(Self {
            message: trimmed.to_string(),
            ok,
        })
    }

    /// Human-readable description published by the operator.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// `true` when the operator reports no disruption.
    pub fn is_ok(&self) -> bool {
        self.ok
    }
}

/// Unvalidated wire shape of [`LineStatus`].
#[derive(Deserialize)]
struct LineStatusRecord {
    message: String,
    ok: bool,
}

impl TryFrom<LineStatusRecord> for LineStatus {
    type Error = MetroError;

    fn try_from(record: LineStatusRecord) -> Result<Self, Self::Error> {
        LineStatus::new(record.message, record.ok)
    }
}

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// Per-line status observed in one poll.
///
/// Built once via [`FromIterator`] and never mutated afterwards. Iteration is
/// in line declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    lines: BTreeMap<Line, LineStatus>,
}

impl Snapshot {
    /// Status recorded for `line`, if the snapshot covers it.
    pub fn get(&self, line: Line) -> Option<&LineStatus> {
        self.lines.get(&line)
    }

    /// Iterate `(line, status)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Line, &LineStatus)> {
        self.lines.iter().map(|(line, status)| (*line, status))
    }

    /// Number of lines covered.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines from `expected` that this snapshot has no status for.
    pub fn missing(&self, expected: &[Line]) -> Vec<Line> {
        expected
            .iter()
            .copied()
            .filter(|line| !self.lines.contains_key(line))
            .collect()
    }
}

impl FromIterator<(Line, LineStatus)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (Line, LineStatus)>>(iter: I) -> Self {
        Self {
            lines: iter.into_iter().collect(),
        }
    }
}

/// Serialised as a JSON object keyed by line display name, in declaration order.
impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.lines.len()))?;
        for (line, status) in &self.lines {
            map.serialize_entry(line.name(), status)?;
        }
        map.end()
    }
}

// ── ChangeEvent ───────────────────────────────────────────────────────────────

/// A line whose status transition is worth notifying about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub line: Line,
    pub status: LineStatus,
}
