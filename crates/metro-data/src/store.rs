//! Persistence of the last committed [`Snapshot`].
//!
//! The state file is a JSON object keyed by line name:
//!
//! ```json
//! {
//!   "Amarela": { "message": "Circulação normal", "ok": true },
//!   "Vermelha": { "message": "Perturbação na circulação", "ok": false }
//! }
//! ```
//!
//! A missing file is a cold start. Commits replace the file atomically via a
//! sibling `.tmp` file and a rename.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use metro_core::error::{MetroError, Result};
use metro_core::models::{Line, LineStatus, Snapshot};
use tracing::{debug, warn};

// ── StateStore ────────────────────────────────────────────────────────────────

/// Durable home of the last observed snapshot.
pub trait StateStore {
    /// Load the last committed snapshot, or `None` on a cold start.
    fn load(&self) -> Result<Option<Snapshot>>;

    /// Replace the stored snapshot with `snapshot`.
    fn commit(&self, snapshot: &Snapshot) -> Result<()>;
}

// ── JsonStateStore ────────────────────────────────────────────────────────────

/// [`StateStore`] backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp: OsString = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    fn write_error(&self, source: std::io::Error) -> MetroError {
        MetroError::StateWrite {
            path: self.path.clone(),
            source,
        }
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> Result<Option<Snapshot>> {
        debug!(path = %self.path.display(), "loading state");

        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "state file not found, first run?");
                return Ok(None);
            }
            Err(source) => {
                return Err(MetroError::StateRead {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let raw: BTreeMap<String, LineStatus> =
            serde_json::from_str(&content).map_err(|source| MetroError::StateFormat {
                path: self.path.clone(),
                source,
            })?;

        let snapshot: Snapshot = raw
            .into_iter()
            .filter_map(|(name, status)| match name.parse::<Line>() {
                Ok(line) => Some((line, status)),
                Err(_) => {
                    warn!(line = %name, "ignoring unknown line in state file");
                    None
                }
            })
            .collect();

        if snapshot.is_empty() {
            warn!(path = %self.path.display(), "state file holds no known lines");
        }
        debug!(lines = snapshot.len(), "state loaded");
        Ok(Some(snapshot))
    }

    fn commit(&self, snapshot: &Snapshot) -> Result<()> {
        debug!(path = %self.path.display(), lines = snapshot.len(), "saving state");

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.write_error(e))?;
        }

        let json = serde_json::to_string_pretty(snapshot)?;

        let tmp = self.tmp_path();
        std::fs::write(&tmp, json).map_err(|e| self.write_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.write_error(e))?;

        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
