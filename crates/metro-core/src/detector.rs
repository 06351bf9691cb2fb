//! Snapshot diffing.
//!
//! Compares the freshly polled [`Snapshot`] with the last committed one and
//! yields the per-line [`ChangeEvent`]s worth notifying about.

use crate::models::{ChangeEvent, LineStatus, Snapshot};

/// Tunable parts of the detection rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionPolicy {
    /// Emit an event for a line that has no previously committed status.
    ///
    /// When `false` the first observation only establishes a baseline.
    pub notify_on_first_observation: bool,
}

impl Default for DetectionPolicy {
    fn default() -> Self {
        Self {
            notify_on_first_observation: true,
        }
    }
}

/// Return the change events between `previous` and `current`, in line
/// declaration order.
///
/// A line is reported when:
/// - it has no previous status and the policy notifies on first observation, or
/// - its `ok` flag flipped, or
/// - it is still disrupted and the disruption message changed.
///
/// An unchanged ongoing disruption is never re-reported.
pub fn detect(
    previous: Option<&Snapshot>,
    current: &Snapshot,
    policy: DetectionPolicy,
) -> Vec<ChangeEvent> {
    current
        .iter()
        .filter(|(line, status)| match previous.and_then(|p| p.get(*line)) {
            None => policy.notify_on_first_observation,
            Some(last) => is_newsworthy(last, status),
        })
        .map(|(line, status)| ChangeEvent {
            line,
            status: status.clone(),
        })
        .collect()
}

fn is_newsworthy(last: &LineStatus, current: &LineStatus) -> bool {
    current.is_ok() != last.is_ok() || (!current.is_ok() && current.message() != last.message())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Line;

    fn status(message: &str, ok: bool) -> LineStatus {
        LineStatus::new(message, ok).unwrap()
    }

    fn snapshot(entries: &[(Line, &str, bool)]) -> Snapshot {
        entries
            .iter()
            .map(|(line, message, ok)| (*line, status(message, *ok)))
            .collect()
    }

    fn all_normal() -> Snapshot {
        snapshot(&[
            (Line::Amarela, "Circulação normal.", true),
            (Line::Vermelha, "Circulação normal.", true),
            (Line::Azul, "Circulação normal.", true),
            (Line::Verde, "Circulação normal.", true),
        ])
    }

    fn lines(events: &[ChangeEvent]) -> Vec<Line> {
        events.iter().map(|e| e.line).collect()
    }

    // ── bootstrap ─────────────────────────────────────────────────────────────

    #[test]
    fn test_detect_cold_start_emits_every_line_in_order() {
        let events = detect(None, &all_normal(), DetectionPolicy::default());
        assert_eq!(lines(&events), Line::ALL.to_vec());
    }

    #[test]
    fn test_detect_cold_start_suppressed_by_policy() {
        let policy = DetectionPolicy {
            notify_on_first_observation: false,
        };
        assert!(detect(None, &all_normal(), policy).is_empty());
    }

    #[test]
    fn test_detect_newly_configured_line_is_bootstrapped() {
        let previous = snapshot(&[
            (Line::Amarela, "Circulação normal.", true),
            (Line::Vermelha, "Circulação normal.", true),
            (Line::Azul, "Circulação normal.", true),
        ]);
        let events = detect(Some(&previous), &all_normal(), DetectionPolicy::default());
        assert_eq!(lines(&events), vec![Line::Verde]);
    }

    // ── steady state ──────────────────────────────────────────────────────────

    #[test]
    fn test_detect_identical_snapshots_emit_nothing() {
        let s = all_normal();
        assert!(detect(Some(&s), &s, DetectionPolicy::default()).is_empty());
    }

    #[test]
    fn test_detect_ok_message_change_is_ignored() {
        let previous = snapshot(&[(Line::Azul, "Circulação normal.", true)]);
        let current = snapshot(&[(Line::Azul, "Circulação normal", true)]);
        assert!(detect(Some(&previous), &current, DetectionPolicy::default()).is_empty());
    }

    #[test]
    fn test_detect_repeated_disruption_is_idempotent() {
        let disrupted = snapshot(&[(Line::Amarela, "avaria na linha", false)]);
        assert!(detect(Some(&disrupted), &disrupted, DetectionPolicy::default()).is_empty());
    }

    // ── transitions ───────────────────────────────────────────────────────────

    #[test]
    fn test_detect_disruption_starts() {
        let previous = snapshot(&[(Line::Amarela, "Circulação normal.", true)]);
        let current = snapshot(&[(Line::Amarela, "avaria na linha", false)]);

        let events = detect(Some(&previous), &current, DetectionPolicy::default());

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].line, Line::Amarela);
        assert_eq!(events[0].status.message(), "avaria na linha");
        assert!(!events[0].status.is_ok());
    }

    #[test]
    fn test_detect_recovery_with_same_message_still_notifies() {
        let previous = snapshot(&[(Line::Verde, "Circulação normal.", false)]);
        let current = snapshot(&[(Line::Verde, "Circulação normal.", true)]);
        let events = detect(Some(&previous), &current, DetectionPolicy::default());
        assert_eq!(lines(&events), vec![Line::Verde]);
    }

    #[test]
    fn test_detect_disruption_message_changes() {
        let previous = snapshot(&[(Line::Vermelha, "perturbação na circulação", false)]);
        let current = snapshot(&[(Line::Vermelha, "circulação interrompida", false)]);
        let events = detect(Some(&previous), &current, DetectionPolicy::default());
        assert_eq!(lines(&events), vec![Line::Vermelha]);
    }

    #[test]
    fn test_detect_mixed_changes_keep_declaration_order() {
        let previous = all_normal();
        let current = snapshot(&[
            (Line::Amarela, "Circulação normal.", true),
            (Line::Vermelha, "greve", false),
            (Line::Azul, "Circulação normal.", true),
            (Line::Verde, "avaria", false),
        ]);
        let events = detect(Some(&previous), &current, DetectionPolicy::default());
        assert_eq!(lines(&events), vec![Line::Vermelha, Line::Verde]);
    }

    #[test]
    fn test_detect_suppression_policy_does_not_hide_transitions() {
        let policy = DetectionPolicy {
            notify_on_first_observation: false,
        };
        let previous = snapshot(&[(Line::Azul, "Circulação normal.", true)]);
        let current = snapshot(&[
            (Line::Amarela, "avaria", false),
            (Line::Azul, "avaria", false),
        ]);
        let events = detect(Some(&previous), &current, policy);
        assert_eq!(lines(&events), vec![Line::Azul]);
    }
}
