//! Claim phase resolution

use super::fields::{to_i64, Field, RecordView};

pub const MIN_PHASE: u8 = 1;
pub const MAX_PHASE: u8 = 8;

/// Free-text phase labels, already lowercased with `_` turned into spaces
const PHASE_LABELS: &[(&str, u8)] = &[
    ("claim received", 1),
    ("initial review", 2),
    ("under review", 2),
    ("gathering of evidence", 3),
    ("evidence gathering", 3),
    ("review of evidence", 4),
    ("preparation for decision", 5),
    ("pending decision approval", 6),
    ("preparation for notification", 7),
    ("complete", 8),
    ("completed", 8),
    ("closed", 8),
];

/// Explicit numeric phase candidates
pub(crate) const EXPLICIT_PHASE: &[Field] = &[Field::Attr("phase")];

/// Textual phase label candidates
pub(crate) const PHASE_LABEL: &[Field] = &[
    Field::Attr("claimPhaseDates.latestPhaseType"),
    Field::Attr("latestPhaseType"),
];

/// Look up a label like `"GATHERING_OF_EVIDENCE"` or `"Gathering of Evidence"`
pub fn phase_from_label(label: &str) -> Option<u8> {
    let key = label
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    PHASE_LABELS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, phase)| *phase)
}

fn in_range(n: i64) -> Option<u8> {
    u8::try_from(n)
        .ok()
        .filter(|p| (MIN_PHASE..=MAX_PHASE).contains(p))
}

/// Explicit numeric phase wins; otherwise the first recognizable label
pub fn resolve_phase(view: &RecordView<'_>) -> Option<u8> {
    view.first_map(EXPLICIT_PHASE, |v| to_i64(v).and_then(in_range))
        .or_else(|| {
            view.first_map(PHASE_LABEL, |v| v.as_str().and_then(phase_from_label))
        })
}
