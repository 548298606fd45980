//! Claim normalization

use super::fields::{
    to_array, to_bool, to_date, to_object, to_string_opt, to_timestamp, Field, RecordView,
};
use super::phase::{resolve_phase, PHASE_LABEL};
use serde_json::Value;
use vetclaim_common::model::{Claim, Contention};

use Field::{Attr, Top};

// Candidate lists, first present value wins.
const CLAIM_ID: &[Field] = &[Top("id"), Attr("claimId")];
const CLAIM_TYPE: &[Field] = &[Attr("claimType")];
const CLAIM_TYPE_CODE: &[Field] = &[Attr("claimTypeCode")];
const STATUS: &[Field] = &[Attr("status")];
const PHASE_CHANGE_DATE: &[Field] = &[
    Attr("claimPhaseDates.phaseChangeDate"),
    Attr("phaseChangeDate"),
];
const DATE_INITIATED: &[Field] = &[Attr("claimDate"), Attr("dateInitiated")];
const DATE_FILED: &[Field] = &[Attr("dateFiled")];
const ESTIMATED_DECISION_DATE: &[Field] = &[
    Attr("maxEstClaimDate"),
    Attr("claimPhaseDates.maxEstClaimDate"),
    Attr("estimatedDecisionDate"),
];
const DEVELOPMENT_LETTER_SENT: &[Field] = &[Attr("developmentLetterSent")];
const DECISION_LETTER_SENT: &[Field] = &[Attr("decisionLetterSent")];
const DOCUMENTS_NEEDED: &[Field] = &[Attr("documentsNeeded"), Attr("attentionNeeded")];
const WAIVER_SUBMITTED: &[Field] = &[
    Attr("waiverSubmitted"),
    Attr("evidenceWaiverSubmitted5103"),
];
const CONTENTIONS: &[Field] = &[Attr("contentions")];
const SUPPORTING_DOCUMENTS: &[Field] = &[Attr("supportingDocuments")];
const TRACKED_ITEMS: &[Field] = &[Attr("trackedItems")];
const JURISDICTION: &[Field] = &[Attr("jurisdiction"), Attr("tempJurisdiction")];
const EVENTS_TIMELINE: &[Field] = &[Attr("eventsTimeline")];
const CLAIM_PHASE_DATES: &[Field] = &[Attr("claimPhaseDates")];
const UPDATED_AT: &[Field] = &[Attr("updatedAt")];
const CREATED_AT: &[Field] = &[Attr("createdAt")];

const CONTENTION_NAME: &[Field] = &[Attr("name")];
const CONTENTION_CODE: &[Field] = &[Attr("code"), Attr("diagnosticCode")];
const CONTENTION_CLASSIFICATION: &[Field] =
    &[Attr("classification"), Attr("classificationType")];
const CONTENTION_STATUS: &[Field] = &[Attr("status")];

/// Map any known claim shape (summary, detail, legacy flat, or an already
/// canonical claim) onto [`Claim`]
pub fn normalize_claim(raw: &Value) -> Claim {
    let view = RecordView::new(raw);

    if let Some(mut claim) = as_canonical(raw) {
        claim.phase = resolve_phase(&view);
        return claim;
    }

    let text = |candidates: &[Field]| view.first_map(candidates, to_string_opt);

    Claim {
        claim_id: text(CLAIM_ID).unwrap_or_default(),
        claim_type: text(CLAIM_TYPE),
        claim_type_code: text(CLAIM_TYPE_CODE),
        status: text(STATUS),
        phase: resolve_phase(&view),
        latest_phase_type: text(PHASE_LABEL),
        phase_change_date: view.first_map(PHASE_CHANGE_DATE, to_date),
        date_initiated: view.first_map(DATE_INITIATED, to_date),
        date_filed: view.first_map(DATE_FILED, to_date),
        estimated_decision_date: view.first_map(ESTIMATED_DECISION_DATE, to_date),
        development_letter_sent: to_bool(view.first(DEVELOPMENT_LETTER_SENT)),
        decision_letter_sent: to_bool(view.first(DECISION_LETTER_SENT)),
        documents_needed: to_bool(view.first(DOCUMENTS_NEEDED)),
        waiver_submitted: to_bool(view.first(WAIVER_SUBMITTED)),
        contentions: normalize_contentions(view.first(CONTENTIONS)),
        supporting_documents: to_array(view.first(SUPPORTING_DOCUMENTS)),
        tracked_items: to_array(view.first(TRACKED_ITEMS)),
        jurisdiction: text(JURISDICTION),
        events_timeline: to_array(view.first(EVENTS_TIMELINE)),
        claim_phase_dates: to_object(view.first(CLAIM_PHASE_DATES)),
        updated_at: view.first_map(UPDATED_AT, to_timestamp),
        created_at: view.first_map(CREATED_AT, to_timestamp),
    }
}

/// Records we produced ourselves carry `claimId` flat at the top level and
/// serialize back to exactly the same value. Reading them field-for-field
/// keeps normalization idempotent even when the pass-through
/// `claimPhaseDates` disagrees with a top-level value.
///
/// Legacy flat records also lead with `claimId` and often deserialize through
/// the defaulted fields, so a typed read alone is not proof of canonical
/// shape.
fn as_canonical(raw: &Value) -> Option<Claim> {
    if raw.get("attributes").is_some() || raw.get("claimId").is_none() {
        return None;
    }
    let claim: Claim = serde_json::from_value(raw.clone()).ok()?;
    let reserialized = serde_json::to_value(&claim).ok()?;
    (&reserialized == raw).then_some(claim)
}

/// Accepts plain condition names or structured contention objects
fn normalize_contentions(value: Option<&Value>) -> Vec<Contention> {
    to_array(value)
        .iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(Contention {
                name: name.clone(),
                ..Default::default()
            }),
            Value::Object(_) => {
                let view = RecordView::new(item);
                let text = |c: &[Field]| view.first_map(c, to_string_opt);
                Some(Contention {
                    name: text(CONTENTION_NAME).unwrap_or_default(),
                    code: text(CONTENTION_CODE),
                    classification: text(CONTENTION_CLASSIFICATION),
                    status: text(CONTENTION_STATUS),
                })
            }
            _ => None,
        })
        .collect()
}
