//! Appeals normalization

use super::fields::{
    to_array, to_bool, to_date, to_string_opt, to_timestamp, Field, RecordView,
};
use serde_json::Value;
use vetclaim_common::model::{Appeal, AppealIssue};

use Field::{Attr, Top};

const APPEAL_ID: &[Field] = &[Top("id"), Attr("appealId")];
// Top-level `type` names the decision review lane; attributes.type is the
// appeal subtype and is not used.
const APPEAL_TYPE: &[Field] = &[Top("type")];
const STATUS: &[Field] = &[Attr("status.type"), Attr("status")];
const ACTIVE: &[Field] = &[Attr("active")];
const UPDATED: &[Field] = &[Attr("updated")];
const PROGRAM_AREA: &[Field] = &[Attr("programArea")];
const ISSUES: &[Field] = &[Attr("issues")];
const EVENTS: &[Field] = &[Attr("events")];
const ALERTS: &[Field] = &[Attr("alerts")];

const ISSUE_DESCRIPTION: &[Field] = &[Attr("description")];
const ISSUE_CODE: &[Field] = &[Attr("diagnosticCode")];
const ISSUE_LAST_ACTION: &[Field] = &[Attr("lastAction")];
const ISSUE_DATE: &[Field] = &[Attr("date")];

/// Normalize every object in the list; non-object entries are dropped
pub fn normalize_appeals(raw: &[Value]) -> Vec<Appeal> {
    raw.iter()
        .filter(|r| r.is_object())
        .map(normalize_appeal)
        .collect()
}

pub fn normalize_appeal(raw: &Value) -> Appeal {
    let view = RecordView::new(raw);
    let text = |c: &[Field]| view.first_map(c, to_string_opt);

    Appeal {
        appeal_id: text(APPEAL_ID).unwrap_or_default(),
        appeal_type: text(APPEAL_TYPE),
        status: text(STATUS),
        active: to_bool(view.first(ACTIVE)),
        updated: view.first_map(UPDATED, to_timestamp),
        program_area: text(PROGRAM_AREA),
        issues: to_array(view.first(ISSUES))
            .iter()
            .filter(|i| i.is_object())
            .map(normalize_issue)
            .collect(),
        events: to_array(view.first(EVENTS)),
        alerts: to_array(view.first(ALERTS)),
    }
}

fn normalize_issue(raw: &Value) -> AppealIssue {
    let view = RecordView::new(raw);
    AppealIssue {
        description: view.first_map(ISSUE_DESCRIPTION, to_string_opt),
        diagnostic_code: view.first_map(ISSUE_CODE, to_string_opt),
        last_action: view.first_map(ISSUE_LAST_ACTION, to_string_opt),
        date: view.first_map(ISSUE_DATE, to_date),
    }
}
