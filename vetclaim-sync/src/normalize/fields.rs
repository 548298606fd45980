//! Field accessors and coercions shared by the normalizers
//!
//! Upstream records come in two layouts: the JSON:API envelope
//! (`{id, type, attributes: {...}}`) and flat records (older payloads and our
//! own canonical output). A [`RecordView`] hides the difference: `Attr`
//! fields are read from `attributes` when it exists and from the record
//! itself otherwise.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};

/// One candidate location for a canonical attribute
///
/// Paths use `.` to descend into nested objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Read from the top-level record
    Top(&'static str),
    /// Read from `attributes`, or the record itself when it is flat
    Attr(&'static str),
}

/// Read-only view over one raw record
#[derive(Debug, Clone, Copy)]
pub struct RecordView<'a> {
    record: &'a Value,
    attrs: &'a Value,
}

impl<'a> RecordView<'a> {
    pub fn new(record: &'a Value) -> Self {
        let attrs = record
            .get("attributes")
            .filter(|a| a.is_object())
            .unwrap_or(record);
        Self { record, attrs }
    }

    /// Value at one location; JSON null counts as absent
    pub fn lookup(&self, field: Field) -> Option<&'a Value> {
        match field {
            Field::Top(path) => walk(self.record, path),
            Field::Attr(path) => walk(self.attrs, path),
        }
    }

    /// First present value among ordered candidates
    pub fn first(&self, candidates: &[Field]) -> Option<&'a Value> {
        candidates.iter().find_map(|f| self.lookup(*f))
    }

    /// First candidate that coerces successfully
    pub fn first_map<T>(
        &self,
        candidates: &[Field],
        coerce: impl Fn(&Value) -> Option<T>,
    ) -> Option<T> {
        candidates
            .iter()
            .filter_map(|f| self.lookup(*f))
            .find_map(coerce)
    }
}

fn walk<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |v, segment| v.get(segment))
        .filter(|v| !v.is_null())
}

/// Affirmative coercion: `true`, `"Yes"` and `"yes"` only
pub fn to_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "Yes" || s == "yes",
        _ => false,
    }
}

pub fn to_string_opt(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Calendar date from `YYYY-MM-DD`, `MM/DD/YYYY` or an RFC 3339 timestamp
pub fn to_date(value: &Value) -> Option<NaiveDate> {
    let s = value.as_str()?.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|d| d.date_naive()))
}

/// UTC instant from RFC 3339, a naive ISO timestamp (assumed UTC) or a bare
/// date (midnight UTC)
pub fn to_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let s = value.as_str()?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn to_array(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

pub fn to_object(value: Option<&Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_bool_truthy_set() {
        for v in [json!(true), json!("Yes"), json!("yes")] {
            assert!(to_bool(Some(&v)), "{} should be true", v);
        }
    }

    #[test]
    fn test_to_bool_falsy_set() {
        for v in [json!(false), json!("No"), json!("no"), json!(null), json!(0), json!(1), json!("YES"), json!("true")] {
            assert!(!to_bool(Some(&v)), "{} should be false", v);
        }
        assert!(!to_bool(None));
    }

    #[test]
    fn test_attr_falls_back_to_flat_record() {
        let enveloped = json!({"id": "1", "attributes": {"status": "PENDING"}});
        let flat = json!({"claimId": "1", "status": "PENDING"});

        assert_eq!(
            RecordView::new(&enveloped).lookup(Field::Attr("status")),
            Some(&json!("PENDING"))
        );
        assert_eq!(
            RecordView::new(&flat).lookup(Field::Attr("status")),
            Some(&json!("PENDING"))
        );
        assert_eq!(RecordView::new(&enveloped).lookup(Field::Top("status")), None);
    }

    #[test]
    fn test_first_skips_null_and_missing() {
        let record = json!({"attributes": {
            "maxEstClaimDate": null,
            "claimPhaseDates": {"maxEstClaimDate": "2025-03-01"},
            "estimatedDecisionDate": "2025-09-09"
        }});
        let view = RecordView::new(&record);
        let found = view.first(&[
            Field::Attr("maxEstClaimDate"),
            Field::Attr("claimPhaseDates.maxEstClaimDate"),
            Field::Attr("estimatedDecisionDate"),
        ]);
        assert_eq!(found, Some(&json!("2025-03-01")));
    }

    #[test]
    fn test_first_map_skips_uncoercible() {
        let record = json!({"phase": "n/a", "step": 4});
        let view = RecordView::new(&record);
        let n = view.first_map(&[Field::Attr("phase"), Field::Attr("step")], to_i64);
        assert_eq!(n, Some(4));
    }

    #[test]
    fn test_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15);
        assert_eq!(to_date(&json!("2024-01-15")), expected);
        assert_eq!(to_date(&json!("01/15/2024")), expected);
        assert_eq!(to_date(&json!("2024-01-15T23:30:00-05:00")), expected);
        assert_eq!(to_date(&json!("soon")), None);
        assert_eq!(to_date(&json!(20240115)), None);
    }

    #[test]
    fn test_timestamp_normalizes_to_utc() {
        let ts = to_timestamp(&json!("2024-01-15T10:00:00-05:00")).unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-15T15:00:00+00:00");
        assert_eq!(to_timestamp(&json!(ts.to_rfc3339())), Some(ts));
        assert!(to_timestamp(&json!("2024-01-15")).is_some());
        assert!(to_timestamp(&json!("garbage")).is_none());
    }

    #[test]
    fn test_numeric_coercions() {
        assert_eq!(to_i64(&json!(70)), Some(70));
        assert_eq!(to_i64(&json!(70.0)), Some(70));
        assert_eq!(to_i64(&json!(" 3 ")), Some(3));
        assert_eq!(to_i64(&json!(2.5)), None);
        assert_eq!(to_string_opt(&json!(5237)), Some("5237".to_string()));
        assert_eq!(to_string_opt(&json!({"a": 1})), None);
    }
}
