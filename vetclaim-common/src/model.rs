//! Canonical record model
//!
//! These are the stable internal shapes every component reads and writes.
//! Field names serialize in camelCase, which is also the shape the backend
//! expects inside sync payloads.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One benefits claim
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Claim {
    pub claim_id: String,
    pub claim_type: Option<String>,
    pub claim_type_code: Option<String>,
    pub status: Option<String>,
    /// Pipeline stage, always within 1..=8 when present
    pub phase: Option<u8>,
    pub latest_phase_type: Option<String>,
    pub phase_change_date: Option<NaiveDate>,
    pub date_initiated: Option<NaiveDate>,
    pub date_filed: Option<NaiveDate>,
    pub estimated_decision_date: Option<NaiveDate>,
    pub development_letter_sent: bool,
    pub decision_letter_sent: bool,
    pub documents_needed: bool,
    pub waiver_submitted: bool,
    /// Source order, duplicates kept
    pub contentions: Vec<Contention>,
    pub supporting_documents: Vec<Value>,
    pub tracked_items: Vec<Value>,
    pub jurisdiction: Option<String>,
    pub events_timeline: Vec<Value>,
    pub claim_phase_dates: Map<String, Value>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A claimed condition within a claim
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Contention {
    pub name: String,
    pub code: Option<String>,
    pub classification: Option<String>,
    pub status: Option<String>,
}

/// Disability rating summary (at most one per session)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Rating {
    pub combined_rating: Option<i64>,
    pub individual_ratings: Vec<IndividualRating>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndividualRating {
    pub name: Option<String>,
    pub rating: Option<i64>,
    pub diagnostic_code: Option<String>,
    pub effective_date: Option<NaiveDate>,
    #[serde(rename = "static")]
    pub is_static: bool,
}

/// Appeal, higher-level review or supplemental claim
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Appeal {
    pub appeal_id: String,
    #[serde(rename = "type")]
    pub appeal_type: Option<String>,
    pub status: Option<String>,
    pub active: bool,
    pub updated: Option<DateTime<Utc>>,
    pub program_area: Option<String>,
    pub issues: Vec<AppealIssue>,
    pub events: Vec<Value>,
    pub alerts: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppealIssue {
    pub description: Option<String>,
    pub diagnostic_code: Option<String>,
    pub last_action: Option<String>,
    pub date: Option<NaiveDate>,
}

/// Backend session as held in the persistent store
///
/// The three fields are written and cleared together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSession {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user_data: Option<Value>,
}

impl AuthSession {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Access + refresh pair minted by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Normalized claim paired with the raw record it came from
///
/// This is both the `vaClaims` storage shape and the batch sync entry shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimEnvelope {
    pub structured: Claim,
    #[serde(default)]
    pub raw: Value,
    /// Epoch milliseconds when the envelope was produced
    pub last_updated: i64,
}
