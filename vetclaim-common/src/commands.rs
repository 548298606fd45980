//! Command bus message types
//!
//! Collaborators talk to the core with JSON messages tagged by `type`.
//! Every command has exactly one response shape; messages whose `type` is not
//! listed here are ignored by the dispatcher.

use crate::model::{Appeal, AuthSession, Claim, Rating};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Read-only session check
    RequestAuthStatus,

    /// Cached snapshot of everything scraped so far
    RequestVaData,

    /// Manual fetch cycle; bypasses the cooldown
    TriggerVaFetch,

    /// Tokens relayed from a web login
    #[serde(rename_all = "camelCase")]
    AuthTokensReceived {
        #[serde(default)]
        access_token: Option<String>,
        #[serde(default)]
        refresh_token: Option<String>,
        #[serde(default)]
        user_data: Option<Value>,
    },

    /// A claim response captured outside the fetch cycle
    ClaimDataIntercepted { data: InterceptedClaim },
}

impl Command {
    /// Parse a bus message, returning `None` for unknown or malformed ones
    pub fn parse(message: Value) -> Option<Command> {
        match serde_json::from_value::<Command>(message) {
            Ok(command) => Some(command),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unrecognized command");
                None
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::RequestAuthStatus => "REQUEST_AUTH_STATUS",
            Command::RequestVaData => "REQUEST_VA_DATA",
            Command::TriggerVaFetch => "TRIGGER_VA_FETCH",
            Command::AuthTokensReceived { .. } => "AUTH_TOKENS_RECEIVED",
            Command::ClaimDataIntercepted { .. } => "CLAIM_DATA_INTERCEPTED",
        }
    }
}

/// Raw claim record captured by the page sniffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptedClaim {
    #[serde(default = "default_data_type")]
    pub data_type: String,
    pub raw: Value,
}

fn default_data_type() -> String {
    "benefit_claim".to_string()
}

/// One response per command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    AuthStatus(AuthStatus),
    VaData(VaData),
    FetchTriggered(FetchSummary),
    TokensStored(Ack),
    ClaimIntercepted(InterceptResult),
}

/// `REQUEST_AUTH_STATUS` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<Value>,
}

impl From<AuthSession> for AuthStatus {
    fn from(session: AuthSession) -> Self {
        if !session.is_authenticated() {
            return AuthStatus {
                authenticated: false,
                access_token: None,
                refresh_token: None,
                user_data: None,
            };
        }
        AuthStatus {
            authenticated: true,
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            user_data: session.user_data,
        }
    }
}

/// `REQUEST_VA_DATA` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaData {
    pub claims: Vec<Claim>,
    pub rating: Option<Rating>,
    pub appeals: Vec<Appeal>,
    pub logged_in: Option<bool>,
    pub last_fetch: Option<i64>,
    pub last_sync: Option<i64>,
}

/// `TRIGGER_VA_FETCH` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchSummary {
    /// False when the trigger fell inside the cooldown window
    pub started: bool,
    pub claims: usize,
    pub rating: bool,
    pub appeals: usize,
    pub synced: bool,
}

/// `AUTH_TOKENS_RECEIVED` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
}

/// `CLAIM_DATA_INTERCEPTED` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptResult {
    pub success: bool,
    pub synced: bool,
    pub ai_insights: BasicInsights,
}

/// Non-AI claim summary shown to users without a backend session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicInsights {
    pub claim_id: String,
    pub status: String,
    pub confidence_score: u8,
    pub timeline: InsightTimeline,
    pub risks: Vec<Risk>,
    pub recommendations: Vec<Recommendation>,
    pub missing_benefits: Vec<Value>,
    pub is_basic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightTimeline {
    pub days_to_decision: u32,
    pub approval_probability: u8,
    pub similar_claims: u32,
    pub key_factors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Risk {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub action: Option<String>,
    pub action_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub impact: Severity,
    pub action: String,
    pub button_text: String,
}
