//! Remote Fetch Coordinator
//!
//! Pulls the three top-level VA.gov resources concurrently and fans out one
//! detail request per claim. Every request is isolated: a failed leg is
//! logged and reported as `None`, a failed claim detail falls back to that
//! claim's summary record.
//!
//! Automatic triggers are rate limited by a cooldown measured from the start
//! of the previous cycle. Forced (manual) triggers bypass it.

use crate::clients::UpstreamClient;
use crate::error::ClientError;
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use vetclaim_common::store::{keys, set_value};
use vetclaim_common::time::Clock;
use vetclaim_common::KeyValueStore;

/// Cooldown bookkeeping for fetch cycles
pub struct FetchState {
    clock: Arc<dyn Clock>,
    cooldown: Duration,
    last_fetch: Mutex<Option<i64>>,
}

impl FetchState {
    pub fn new(clock: Arc<dyn Clock>, cooldown: Duration, last_fetch: Option<i64>) -> Self {
        Self {
            clock,
            cooldown,
            last_fetch: Mutex::new(last_fetch),
        }
    }

    /// Claim the right to start a cycle
    ///
    /// Returns the cycle start time, or `None` when a non-forced trigger
    /// lands inside the cooldown window. The timestamp moves on start, not
    /// on completion.
    pub async fn try_begin(&self, force: bool) -> Option<i64> {
        let mut last = self.last_fetch.lock().await;
        let now = self.clock.now_millis();

        if !force {
            if let Some(previous) = *last {
                let elapsed = now.saturating_sub(previous);
                if elapsed < self.cooldown.as_millis() as i64 {
                    debug!(elapsed_ms = elapsed, "Fetch trigger ignored (cooldown)");
                    return None;
                }
            }
        }

        *last = Some(now);
        Some(now)
    }

    pub async fn last_fetch(&self) -> Option<i64> {
        *self.last_fetch.lock().await
    }
}

/// Raw results of one cycle; `None` means that leg produced no data
#[derive(Debug, Clone, Default)]
pub struct RawPayloads {
    /// Detail record where available, summary otherwise, in list order
    pub claims: Option<Vec<Value>>,
    pub rating: Option<Value>,
    pub appeals: Option<Vec<Value>>,
}

/// Outcome of a trigger
#[derive(Debug, Clone)]
pub enum FetchTrigger {
    /// Inside the cooldown window; nothing was requested
    Skipped,
    Started { started_at: i64, payloads: RawPayloads },
}

pub struct FetchCoordinator {
    client: Arc<UpstreamClient>,
    store: Arc<dyn KeyValueStore>,
    state: FetchState,
}

impl FetchCoordinator {
    pub fn new(
        client: Arc<UpstreamClient>,
        store: Arc<dyn KeyValueStore>,
        state: FetchState,
    ) -> Self {
        Self {
            client,
            store,
            state,
        }
    }

    /// Run a cycle unless the cooldown says otherwise
    pub async fn trigger(&self, force: bool) -> FetchTrigger {
        let Some(started_at) = self.state.try_begin(force).await else {
            return FetchTrigger::Skipped;
        };

        if let Err(e) = set_value(self.store.as_ref(), keys::VA_LAST_FETCH, &started_at).await {
            warn!(error = %e, "Failed to persist fetch timestamp");
        }

        info!(force, "Starting VA.gov fetch cycle");
        let payloads = self.fetch_all().await;
        FetchTrigger::Started {
            started_at,
            payloads,
        }
    }

    /// Fetch claims, ratings and appeals concurrently; legs fail independently
    pub async fn fetch_all(&self) -> RawPayloads {
        let (claims, rating, appeals) = tokio::join!(
            self.fetch_claims(),
            self.client.rated_disabilities(),
            self.client.appeals(),
        );

        self.record_login_state([
            claims.as_ref().err(),
            rating.as_ref().err(),
            appeals.as_ref().err(),
        ])
        .await;

        RawPayloads {
            claims: leg_result("claims", claims),
            rating: leg_result("ratings", rating),
            appeals: leg_result("appeals", appeals),
        }
    }

    /// Claims list plus per-claim detail, recombined by list index
    pub async fn fetch_claims(&self) -> Result<Vec<Value>, ClientError> {
        let summaries = self.client.claims_list().await?;
        debug!(count = summaries.len(), "Fetched claim summaries");

        let details = summaries.into_iter().map(|summary| async move {
            let Some(id) = claim_id(&summary) else {
                return summary;
            };
            match self.client.claim_detail(&id).await {
                Ok(detail) => detail,
                Err(e) => {
                    warn!(claim_id = %id, error = %e, "Claim detail failed, using summary");
                    summary
                }
            }
        });

        Ok(join_all(details).await)
    }

    /// Upstream 401/403 means the VA.gov session is gone; any success means
    /// it is alive
    async fn record_login_state(&self, errors: [Option<&ClientError>; 3]) {
        let logged_in = if errors.iter().flatten().any(|e| e.is_unauthorized()) {
            false
        } else if errors.iter().any(|e| e.is_none()) {
            true
        } else {
            return;
        };

        if !logged_in {
            warn!("VA.gov session not authorized");
        }
        if let Err(e) = set_value(self.store.as_ref(), keys::VA_LOGGED_IN, &logged_in).await {
            warn!(error = %e, "Failed to persist VA.gov login state");
        }
    }
}

fn leg_result<T>(leg: &str, result: Result<T, ClientError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(leg, error = %e, "Fetch leg failed");
            None
        }
    }
}

fn claim_id(summary: &Value) -> Option<String> {
    match summary.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
