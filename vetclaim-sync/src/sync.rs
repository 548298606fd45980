//! Sync Coordinator
//!
//! Delivers normalized claims to the VetClaim backend. One claim goes to the
//! single-record endpoint, two or more go to the batch endpoint, none sends
//! nothing. A 401 triggers one token refresh and one retry with the new
//! token; there is never a third attempt.
//!
//! [`SyncScheduler`] re-delivers the cached snapshot on a fixed interval
//! without touching the upstream.

use crate::auth::AuthSessionManager;
use crate::clients::{BackendClient, BatchSyncRequest, SingleSyncRequest};
use crate::error::ClientError;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vetclaim_common::model::{Claim, ClaimEnvelope};
use vetclaim_common::store::{flag_enabled, get_value, keys, set_value};
use vetclaim_common::time::Clock;
use vetclaim_common::KeyValueStore;

/// Original request plus at most one retry
pub const MAX_ATTEMPTS: u32 = 2;

/// `dataType` sent with claims delivered through the single-record endpoint
pub const BENEFIT_CLAIM: &str = "benefit_claim";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEndpoint {
    Single,
    Batch,
}

/// Result of one delivery; failures are logged, never raised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Zero claims, no request sent
    NothingToSync,
    NotAuthenticated,
    /// `syncEnabled` is false
    Disabled,
    Delivered { endpoint: SyncEndpoint, attempts: u32 },
    /// 401 and the refresh did not produce a new token
    AuthFailed,
    Failed { attempts: u32 },
}

impl SyncOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SyncOutcome::Delivered { .. })
    }
}

enum SyncRequest<'a> {
    Single(SingleSyncRequest<'a>),
    Batch(BatchSyncRequest<'a>),
}

impl SyncRequest<'_> {
    fn endpoint(&self) -> SyncEndpoint {
        match self {
            SyncRequest::Single(_) => SyncEndpoint::Single,
            SyncRequest::Batch(_) => SyncEndpoint::Batch,
        }
    }
}

pub struct SyncCoordinator {
    backend: Arc<BackendClient>,
    auth: Arc<AuthSessionManager>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl SyncCoordinator {
    pub fn new(
        backend: Arc<BackendClient>,
        auth: Arc<AuthSessionManager>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            backend,
            auth,
            store,
            clock,
        }
    }

    /// Pair claims with their raw records by index and deliver them
    ///
    /// A missing raw record is sent as null.
    pub async fn sync_claims(
        &self,
        claims: &[Claim],
        raw_by_index: &[Value],
        access_token: &str,
    ) -> SyncOutcome {
        let envelopes = envelopes(claims, raw_by_index, self.clock.now_millis());
        self.sync_envelopes(&envelopes, access_token).await
    }

    pub async fn sync_envelopes(
        &self,
        envelopes: &[ClaimEnvelope],
        access_token: &str,
    ) -> SyncOutcome {
        match envelopes {
            [] => {
                debug!("No claims to sync");
                SyncOutcome::NothingToSync
            }
            [only] => {
                self.sync_single(&only.structured, &only.raw, BENEFIT_CLAIM, access_token)
                    .await
            }
            many => {
                let request = SyncRequest::Batch(BatchSyncRequest {
                    claims: many,
                    timestamp: self.clock.now_millis(),
                });
                self.deliver(request, access_token).await
            }
        }
    }

    pub async fn sync_single(
        &self,
        claim: &Claim,
        raw: &Value,
        data_type: &str,
        access_token: &str,
    ) -> SyncOutcome {
        let request = SyncRequest::Single(SingleSyncRequest {
            claim_data: claim,
            raw_data: raw,
            data_type,
            timestamp: self.clock.now_millis(),
        });
        self.deliver(request, access_token).await
    }

    /// Periodic path: re-deliver whatever `vaClaims` holds
    pub async fn resync_cached(&self) -> SyncOutcome {
        if !flag_enabled(self.store.as_ref(), keys::SYNC_ENABLED).await {
            debug!("Sync disabled, skipping periodic sync");
            return SyncOutcome::Disabled;
        }

        let session = self.auth.check_status().await;
        let Some(access_token) = session.access_token.filter(|t| !t.is_empty()) else {
            debug!("Not authenticated, skipping periodic sync");
            return SyncOutcome::NotAuthenticated;
        };

        let cached = match get_value::<Vec<ClaimEnvelope>>(self.store.as_ref(), keys::VA_CLAIMS).await
        {
            Ok(cached) => cached.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Cached claims unreadable");
                Vec::new()
            }
        };
        if cached.is_empty() {
            debug!("No cached claims, skipping periodic sync");
            return SyncOutcome::NothingToSync;
        }

        self.sync_envelopes(&cached, &access_token).await
    }

    async fn send(&self, request: &SyncRequest<'_>, access_token: &str) -> Result<(), ClientError> {
        match request {
            SyncRequest::Single(body) => self.backend.post_single(access_token, body).await,
            SyncRequest::Batch(body) => self.backend.post_batch(access_token, body).await,
        }
    }

    async fn deliver(&self, request: SyncRequest<'_>, access_token: &str) -> SyncOutcome {
        let endpoint = request.endpoint();
        let mut token = access_token.to_string();

        for attempt in 1..=MAX_ATTEMPTS {
            match self.send(&request, &token).await {
                Ok(()) => {
                    info!(?endpoint, attempt, "Claims synced to backend");
                    let now = self.clock.now_millis();
                    if let Err(e) = set_value(self.store.as_ref(), keys::LAST_SYNC, &now).await {
                        warn!(error = %e, "Failed to record sync timestamp");
                    }
                    return SyncOutcome::Delivered {
                        endpoint,
                        attempts: attempt,
                    };
                }
                Err(e) if e.is_unauthorized() && attempt < MAX_ATTEMPTS => {
                    debug!(?endpoint, "Sync unauthorized, refreshing token");
                    match self.auth.refresh().await {
                        Some(pair) => token = pair.access_token,
                        None => {
                            warn!(?endpoint, "Token refresh failed, abandoning sync");
                            return SyncOutcome::AuthFailed;
                        }
                    }
                }
                Err(e) => {
                    warn!(?endpoint, attempt, error = %e, "Sync failed");
                    return SyncOutcome::Failed { attempts: attempt };
                }
            }
        }

        SyncOutcome::Failed {
            attempts: MAX_ATTEMPTS,
        }
    }
}

fn envelopes(claims: &[Claim], raw_by_index: &[Value], last_updated: i64) -> Vec<ClaimEnvelope> {
    claims
        .iter()
        .enumerate()
        .map(|(i, claim)| ClaimEnvelope {
            structured: claim.clone(),
            raw: raw_by_index.get(i).cloned().unwrap_or(Value::Null),
            last_updated,
        })
        .collect()
}

/// Owner of the periodic re-sync task
///
/// Starting while running replaces the previous task, so at most one timer
/// exists per scheduler.
pub struct SyncScheduler {
    interval: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SyncScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            handle: Mutex::new(None),
        }
    }

    /// First tick fires one interval after start
    pub fn start(&self, coordinator: Arc<SyncCoordinator>) {
        let interval = self.interval;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let outcome = coordinator.resync_cached().await;
                debug!(?outcome, "Periodic sync finished");
            }
        });

        let mut handle = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = handle.replace(task) {
            previous.abort();
        }
        info!(interval_secs = interval.as_secs(), "Periodic sync started");
    }

    pub fn stop(&self) {
        let mut handle = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = handle.take() {
            task.abort();
            info!("Periodic sync stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
