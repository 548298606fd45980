//! Fetch, normalize, persist, sync
//!
//! One cycle pulls the upstream, normalizes whatever arrived, writes the
//! legs that succeeded and re-delivers the fresh claims to the backend. A leg
//! that failed keeps its previously cached value.

use crate::auth::AuthSessionManager;
use crate::fetch::{FetchCoordinator, FetchTrigger, RawPayloads};
use crate::insights::basic_insights;
use crate::normalize::{normalize_appeals, normalize_claim, normalize_rating};
use crate::notify::{claims_synced_message, Notifier};
use crate::sync::{SyncCoordinator, SyncOutcome};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vetclaim_common::commands::{FetchSummary, InterceptResult, InterceptedClaim, VaData};
use vetclaim_common::model::{Appeal, ClaimEnvelope, Rating};
use vetclaim_common::store::{flag_enabled, get_value, keys, set_value};
use vetclaim_common::time::Clock;
use vetclaim_common::KeyValueStore;

/// What one trigger did
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// False when the cooldown swallowed the trigger
    pub started: bool,
    /// Store contents after the cycle
    pub snapshot: VaData,
    /// `None` when no delivery was attempted
    pub sync: Option<SyncOutcome>,
}

impl CycleReport {
    pub fn summary(&self) -> FetchSummary {
        FetchSummary {
            started: self.started,
            claims: self.snapshot.claims.len(),
            rating: self.snapshot.rating.is_some(),
            appeals: self.snapshot.appeals.len(),
            synced: self.sync.is_some_and(|outcome| outcome.is_delivered()),
        }
    }
}

pub struct Pipeline {
    fetch: FetchCoordinator,
    sync: Arc<SyncCoordinator>,
    auth: Arc<AuthSessionManager>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
}

impl Pipeline {
    pub fn new(
        fetch: FetchCoordinator,
        sync: Arc<SyncCoordinator>,
        auth: Arc<AuthSessionManager>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            fetch,
            sync,
            auth,
            store,
            clock,
            notifier,
        }
    }

    /// Run one cycle; `force` bypasses the cooldown
    pub async fn run_cycle(&self, force: bool) -> CycleReport {
        let payloads = match self.fetch.trigger(force).await {
            FetchTrigger::Skipped => {
                return CycleReport {
                    started: false,
                    snapshot: self.snapshot().await,
                    sync: None,
                };
            }
            FetchTrigger::Started { payloads, .. } => payloads,
        };

        let fresh_claims = self.persist(payloads).await;

        let sync = match fresh_claims {
            Some(envelopes) if !envelopes.is_empty() => self.sync_fresh(&envelopes).await,
            _ => None,
        };

        CycleReport {
            started: true,
            snapshot: self.snapshot().await,
            sync,
        }
    }

    /// Normalize and write the successful legs; returns the new claim
    /// envelopes when the claims leg succeeded
    async fn persist(&self, payloads: RawPayloads) -> Option<Vec<ClaimEnvelope>> {
        let now = self.clock.now_millis();
        let mut entries = Map::new();

        let envelopes = payloads.claims.map(|raw_claims| {
            raw_claims
                .into_iter()
                .map(|raw| ClaimEnvelope {
                    structured: normalize_claim(&raw),
                    raw,
                    last_updated: now,
                })
                .collect::<Vec<_>>()
        });

        if let Some(envelopes) = &envelopes {
            insert_json(&mut entries, keys::VA_CLAIMS, envelopes);
        }
        if let Some(raw) = &payloads.rating {
            insert_json(&mut entries, keys::VA_RATINGS, &normalize_rating(raw));
        }
        if let Some(raw) = &payloads.appeals {
            insert_json(&mut entries, keys::VA_APPEALS, &normalize_appeals(raw));
        }

        if !entries.is_empty() {
            if let Err(e) = self.store.set(entries).await {
                warn!(error = %e, "Failed to persist fetched data");
            }
        }

        info!(
            claims = envelopes.as_ref().map(Vec::len),
            rating = payloads.rating.is_some(),
            appeals = payloads.appeals.as_ref().map(Vec::len),
            "Fetch cycle stored"
        );
        envelopes
    }

    async fn sync_fresh(&self, envelopes: &[ClaimEnvelope]) -> Option<SyncOutcome> {
        if !flag_enabled(self.store.as_ref(), keys::SYNC_ENABLED).await {
            debug!("Sync disabled, not delivering fetched claims");
            return Some(SyncOutcome::Disabled);
        }

        let session = self.auth.check_status().await;
        let Some(access_token) = session.access_token.filter(|t| !t.is_empty()) else {
            debug!("Not authenticated, not delivering fetched claims");
            return Some(SyncOutcome::NotAuthenticated);
        };

        let outcome = self.sync.sync_envelopes(envelopes, &access_token).await;
        if outcome.is_delivered()
            && flag_enabled(self.store.as_ref(), keys::NOTIFICATIONS_ENABLED).await
        {
            self.notifier
                .notify("Claims synced", &claims_synced_message(envelopes.len()));
        }
        Some(outcome)
    }

    /// Cached state as the command bus reports it
    pub async fn snapshot(&self) -> VaData {
        let all = [
            keys::VA_CLAIMS,
            keys::VA_RATINGS,
            keys::VA_APPEALS,
            keys::VA_LOGGED_IN,
            keys::VA_LAST_FETCH,
            keys::LAST_SYNC,
        ];
        let mut entries = match self.store.get(&all).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Failed to read cached data");
                return VaData::default();
            }
        };

        let claims: Vec<ClaimEnvelope> = take(&mut entries, keys::VA_CLAIMS).unwrap_or_default();
        VaData {
            claims: claims.into_iter().map(|envelope| envelope.structured).collect(),
            rating: take::<Rating>(&mut entries, keys::VA_RATINGS),
            appeals: take::<Vec<Appeal>>(&mut entries, keys::VA_APPEALS).unwrap_or_default(),
            logged_in: take(&mut entries, keys::VA_LOGGED_IN),
            last_fetch: take(&mut entries, keys::VA_LAST_FETCH),
            last_sync: take(&mut entries, keys::LAST_SYNC),
        }
    }

    /// Ingest a claim captured outside the fetch cycle
    ///
    /// The record is upserted into `vaClaims` by claim id and, when a session
    /// exists, delivered through the single-record endpoint. Basic insights
    /// are attached whatever happens.
    pub async fn ingest_intercepted(&self, intercepted: InterceptedClaim) -> InterceptResult {
        let structured = normalize_claim(&intercepted.raw);
        let ai_insights = basic_insights(&structured);
        let envelope = ClaimEnvelope {
            structured,
            raw: intercepted.raw,
            last_updated: self.clock.now_millis(),
        };

        if let Err(e) = self.upsert_claim(envelope.clone()).await {
            warn!(error = %e, "Failed to store intercepted claim");
            return InterceptResult {
                success: false,
                synced: false,
                ai_insights,
            };
        }

        let skipped = InterceptResult {
            success: true,
            synced: false,
            ai_insights: ai_insights.clone(),
        };

        if !flag_enabled(self.store.as_ref(), keys::SYNC_ENABLED).await {
            debug!("Sync disabled, intercepted claim stored only");
            return skipped;
        }
        let session = self.auth.check_status().await;
        let Some(access_token) = session.access_token.filter(|t| !t.is_empty()) else {
            debug!("Not authenticated, intercepted claim stored only");
            return skipped;
        };

        let outcome = self
            .sync
            .sync_single(
                &envelope.structured,
                &envelope.raw,
                &intercepted.data_type,
                &access_token,
            )
            .await;
        let delivered = outcome.is_delivered();
        InterceptResult {
            success: delivered,
            synced: delivered,
            ai_insights,
        }
    }

    async fn upsert_claim(&self, envelope: ClaimEnvelope) -> vetclaim_common::Result<()> {
        let mut cached: Vec<ClaimEnvelope> = get_value(self.store.as_ref(), keys::VA_CLAIMS)
            .await?
            .unwrap_or_default();

        // Without an id the raw payload is the only identity we have
        let same_claim = |existing: &ClaimEnvelope| {
            let id = &envelope.structured.claim_id;
            if id.is_empty() {
                existing.structured.claim_id.is_empty() && existing.raw == envelope.raw
            } else {
                &existing.structured.claim_id == id
            }
        };
        let existing = cached.iter().position(same_claim);
        match existing {
            Some(index) => cached[index] = envelope,
            None => cached.push(envelope),
        }

        set_value(self.store.as_ref(), keys::VA_CLAIMS, &cached).await
    }
}

fn insert_json<T: serde::Serialize>(entries: &mut Map<String, Value>, key: &str, value: &T) {
    match serde_json::to_value(value) {
        Ok(json) => {
            entries.insert(key.to_string(), json);
        }
        Err(e) => warn!(key, error = %e, "Value not serializable, skipping"),
    }
}

/// Remove and decode one entry; undecodable values read as absent
fn take<T: DeserializeOwned>(entries: &mut Map<String, Value>, key: &str) -> Option<T> {
    let value = entries.remove(key)?;
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(key, error = %e, "Cached value has unexpected shape");
            None
        }
    }
}
