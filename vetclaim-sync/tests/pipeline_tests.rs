//! End-to-end cycles and the command bus

mod common;

use common::*;
use serde_json::{json, Value};
use std::time::Duration;
use vetclaim_common::commands::{Command, InterceptedClaim, Response};
use vetclaim_common::store::{keys, set_value};
use vetclaim_sync::sync::{SyncEndpoint, SyncOutcome};

const SINGLE: &str = "/v1/va-sync";
const BATCH: &str = "/v1/va-sync/batch";
const REFRESH: &str = "/v1/auth/refresh";

async fn dispatch(h: &Harness, message: Value) -> Option<Value> {
    h.app
        .dispatcher
        .dispatch(message)
        .await
        .map(|response| serde_json::to_value(response).unwrap())
}

#[tokio::test]
async fn test_end_to_end_batch_with_token_refresh() {
    let h = Harness::new().await;
    h.login("access-1", "refresh-1").await;
    script_healthy_upstream(&h.upstream);
    h.backend
        .respond_seq(BATCH, vec![(401, json!({})), (200, json!({"success": true}))]);
    h.backend.respond(
        REFRESH,
        200,
        json!({"accessToken": "access-2", "refreshToken": "refresh-2"}),
    );

    let report = h.app.pipeline.run_cycle(false).await;

    assert_eq!(
        report.sync,
        Some(SyncOutcome::Delivered {
            endpoint: SyncEndpoint::Batch,
            attempts: 2
        })
    );
    assert_eq!(h.backend.hits(REFRESH), 1);

    let attempts = h.backend.requests_to(BATCH);
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[1].bearer(), Some("access-2"));
    let entries = attempts[1].body["claims"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["structured"]["claimId"], "100");
    assert_eq!(entries[1]["structured"]["claimId"], "200");
    assert_eq!(entries[0]["structured"]["phase"], 3);
    assert_eq!(entries[0]["structured"]["documentsNeeded"], true);
    assert_eq!(entries[0]["raw"]["id"], "100");

    // the delivered batch is exactly what the store holds
    let cached = serde_json::to_value(h.cached_claims().await).unwrap();
    assert_eq!(attempts[1].body["claims"], cached);

    assert_eq!(report.snapshot.last_sync, Some(START_MILLIS));
    assert!(report.summary().synced);
    assert_eq!(h.notifier.sent().len(), 1);
    assert_eq!(h.notifier.sent()[0].0, "Claims synced");
}

#[tokio::test]
async fn test_single_fetched_claim_uses_single_endpoint() {
    let h = Harness::new().await;
    h.login("access-1", "refresh-1").await;
    script_healthy_upstream(&h.upstream);
    h.upstream.respond(
        "/v0/benefits_claims",
        200,
        json!({"data": [claim_summary("100", "Claim Received")]}),
    );
    h.backend.respond(SINGLE, 200, json!({}));

    let report = h.app.pipeline.run_cycle(false).await;

    assert!(report.summary().synced);
    assert_eq!(h.backend.hits(SINGLE), 1);
    assert_eq!(h.backend.hits(BATCH), 0);
}

#[tokio::test]
async fn test_cycle_without_session_does_not_sync() {
    let h = Harness::new().await;
    script_healthy_upstream(&h.upstream);

    let report = h.app.pipeline.run_cycle(false).await;

    assert_eq!(report.sync, Some(SyncOutcome::NotAuthenticated));
    assert!(h.backend.requests().is_empty());
    assert_eq!(report.snapshot.claims.len(), 2);
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_empty_claims_list_sends_nothing() {
    let h = Harness::new().await;
    h.login("access-1", "refresh-1").await;
    script_healthy_upstream(&h.upstream);
    h.upstream.respond("/v0/benefits_claims", 200, json!({"data": []}));

    let report = h.app.pipeline.run_cycle(false).await;

    assert!(report.sync.is_none());
    assert!(h.backend.requests().is_empty());
}

#[tokio::test]
async fn test_disabled_sync_flag_stops_delivery() {
    let h = Harness::new().await;
    h.login("access-1", "refresh-1").await;
    script_healthy_upstream(&h.upstream);
    set_value(h.store.as_ref(), keys::SYNC_ENABLED, &false)
        .await
        .unwrap();

    let report = h.app.pipeline.run_cycle(false).await;

    assert_eq!(report.sync, Some(SyncOutcome::Disabled));
    assert!(h.backend.requests().is_empty());
}

#[tokio::test]
async fn test_disabled_notifications_are_silent() {
    let h = Harness::new().await;
    h.login("access-1", "refresh-1").await;
    script_healthy_upstream(&h.upstream);
    h.backend.respond(BATCH, 200, json!({}));
    set_value(h.store.as_ref(), keys::NOTIFICATIONS_ENABLED, &false)
        .await
        .unwrap();

    let report = h.app.pipeline.run_cycle(false).await;

    assert!(report.summary().synced);
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_auth_status_command() {
    let h = Harness::new().await;

    let response = dispatch(&h, json!({"type": "REQUEST_AUTH_STATUS"})).await;
    assert_eq!(response, Some(json!({"authenticated": false})));

    h.login("access-1", "refresh-1").await;
    let response = dispatch(&h, json!({"type": "REQUEST_AUTH_STATUS"}))
        .await
        .unwrap();
    assert_eq!(response["authenticated"], true);
    assert_eq!(response["accessToken"], "access-1");
    assert_eq!(response["refreshToken"], "refresh-1");
    assert_eq!(response["userData"]["email"], "vet@example.com");
}

#[tokio::test]
async fn test_tokens_received_command_writes_session() {
    let h = Harness::new().await;

    let response = dispatch(
        &h,
        json!({
            "type": "AUTH_TOKENS_RECEIVED",
            "accessToken": "relay-access",
            "refreshToken": "relay-refresh",
            "userData": {"id": 7}
        }),
    )
    .await;

    assert_eq!(response, Some(json!({"success": true})));
    assert_eq!(h.stored(keys::ACCESS_TOKEN).await, Some(json!("relay-access")));
    assert_eq!(h.stored(keys::REFRESH_TOKEN).await, Some(json!("relay-refresh")));
    assert_eq!(h.stored(keys::USER_DATA).await, Some(json!({"id": 7})));
}

#[tokio::test]
async fn test_relay_overwrites_all_session_keys() {
    let h = Harness::new().await;
    h.login("access-1", "refresh-1").await;

    dispatch(
        &h,
        json!({"type": "AUTH_TOKENS_RECEIVED", "accessToken": "only-access"}),
    )
    .await;

    let session = h.app.auth.check_status().await;
    assert_eq!(session.access_token.as_deref(), Some("only-access"));
    assert_eq!(session.refresh_token, None);
    assert_eq!(session.user_data, None);
}

#[tokio::test]
async fn test_va_data_command_reads_cache_only() {
    let h = Harness::new().await;
    script_healthy_upstream(&h.upstream);
    h.app.pipeline.run_cycle(false).await;
    let hits = h.upstream.requests().len();

    let response = dispatch(&h, json!({"type": "REQUEST_VA_DATA"}))
        .await
        .unwrap();

    assert_eq!(h.upstream.requests().len(), hits);
    assert_eq!(response["claims"].as_array().unwrap().len(), 2);
    assert_eq!(response["claims"][0]["claimId"], "100");
    assert_eq!(response["rating"]["combinedRating"], 70);
    assert_eq!(response["appeals"][0]["appealId"], "A1");
    assert_eq!(response["loggedIn"], true);
    assert_eq!(response["lastFetch"], START_MILLIS);
    assert_eq!(response["lastSync"], Value::Null);
}

#[tokio::test]
async fn test_trigger_fetch_command_bypasses_cooldown() {
    let h = Harness::new().await;
    script_healthy_upstream(&h.upstream);
    h.app.pipeline.run_cycle(false).await;
    h.clock.advance(Duration::from_secs(2));

    let response = dispatch(&h, json!({"type": "TRIGGER_VA_FETCH"}))
        .await
        .unwrap();

    assert_eq!(
        response,
        json!({"started": true, "claims": 2, "rating": true, "appeals": 1, "synced": false})
    );
    assert_eq!(h.upstream.hits("/v0/benefits_claims"), 2);
}

#[tokio::test]
async fn test_unknown_commands_are_ignored() {
    let h = Harness::new().await;

    assert_eq!(dispatch(&h, json!({"type": "OPEN_POPUP"})).await, None);
    assert_eq!(
        dispatch(&h, json!({"type": "AI_ACTION_TRIGGERED", "data": {"action": "login"}})).await,
        None
    );
    assert_eq!(dispatch(&h, json!({"no": "type"})).await, None);
    assert_eq!(dispatch(&h, json!("REQUEST_AUTH_STATUS")).await, None);
    assert!(h.upstream.requests().is_empty());
    assert!(h.backend.requests().is_empty());
}

#[tokio::test]
async fn test_intercepted_claim_without_session_is_stored() {
    let h = Harness::new().await;

    let response = dispatch(
        &h,
        json!({
            "type": "CLAIM_DATA_INTERCEPTED",
            "data": {"dataType": "benefit_claim", "raw": claim_detail("900", "Review of Evidence")["data"]}
        }),
    )
    .await
    .unwrap();

    assert_eq!(response["success"], true);
    assert_eq!(response["synced"], false);
    assert_eq!(response["aiInsights"]["claimId"], "900");
    assert_eq!(response["aiInsights"]["timeline"]["daysToDecision"], 30);
    assert_eq!(response["aiInsights"]["risks"][0]["title"], "Documents Required");
    assert!(h.backend.requests().is_empty());

    let cached = h.cached_claims().await;
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].structured.phase, Some(4));
}

#[tokio::test]
async fn test_repeated_idless_intercepts_store_one_entry() {
    let h = Harness::new().await;
    let intercept = |phase: &str| {
        json!({
            "type": "CLAIM_DATA_INTERCEPTED",
            "data": {
                "dataType": "benefit_claim",
                "raw": {"attributes": {"latestPhaseType": phase, "claimType": "Compensation"}}
            }
        })
    };

    for _ in 0..3 {
        let response = dispatch(&h, intercept("Gathering of Evidence")).await.unwrap();
        assert_eq!(response["success"], true);
    }
    let cached = h.cached_claims().await;
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].structured.claim_id, "");
    assert_eq!(cached[0].structured.phase, Some(3));

    // A different payload is a different claim
    dispatch(&h, intercept("Claim Received")).await.unwrap();
    assert_eq!(h.cached_claims().await.len(), 2);
}

#[tokio::test]
async fn test_intercepted_claim_is_synced_and_upserted() {
    let h = Harness::new().await;
    h.login("access-1", "refresh-1").await;
    script_healthy_upstream(&h.upstream);
    h.backend.respond(BATCH, 200, json!({}));
    h.backend.respond(SINGLE, 200, json!({}));
    h.app.pipeline.run_cycle(false).await;

    let raw = claim_detail("200", "Complete")["data"].clone();
    let response = h
        .app
        .dispatcher
        .handle(Command::ClaimDataIntercepted {
            data: InterceptedClaim {
                data_type: "claim_detail".into(),
                raw,
            },
        })
        .await;

    let result = match response {
        Response::ClaimIntercepted(result) => result,
        other => panic!("unexpected response {:?}", other),
    };
    assert!(result.success);
    assert!(result.synced);
    assert!(result.ai_insights.is_basic);

    let sent = h.backend.requests_to(SINGLE);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].body["dataType"], "claim_detail");
    assert_eq!(sent[0].body["claimData"]["phase"], 8);

    let cached = h.cached_claims().await;
    assert_eq!(cached.len(), 2);
    assert_eq!(cached[1].structured.claim_id, "200");
    assert_eq!(cached[1].structured.phase, Some(8));
}

#[tokio::test]
async fn test_intercepted_claim_sync_failure_reports_unsuccessful() {
    let h = Harness::new().await;
    h.login("access-1", "refresh-1").await;
    h.backend.respond(SINGLE, 500, json!({}));

    let response = dispatch(
        &h,
        json!({"type": "CLAIM_DATA_INTERCEPTED", "data": {"raw": {"id": "5", "attributes": {}}}}),
    )
    .await
    .unwrap();

    assert_eq!(response["success"], false);
    assert_eq!(response["synced"], false);
    assert_eq!(response["aiInsights"]["isBasic"], true);
    assert_eq!(h.backend.requests_to(SINGLE)[0].body["dataType"], "benefit_claim");
}
