//! Shared fixtures: scripted HTTP servers and a fully wired app state

#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use vetclaim_common::config::TomlConfig;
use vetclaim_common::model::ClaimEnvelope;
use vetclaim_common::store::{get_value, keys, MemoryStore};
use vetclaim_common::time::ManualClock;
use vetclaim_common::KeyValueStore;
use vetclaim_sync::notify::RecordingNotifier;
use vetclaim_sync::AppState;

pub const START_MILLIS: i64 = 1_700_000_000_000;

#[derive(Debug, Clone)]
pub struct Canned {
    pub status: u16,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Recorded {
    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }
}

/// Path-scripted HTTP server state
///
/// Each path answers from a queue; the last entry repeats forever.
/// Unscripted paths answer 404.
#[derive(Debug, Default)]
pub struct MockServer {
    routes: Mutex<HashMap<String, VecDeque<Canned>>>,
    requests: Mutex<Vec<Recorded>>,
}

impl MockServer {
    pub fn respond(&self, path: &str, status: u16, body: Value) {
        self.respond_seq(path, vec![(status, body)]);
    }

    pub fn respond_seq(&self, path: &str, responses: Vec<(u16, Value)>) {
        let queue = responses
            .into_iter()
            .map(|(status, body)| Canned { status, body })
            .collect();
        self.routes.lock().unwrap().insert(path.to_string(), queue);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.requests_to(path).len()
    }

    fn next_response(&self, path: &str) -> Canned {
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(path) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Canned {
                status: 404,
                body: json!({"error": "not found"}),
            },
        }
    }
}

async fn handle(
    State(server): State<Arc<MockServer>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    server.requests.lock().unwrap().push(Recorded {
        method,
        path: path.clone(),
        headers,
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    let canned = server.next_response(&path);
    let status = StatusCode::from_u16(canned.status).unwrap();
    (status, Json(canned.body)).into_response()
}

/// Serve on an ephemeral port, returning the base URL
pub async fn spawn(server: Arc<MockServer>) -> String {
    let app = Router::new().fallback(handle).with_state(server);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

pub struct Harness {
    pub upstream: Arc<MockServer>,
    pub backend: Arc<MockServer>,
    pub store: Arc<MemoryStore>,
    pub clock: ManualClock,
    pub notifier: Arc<RecordingNotifier>,
    pub app: AppState,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(customize: impl FnOnce(&mut TomlConfig)) -> Self {
        let upstream = Arc::new(MockServer::default());
        let backend = Arc::new(MockServer::default());

        let mut config = TomlConfig::default();
        config.upstream.base_url = spawn(upstream.clone()).await;
        config.upstream.cookie = Some("vagov_session=abc".into());
        config.upstream.timeout_secs = 5;
        config.backend.base_url = format!("{}/v1", spawn(backend.clone()).await);
        config.backend.client_version = "9.9.9".into();
        config.backend.timeout_secs = 5;
        customize(&mut config);

        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(START_MILLIS);
        let notifier = Arc::new(RecordingNotifier::new());
        let app = AppState::new(
            &config,
            store.clone(),
            Arc::new(clock.clone()),
            notifier.clone(),
        )
        .await
        .unwrap();

        Self {
            upstream,
            backend,
            store,
            clock,
            notifier,
            app,
        }
    }

    pub async fn login(&self, access_token: &str, refresh_token: &str) {
        self.app
            .auth
            .store_tokens(
                Some(access_token.into()),
                Some(refresh_token.into()),
                Some(json!({"email": "vet@example.com"})),
            )
            .await
            .unwrap();
    }

    pub async fn cached_claims(&self) -> Vec<ClaimEnvelope> {
        get_value(self.store.as_ref(), keys::VA_CLAIMS)
            .await
            .unwrap()
            .unwrap_or_default()
    }

    pub async fn stored(&self, key: &str) -> Option<Value> {
        self.store.get(&[key]).await.unwrap().remove(key)
    }
}

pub fn claim_summary(id: &str, phase_label: &str) -> Value {
    json!({
        "id": id,
        "type": "claim",
        "attributes": {
            "claimType": "Compensation",
            "status": "EVIDENCE_GATHERING_REVIEW_DECISION",
            "claimPhaseDates": {"latestPhaseType": phase_label}
        }
    })
}

pub fn claim_detail(id: &str, phase_label: &str) -> Value {
    json!({
        "data": {
            "id": id,
            "type": "claim",
            "attributes": {
                "claimType": "Compensation",
                "claimPhaseDates": {
                    "latestPhaseType": phase_label,
                    "phaseChangeDate": "2024-03-01"
                },
                "attentionNeeded": "Yes",
                "contentions": [{"name": "Tinnitus", "diagnosticCode": "6260"}],
                "trackedItems": [{"id": 1, "displayName": "DBQ"}]
            }
        }
    })
}

pub fn rating_body() -> Value {
    json!({
        "data": {
            "attributes": {
                "combinedDisabilityRating": 70,
                "individualRatings": [
                    {"name": "Tinnitus", "rating": 10, "diagnosticCode": "6260", "static": true}
                ]
            }
        }
    })
}

pub fn appeals_body() -> Value {
    json!({
        "data": [{
            "id": "A1",
            "type": "legacyAppeal",
            "attributes": {
                "status": {"type": "pending_soc"},
                "active": true,
                "programArea": "compensation"
            }
        }]
    })
}

/// Upstream answering every endpoint with two healthy claims
pub fn script_healthy_upstream(upstream: &MockServer) {
    upstream.respond(
        "/v0/benefits_claims",
        200,
        json!({"data": [claim_summary("100", "Claim Received"), claim_summary("200", "CLAIM_RECEIVED")]}),
    );
    upstream.respond("/v0/benefits_claims/100", 200, claim_detail("100", "Gathering of Evidence"));
    upstream.respond("/v0/benefits_claims/200", 200, claim_detail("200", "preparation_for_decision"));
    upstream.respond("/v0/rated_disabilities", 200, rating_body());
    upstream.respond("/v0/appeals", 200, appeals_body());
}
