//! VetClaim backend client
//!
//! Every write carries the bearer token and the client-version header. Only
//! 401 is reported as [`ClientError::Unauthorized`]; the sync coordinator
//! uses that to decide on a token refresh.

use super::{check_status, read_json};
use crate::error::ClientError;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use vetclaim_common::config::BackendConfig;
use vetclaim_common::model::{Claim, ClaimEnvelope, TokenPair};

pub const CLIENT_VERSION_HEADER: &str = "X-Client-Version";
pub const SINGLE_SYNC_PATH: &str = "/va-sync";
pub const BATCH_SYNC_PATH: &str = "/va-sync/batch";
pub const REFRESH_PATH: &str = "/auth/refresh";

const UNAUTHORIZED: &[u16] = &[401];

/// `POST /va-sync` body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleSyncRequest<'a> {
    pub claim_data: &'a Claim,
    pub raw_data: &'a Value,
    pub data_type: &'a str,
    pub timestamp: i64,
}

/// `POST /va-sync/batch` body
#[derive(Debug, Clone, Serialize)]
pub struct BatchSyncRequest<'a> {
    pub claims: &'a [ClaimEnvelope],
    pub timestamp: i64,
}

/// VetClaim Services API client
pub struct BackendClient {
    http_client: reqwest::Client,
    base_url: String,
    client_version: String,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_version: config.client_version.clone(),
        })
    }

    async fn post_authorized<B: Serialize + ?Sized>(
        &self,
        path: &str,
        access_token: &str,
        body: &B,
    ) -> Result<(), ClientError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "Posting to VetClaim API");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(access_token)
            .header(CLIENT_VERSION_HEADER, &self.client_version)
            .json(body)
            .send()
            .await?;

        check_status(response, UNAUTHORIZED).await?;
        Ok(())
    }

    pub async fn post_single(
        &self,
        access_token: &str,
        body: &SingleSyncRequest<'_>,
    ) -> Result<(), ClientError> {
        self.post_authorized(SINGLE_SYNC_PATH, access_token, body).await
    }

    pub async fn post_batch(
        &self,
        access_token: &str,
        body: &BatchSyncRequest<'_>,
    ) -> Result<(), ClientError> {
        self.post_authorized(BATCH_SYNC_PATH, access_token, body).await
    }

    /// Exchange a refresh token for a new pair
    ///
    /// The response is either the pair itself or `{data: pair}`.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ClientError> {
        let url = format!("{}{}", self.base_url, REFRESH_PATH);
        tracing::debug!(url = %url, "Refreshing VetClaim token");

        let response = self
            .http_client
            .post(&url)
            .header(CLIENT_VERSION_HEADER, &self.client_version)
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await?;

        let response = check_status(response, UNAUTHORIZED).await?;
        let body = read_json(response).await?;
        parse_token_pair(body)
    }
}

fn parse_token_pair(body: Value) -> Result<TokenPair, ClientError> {
    let payload = match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(data @ Value::Object(_)) => data,
            Some(other) => {
                map.insert("data".into(), other);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    };
    serde_json::from_value(payload).map_err(|e| ClientError::Parse(e.to_string()))
}
