//! VA.gov API client
//!
//! Read-only, credentialed by the session cookie from the config. Requests
//! ask for camelCase keys; older deployments ignore the header and answer in
//! snake_case, which the normalizer also accepts.

use super::{check_status, read_json};
use crate::error::ClientError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE};
use serde_json::Value;
use std::time::Duration;
use vetclaim_common::config::UpstreamConfig;

const USER_AGENT: &str = concat!("VetClaimSync/", env!("CARGO_PKG_VERSION"));
const UNAUTHORIZED: &[u16] = &[401, 403];

pub const CLAIMS_PATH: &str = "/v0/benefits_claims";
pub const RATINGS_PATH: &str = "/v0/rated_disabilities";
pub const APPEALS_PATH: &str = "/v0/appeals";

/// VA.gov API client
pub struct UpstreamClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert("X-Key-Inflection", HeaderValue::from_static("camel"));
        if let Some(cookie) = &config.cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| ClientError::Config(format!("invalid cookie: {}", e)))?;
            headers.insert(COOKIE, value);
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, path: &str) -> Result<Value, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "Querying VA.gov API");

        let response = self.http_client.get(&url).send().await?;
        let response = check_status(response, UNAUTHORIZED).await?;
        read_json(response).await
    }

    /// Claim summaries (`data` array of the list endpoint)
    pub async fn claims_list(&self) -> Result<Vec<Value>, ClientError> {
        let body = self.get_json(CLAIMS_PATH).await?;
        data_array(body)
    }

    /// One claim with pipeline detail (`data` object of the detail endpoint)
    pub async fn claim_detail(&self, claim_id: &str) -> Result<Value, ClientError> {
        let body = self
            .get_json(&format!("{}/{}", CLAIMS_PATH, claim_id))
            .await?;
        match body {
            Value::Object(mut map) => match map.remove("data") {
                Some(data @ Value::Object(_)) => Ok(data),
                _ => Err(ClientError::Parse("claim detail without data object".into())),
            },
            _ => Err(ClientError::Parse("claim detail is not an object".into())),
        }
    }

    /// Whole ratings body; the normalizer unwraps the envelope
    pub async fn rated_disabilities(&self) -> Result<Value, ClientError> {
        self.get_json(RATINGS_PATH).await
    }

    pub async fn appeals(&self) -> Result<Vec<Value>, ClientError> {
        let body = self.get_json(APPEALS_PATH).await?;
        data_array(body)
    }
}

fn data_array(body: Value) -> Result<Vec<Value>, ClientError> {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(ClientError::Parse("response without data array".into())),
        },
        Value::Array(items) => Ok(items),
        _ => Err(ClientError::Parse("response is not an object".into())),
    }
}
