//! HTTP clients for the VA.gov data source and the VetClaim backend

pub mod backend;
pub mod upstream;

pub use backend::{BackendClient, BatchSyncRequest, SingleSyncRequest};
pub use upstream::UpstreamClient;

use crate::error::ClientError;
use serde_json::Value;

/// Status check shared by both clients
///
/// `auth_statuses` lists the codes treated as an authorization failure.
pub(crate) async fn check_status(
    response: reqwest::Response,
    auth_statuses: &[u16],
) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if auth_statuses.contains(&status.as_u16()) {
        return Err(ClientError::Unauthorized(status.as_u16()));
    }

    let error_text = response.text().await.unwrap_or_default();
    Err(ClientError::Api(status.as_u16(), error_text))
}

/// Parse a body as JSON, mapping failures to [`ClientError::Parse`]
pub(crate) async fn read_json(response: reqwest::Response) -> Result<Value, ClientError> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| ClientError::Parse(e.to_string()))
}
