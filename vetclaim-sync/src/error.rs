//! Error types for vetclaim-sync
//!
//! Only the HTTP clients return these. The coordinators above them log and
//! convert every failure into an outcome value.

use thiserror::Error;

/// Upstream and backend client errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure: connect, timeout, reset
    #[error("Network error: {0}")]
    Network(String),

    /// 401 (and 403 from the upstream)
    #[error("Unauthorized ({0})")]
    Unauthorized(u16),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Body was not the JSON shape we expected
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Client configuration error: {0}")]
    Config(String),
}

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }

    /// The server answered with a non-success status
    pub fn is_rejection(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_) | ClientError::Api(..))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Parse(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}
