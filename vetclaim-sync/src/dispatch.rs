//! Command bus dispatcher
//!
//! One handler per [`Command`] variant, each returning its own response
//! type. Messages that do not parse as a known command get no response.

use crate::auth::AuthSessionManager;
use crate::pipeline::Pipeline;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use vetclaim_common::commands::{
    Ack, AuthStatus, Command, FetchSummary, InterceptResult, InterceptedClaim, Response, VaData,
};

pub struct Dispatcher {
    auth: Arc<AuthSessionManager>,
    pipeline: Arc<Pipeline>,
}

impl Dispatcher {
    pub fn new(auth: Arc<AuthSessionManager>, pipeline: Arc<Pipeline>) -> Self {
        Self { auth, pipeline }
    }

    /// Handle a raw bus message; `None` for unrecognized messages
    pub async fn dispatch(&self, message: Value) -> Option<Response> {
        let command = Command::parse(message)?;
        Some(self.handle(command).await)
    }

    pub async fn handle(&self, command: Command) -> Response {
        debug!(command = command.name(), "Handling command");
        match command {
            Command::RequestAuthStatus => Response::AuthStatus(self.auth_status().await),
            Command::RequestVaData => Response::VaData(self.va_data().await),
            Command::TriggerVaFetch => Response::FetchTriggered(self.trigger_fetch().await),
            Command::AuthTokensReceived {
                access_token,
                refresh_token,
                user_data,
            } => Response::TokensStored(
                self.tokens_received(access_token, refresh_token, user_data)
                    .await,
            ),
            Command::ClaimDataIntercepted { data } => {
                Response::ClaimIntercepted(self.claim_intercepted(data).await)
            }
        }
    }

    async fn auth_status(&self) -> AuthStatus {
        self.auth.check_status().await.into()
    }

    async fn va_data(&self) -> VaData {
        self.pipeline.snapshot().await
    }

    /// Manual trigger: always bypasses the cooldown
    async fn trigger_fetch(&self) -> FetchSummary {
        self.pipeline.run_cycle(true).await.summary()
    }

    async fn tokens_received(
        &self,
        access_token: Option<String>,
        refresh_token: Option<String>,
        user_data: Option<Value>,
    ) -> Ack {
        match self
            .auth
            .store_tokens(access_token, refresh_token, user_data)
            .await
        {
            Ok(()) => Ack { success: true },
            Err(e) => {
                warn!(error = %e, "Failed to store relayed tokens");
                Ack { success: false }
            }
        }
    }

    async fn claim_intercepted(&self, data: InterceptedClaim) -> InterceptResult {
        self.pipeline.ingest_intercepted(data).await
    }
}
