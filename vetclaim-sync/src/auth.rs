//! Auth Session Manager
//!
//! Owns the backend bearer/refresh token lifecycle. The three session keys
//! (`accessToken`, `refreshToken`, `userData`) are always written or removed
//! together so a stale access token can never outlive its refresh token.

use crate::clients::BackendClient;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vetclaim_common::model::{AuthSession, TokenPair};
use vetclaim_common::store::keys;
use vetclaim_common::{KeyValueStore, Result};

pub struct AuthSessionManager {
    store: Arc<dyn KeyValueStore>,
    backend: Arc<BackendClient>,
}

impl AuthSessionManager {
    pub fn new(store: Arc<dyn KeyValueStore>, backend: Arc<BackendClient>) -> Self {
        Self { store, backend }
    }

    /// Current session as stored; never mutates
    ///
    /// An unreadable store reads as "not authenticated".
    pub async fn check_status(&self) -> AuthSession {
        let mut entries = match self.store.get(&keys::SESSION).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Failed to read auth session");
                return AuthSession::default();
            }
        };

        let mut take_string = |key: &str| match entries.remove(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        };
        let access_token = take_string(keys::ACCESS_TOKEN);
        let refresh_token = take_string(keys::REFRESH_TOKEN);

        AuthSession {
            access_token,
            refresh_token,
            user_data: entries.remove(keys::USER_DATA),
        }
    }

    /// Exchange the stored refresh token for a new pair
    ///
    /// - No refresh token: `None`, no request.
    /// - Backend rejects it: session cleared, `None`.
    /// - Transport or body failure: session untouched, `None`.
    pub async fn refresh(&self) -> Option<TokenPair> {
        let refresh_token = match self.check_status().await.refresh_token {
            Some(token) if !token.is_empty() => token,
            _ => {
                debug!("No refresh token stored, skipping refresh");
                return None;
            }
        };

        match self.backend.refresh(&refresh_token).await {
            Ok(pair) => {
                let mut map = Map::new();
                map.insert(keys::ACCESS_TOKEN.into(), Value::String(pair.access_token.clone()));
                map.insert(keys::REFRESH_TOKEN.into(), Value::String(pair.refresh_token.clone()));
                if let Err(e) = self.store.set(map).await {
                    warn!(error = %e, "Refreshed tokens could not be persisted");
                }
                info!("Backend token refreshed");
                Some(pair)
            }
            Err(e) if e.is_rejection() => {
                warn!(error = %e, "Token refresh rejected, clearing session");
                if let Err(e) = self.clear().await {
                    warn!(error = %e, "Failed to clear session after rejected refresh");
                }
                None
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                None
            }
        }
    }

    /// Token relay ingress: write all three session keys
    ///
    /// Missing values are written as null so no field survives from an
    /// earlier session.
    pub async fn store_tokens(
        &self,
        access_token: Option<String>,
        refresh_token: Option<String>,
        user_data: Option<Value>,
    ) -> Result<()> {
        let mut map = Map::new();
        map.insert(
            keys::ACCESS_TOKEN.into(),
            access_token.map(Value::String).unwrap_or(Value::Null),
        );
        map.insert(
            keys::REFRESH_TOKEN.into(),
            refresh_token.map(Value::String).unwrap_or(Value::Null),
        );
        map.insert(keys::USER_DATA.into(), user_data.unwrap_or(Value::Null));
        self.store.set(map).await?;
        info!("Auth tokens stored");
        Ok(())
    }

    /// Remove the whole session
    pub async fn clear(&self) -> Result<()> {
        self.store.remove(&keys::SESSION).await
    }
}
