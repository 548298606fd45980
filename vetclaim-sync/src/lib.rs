//! vetclaim-sync library interface
//!
//! Exposes the pipeline components for the binary and integration tests.

pub mod auth;
pub mod clients;
pub mod dispatch;
pub mod error;
pub mod fetch;
pub mod insights;
pub mod normalize;
pub mod notify;
pub mod pipeline;
pub mod sync;

pub use crate::error::ClientError;

use std::sync::Arc;
use vetclaim_common::config::TomlConfig;
use vetclaim_common::store::{get_value, keys};
use vetclaim_common::time::Clock;
use vetclaim_common::KeyValueStore;

use crate::auth::AuthSessionManager;
use crate::clients::{BackendClient, UpstreamClient};
use crate::dispatch::Dispatcher;
use crate::fetch::{FetchCoordinator, FetchState};
use crate::notify::Notifier;
use crate::pipeline::Pipeline;
use crate::sync::{SyncCoordinator, SyncScheduler};

/// Every component, constructed once at startup
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KeyValueStore>,
    pub auth: Arc<AuthSessionManager>,
    pub sync: Arc<SyncCoordinator>,
    pub pipeline: Arc<Pipeline>,
    pub dispatcher: Arc<Dispatcher>,
    pub scheduler: Arc<SyncScheduler>,
}

impl AppState {
    /// Wire clients and coordinators around a store
    ///
    /// The cooldown resumes from the persisted `vaLastFetch`, so restarting
    /// the process does not reset it.
    pub async fn new(
        config: &TomlConfig,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ClientError> {
        let upstream = Arc::new(UpstreamClient::new(&config.upstream)?);
        let backend = Arc::new(BackendClient::new(&config.backend)?);

        let last_fetch = match get_value::<i64>(store.as_ref(), keys::VA_LAST_FETCH).await {
            Ok(last_fetch) => last_fetch,
            Err(e) => {
                tracing::warn!(error = %e, "Stored fetch timestamp unreadable");
                None
            }
        };

        let auth = Arc::new(AuthSessionManager::new(store.clone(), backend.clone()));
        let sync = Arc::new(SyncCoordinator::new(
            backend,
            auth.clone(),
            store.clone(),
            clock.clone(),
        ));
        let fetch = FetchCoordinator::new(
            upstream,
            store.clone(),
            FetchState::new(clock.clone(), config.schedule.fetch_cooldown(), last_fetch),
        );
        let pipeline = Arc::new(Pipeline::new(
            fetch,
            sync.clone(),
            auth.clone(),
            store.clone(),
            clock,
            notifier,
        ));
        let dispatcher = Arc::new(Dispatcher::new(auth.clone(), pipeline.clone()));
        let scheduler = Arc::new(SyncScheduler::new(config.schedule.sync_interval()));

        Ok(Self {
            store,
            auth,
            sync,
            pipeline,
            dispatcher,
            scheduler,
        })
    }

    /// Start the periodic re-sync timer, replacing any running one
    pub fn start_periodic_sync(&self) {
        self.scheduler.start(self.sync.clone());
    }
}
