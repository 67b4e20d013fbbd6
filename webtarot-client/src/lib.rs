//! webtarot-client library - readiness protocol client for the webtarot backend
//!
//! A reading's interpretation is generated asynchronously. This crate learns
//! when it is ready by polling, by a WebSocket completion notice, or both, and
//! reconciles those signals into one state per open reading:
//!
//! - [`api`]: REST routes (readings, interpretations, history, stats, users)
//! - [`fetcher`]: single interpretation lookup behind [`InterpretationSource`]
//! - [`poller`]: interval polling with timeout and cancellation
//! - [`notifier`]: one-shot WebSocket completion watcher
//! - [`reconcile`]: per-view policy and observable [`ViewState`]

use std::sync::Arc;
use tracing::debug;
use webtarot_common::config::ClientConfig;
use webtarot_common::store::{JsonFileStore, KeyValueStore, SavedReadings, UserStore};

pub mod api;
pub mod error;
pub mod fetcher;
pub mod notifier;
pub mod poller;
pub mod reconcile;

pub use api::ApiClient;
pub use error::{ClientError, Result};
pub use fetcher::InterpretationSource;
pub use notifier::PushNotifier;
pub use poller::{poll_interpretation, PollOptions};
pub use reconcile::{ReadingView, ReconcileOptions, Reconciler, ViewEvent, ViewState};

/// Client state shared by the command handlers
#[derive(Clone)]
pub struct ClientState {
    pub config: ClientConfig,
    pub api: Arc<ApiClient>,
    pub saved: SavedReadings,
    pub users: UserStore,
}

impl ClientState {
    /// Open the local store under the configured data directory
    pub fn new(config: ClientConfig) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::in_dir(&config.data_dir));
        Self::with_store(config, store)
    }

    pub fn with_store(config: ClientConfig, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let users = UserStore::new(store.clone());
        let identity = users.identity()?;
        debug!(header = identity.header().0, "Using stored identity");

        let api = ApiClient::new(&config.base_url)?.with_identity(identity);
        Ok(Self {
            config,
            api: Arc::new(api),
            saved: SavedReadings::new(store),
            users,
        })
    }

    /// Re-read the stored identity into the API client (after login/logout)
    pub fn reload_identity(&self) -> Result<()> {
        let identity = self.users.identity()?;
        self.api.set_identity(Some(identity));
        Ok(())
    }

    /// Policy for the configured strategy, with push wired to the current identity
    pub fn reconciler(&self) -> Result<Reconciler> {
        let source: Arc<dyn InterpretationSource> = self.api.clone();
        let reconciler = Reconciler::new(
            source.clone(),
            self.saved.clone(),
            ReconcileOptions::from(&self.config),
        );
        let identity = self.users.identity()?;
        let notifier = PushNotifier::new(source, self.api.base_url(), identity)?;
        Ok(reconciler.with_notifier(notifier))
    }
}
