pub mod cycle;
mod sse;
pub mod state_machine;

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, watch};

use crate::{
    catalog::{CatalogError, MovieCatalog},
    config::AppConfig,
    dao::{models::CycleEntity, night_store::NightStore},
    error::ServiceError,
};

pub use self::sse::{OperatorSseState, SseHub, SseState};
pub use self::state_machine::{CycleStatus, InvalidAdvance};

/// Cheaply clonable handle to the central application state.
pub type SharedState = Arc<AppState>;

/// Central application state shared by routes, services and the
/// background tasks (storage supervisor and cycle engine).
pub struct AppState {
    config: AppConfig,
    night_store: RwLock<Option<Arc<dyn NightStore>>>,
    catalog: RwLock<Option<Arc<dyn MovieCatalog>>>,
    sse: SseState,
    current_cycle: RwLock<Option<CycleEntity>>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            night_store: RwLock::new(None),
            catalog: RwLock::new(None),
            sse: SseState::new(16, 16),
            current_cycle: RwLock::new(None),
            degraded: degraded_tx,
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn night_store(&self) -> Option<Arc<dyn NightStore>> {
        let guard = self.night_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the current store or fail with a degraded-mode error.
    pub async fn require_night_store(&self) -> Result<Arc<dyn NightStore>, ServiceError> {
        self.night_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn install_night_store(&self, store: Arc<dyn NightStore>) {
        {
            let mut guard = self.night_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_night_store(&self) {
        {
            let mut guard = self.night_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Obtain a handle to the movie catalog provider, if one is configured.
    pub async fn catalog(&self) -> Option<Arc<dyn MovieCatalog>> {
        let guard = self.catalog.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the catalog provider or fail when none is configured.
    pub async fn require_catalog(&self) -> Result<Arc<dyn MovieCatalog>, ServiceError> {
        self.catalog()
            .await
            .ok_or(ServiceError::Catalog(CatalogError::Unconfigured))
    }

    /// Install a movie catalog provider.
    pub async fn install_catalog(&self, catalog: Arc<dyn MovieCatalog>) {
        let mut guard = self.catalog.write().await;
        *guard = Some(catalog);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub(crate) fn update_degraded(&self, value: bool) {
        if self.is_degraded() == value {
            return;
        }

        let _ = self.degraded.send(value);
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        self.sse.public()
    }

    /// Broadcast hub used for the operator SSE stream.
    pub fn operator_sse(&self) -> &SseHub {
        self.sse.operator().hub()
    }

    /// Token guard that ensures a single operator SSE subscriber at a time.
    pub fn operator_token(&self) -> &Mutex<Option<String>> {
        self.sse.operator().token()
    }

    /// Latest cycle snapshot observed by the engine, if any.
    pub async fn current_cycle(&self) -> Option<CycleEntity> {
        let guard = self.current_cycle.read().await;
        guard.clone()
    }

    /// Replace the cached cycle snapshot, returning the previous one.
    pub async fn replace_current_cycle(&self, cycle: CycleEntity) -> Option<CycleEntity> {
        let mut guard = self.current_cycle.write().await;
        guard.replace(cycle)
    }

    /// Drop the cached cycle snapshot, e.g. on day rollover.
    pub async fn clear_current_cycle(&self) {
        let mut guard = self.current_cycle.write().await;
        guard.take();
    }
}
