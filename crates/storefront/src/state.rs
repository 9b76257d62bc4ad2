//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::{AuthClient, AuthError, BackendClient, BackendError};
use crate::config::StorefrontConfig;
use crate::services::{CatalogService, DashboardService};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("backend client: {0}")]
    Backend(#[from] BackendError),
    #[error("auth client: {0}")]
    Auth(#[from] AuthError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// backend clients, the caching services and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backend: BackendClient,
    auth: AuthClient,
    catalog: CatalogService,
    dashboards: DashboardService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend API URLs cannot be derived from the
    /// configured backend URL.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let backend = BackendClient::new(&config.backend)?;
        let auth = AuthClient::new(&config.backend)?;
        let catalog = CatalogService::new(backend.clone(), config.catalog_cache_ttl);
        let dashboards = DashboardService::new(backend.clone(), catalog.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                auth,
                catalog,
                dashboards,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the backend table client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Get a reference to the backend auth client.
    #[must_use]
    pub fn auth(&self) -> &AuthClient {
        &self.inner.auth
    }

    /// Get a reference to the product catalog.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Get a reference to the dashboard service.
    #[must_use]
    pub fn dashboards(&self) -> &DashboardService {
        &self.inner.dashboards
    }
}
