//! Application state - Dependency injection container.
//!
//! Provides centralized access to all application services and infrastructure.

use std::sync::Arc;

use crate::infra::{CacheStore, Database};
use crate::services::{AccountService, AuthService, OrderService, ServiceContainer};

/// Application state containing all services.
#[derive(Clone)]
pub struct AppState {
    /// Authentication service
    pub auth_service: Arc<dyn AuthService>,
    /// Account service
    pub account_service: Arc<dyn AccountService>,
    /// Order service
    pub order_service: Arc<dyn OrderService>,
    /// Database handle for health probes (absent when running on another store)
    pub database: Option<Arc<Database>>,
    /// Cache handle for health probes (absent when caching is off)
    pub cache: Option<Arc<dyn CacheStore>>,
}

impl AppState {
    /// Create application state from a service container.
    pub fn from_container(
        container: &dyn ServiceContainer,
        database: Option<Arc<Database>>,
        cache: Option<Arc<dyn CacheStore>>,
    ) -> Self {
        Self {
            auth_service: container.auth(),
            account_service: container.accounts(),
            order_service: container.orders(),
            database,
            cache,
        }
    }
}
