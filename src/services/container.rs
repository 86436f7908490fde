//! Service Container - Centralized service access with parallel execution support.
//!
//! Services are built once at startup and shared across requests through
//! `Arc`; none of them hold per-request state.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::{
    AccountManager, AccountService, AuthService, Authenticator, OrderManager, OrderService,
    TokenService,
};
use crate::config::{AuthConfig, Config};
use crate::errors::AppResult;
use crate::infra::{CacheAside, CacheStore, TransactionManager};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Service container trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait ServiceContainer: Send + Sync {
    /// Get authentication service
    fn auth(&self) -> Arc<dyn AuthService>;

    /// Get account service
    fn accounts(&self) -> Arc<dyn AccountService>;

    /// Get order service
    fn orders(&self) -> Arc<dyn OrderService>;
}

/// Settings the services need at construction.
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub auth: AuthConfig,
    pub cache_ttl: Duration,
    pub scope_timeout: Duration,
}

impl From<&Config> for ServiceOptions {
    fn from(config: &Config) -> Self {
        Self {
            auth: config.auth.clone(),
            cache_ttl: config.cache_ttl(),
            scope_timeout: config.scope_timeout(),
        }
    }
}

/// Concrete implementation of ServiceContainer
pub struct Services {
    auth_service: Arc<dyn AuthService>,
    account_service: Arc<dyn AccountService>,
    order_service: Arc<dyn OrderService>,
}

impl Services {
    /// Create a new service container from already built services
    pub fn new(
        auth_service: Arc<dyn AuthService>,
        account_service: Arc<dyn AccountService>,
        order_service: Arc<dyn OrderService>,
    ) -> Self {
        Self {
            auth_service,
            account_service,
            order_service,
        }
    }

    /// Wire every service on top of a transaction manager and optional cache
    pub fn build(
        manager: Arc<dyn TransactionManager>,
        cache: Option<Arc<dyn CacheStore>>,
        options: ServiceOptions,
    ) -> Self {
        let cache_aside = Arc::new(CacheAside::new(cache, options.cache_ttl));
        let tokens = TokenService::new(options.auth);

        Self {
            auth_service: Arc::new(Authenticator::new(manager.clone(), tokens)),
            account_service: Arc::new(AccountManager::new(
                manager.clone(),
                cache_aside,
                options.scope_timeout,
            )),
            order_service: Arc::new(OrderManager::new(manager)),
        }
    }
}

impl ServiceContainer for Services {
    fn auth(&self) -> Arc<dyn AuthService> {
        self.auth_service.clone()
    }

    fn accounts(&self) -> Arc<dyn AccountService> {
        self.account_service.clone()
    }

    fn orders(&self) -> Arc<dyn OrderService> {
        self.order_service.clone()
    }
}

/// Parallel execution utilities for running independent operations concurrently.
pub mod parallel {
    use super::*;
    use tokio::try_join;

    /// Execute two independent async operations in parallel.
    ///
    /// If either operation fails, the error is returned immediately.
    ///
    /// # Example
    /// ```ignore
    /// let (account, orders) = parallel::join2(
    ///     cache.get_account(accounts.as_ref(), id),
    ///     orders.list_by_account(id),
    /// ).await?;
    /// ```
    pub async fn join2<F1, F2, T1, T2>(f1: F1, f2: F2) -> AppResult<(T1, T2)>
    where
        F1: Future<Output = AppResult<T1>>,
        F2: Future<Output = AppResult<T2>>,
    {
        try_join!(f1, f2)
    }
}
