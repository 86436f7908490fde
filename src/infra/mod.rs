//! Infrastructure layer - External systems integration
//!
//! This module handles all external system concerns:
//! - Database connections, migrations and repositories
//! - Caching (Redis) and the cache-aside read path
//! - Unit of Work for transaction management

pub mod cache;
pub mod cache_aside;
pub mod db;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod repositories;
pub mod unit_of_work;

pub use cache::{Cache, CacheStore};
pub use cache_aside::{CacheAside, CacheLookup, CacheStats, ReadSource};
pub use db::{Database, Migrator};
pub use repositories::{
    AccountRepository, AccountStore, OrderRepository, OrderStore, SqlAccountStore, SqlOrderStore,
};
pub use unit_of_work::{
    run_in_transaction, Persistence, ScopeFuture, ScopeState, ScopedTransaction,
    TransactionManager, UnitOfWork,
};

#[cfg(any(test, feature = "test-utils"))]
pub use cache::MockCacheStore;
#[cfg(any(test, feature = "test-utils"))]
pub use memory::{MemoryCache, MemoryStore, StoreStats};
#[cfg(any(test, feature = "test-utils"))]
pub use repositories::{MockAccountRepository, MockOrderRepository};
