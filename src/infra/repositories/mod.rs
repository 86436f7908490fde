//! Repository layer - Data access abstraction
//!
//! Repositories provide an abstraction over data persistence. Each
//! repository is generic over the SeaORM connection it runs on, so the
//! same code serves autocommit reads on the pool and writes inside a
//! transaction.

mod account_repository;
pub(crate) mod entities;
mod order_repository;
mod sql;

pub use account_repository::{AccountRepository, AccountStore};
pub use order_repository::{OrderRepository, OrderStore};
pub use sql::{SqlAccountStore, SqlOrderStore};

// Export mocks for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use account_repository::MockAccountRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use order_repository::MockOrderRepository;
