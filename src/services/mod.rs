//! Application services layer - Use cases and business logic.
//!
//! Services orchestrate domain logic and infrastructure to fulfill
//! application use cases. They depend on abstractions (traits) for
//! dependency inversion: repositories and scopes come from a
//! `TransactionManager`, cached reads go through `CacheAside`.

mod account_service;
mod auth_service;
pub mod container;
mod order_service;
mod token_service;
mod validation;

// Service Container
pub use container::{ServiceContainer, ServiceOptions, Services};

// Service traits and implementations
pub use account_service::{AccountManager, AccountService, Registration};
pub use auth_service::{AuthService, Authenticator};
pub use order_service::{OrderManager, OrderService};
pub use token_service::{Claims, TokenResponse, TokenService};

// Parallel execution utilities
pub use container::parallel;

#[cfg(any(test, feature = "test-utils"))]
pub use container::MockServiceContainer;
