//! Account & order service.
//!
//! A small CRUD backend whose interesting part is the coordination layer:
//! a Unit of Work that lets one business operation span the account and
//! order repositories atomically, and a cache-aside read path that keeps
//! Redis an optional accelerator in front of PostgreSQL.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **domain**: Core business entities and logic
//! - **services**: Application use cases and business logic
//! - **infra**: Database, repositories, unit of work, cache
//! - **api**: HTTP handlers, middleware, and routes
//! - **types**: Shared response types
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! # Apply migrations and start the server
//! cargo run -- serve --port 8080
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod services;
pub mod types;

// Re-export commonly used types at crate root
pub use api::AppState;
pub use config::Config;
pub use domain::{Account, Order, Password, Role};
pub use errors::{AppError, AppResult};
pub use infra::{run_in_transaction, TransactionManager, UnitOfWork};
