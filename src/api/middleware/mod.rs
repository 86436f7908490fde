//! API middleware and the authorization gate.

mod auth;

pub use auth::{auth_middleware, authorize, authorize_owner, AuthResult, CurrentUser};
