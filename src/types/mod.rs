//! Shared response types.

mod response;

pub use response::{Cached, Created, NoContent};
