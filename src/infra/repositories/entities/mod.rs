//! SeaORM entity definitions
//!
//! These are database-specific entities separate from domain models.

pub mod account;
pub mod order;

// Re-exports for public API convenience
#[allow(unused_imports)]
pub use account::{ActiveModel as AccountActiveModel, Entity as AccountEntity, Model as AccountModel};
#[allow(unused_imports)]
pub use order::{ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel};
