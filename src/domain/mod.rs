//! Domain layer - Core business entities and logic
//!
//! This module contains the core domain models that represent
//! business concepts independent of infrastructure concerns.

pub mod account;
pub mod order;
pub mod password;

pub use account::{
    Account, AccountChanges, AccountDraft, AccountResponse, AccountWithOrders, NewAccount, Role,
    UpdateAccount,
};
pub use order::{LineItem, NewOrder, Order, OrderDraft, OrderResponse, OrderStatus};
pub use password::Password;
