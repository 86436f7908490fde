//! Order domain entity and line items.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{MAX_MONEY_INTEGER_DIGITS, MONEY_SCALE};
use crate::errors::{AppError, AppResult};

/// Check that `value` fits a `numeric(12,2)` column without rounding.
fn check_money(value: Decimal, field: &str) -> AppResult<()> {
    if value.is_sign_negative() {
        return Err(AppError::validation(format!("{} must not be negative", field)));
    }
    if value.normalize().scale() > MONEY_SCALE {
        return Err(AppError::validation(format!(
            "{} must have at most {} decimal places",
            field, MONEY_SCALE
        )));
    }
    let limit = Decimal::from(10_i64.pow(MAX_MONEY_INTEGER_DIGITS));
    if value.abs() >= limit {
        return Err(AppError::validation(format!("{} must be less than {}", field, limit)));
    }
    Ok(())
}

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Shipped,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "shipped" => Ok(OrderStatus::Shipped),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(AppError::validation(format!("Unknown order status '{}'", other))),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A product line on an order. Carried with the order payload, not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: i64,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// Order domain entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub account_id: i64,
    pub amount: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub items: Vec<LineItem>,
}

/// Order input that does not yet know its owning account.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub amount: Decimal,
    pub status: OrderStatus,
    pub items: Vec<LineItem>,
}

impl NewOrder {
    /// Reject money the store cannot hold exactly and empty quantities.
    /// Zero items is valid.
    pub fn validate(&self) -> AppResult<()> {
        check_money(self.amount, "Order amount")?;

        for item in &self.items {
            if item.quantity == 0 {
                return Err(AppError::validation(format!(
                    "Quantity for product {} must be at least 1",
                    item.product_id
                )));
            }
            check_money(
                item.unit_price,
                &format!("Unit price for product {}", item.product_id),
            )?;
        }

        Ok(())
    }

    /// Bind the order to its owner.
    pub fn for_account(self, account_id: i64) -> OrderDraft {
        OrderDraft {
            account_id,
            amount: self.amount,
            status: self.status,
            items: self.items,
        }
    }
}

/// Row to insert; id and creation time come from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub account_id: i64,
    pub amount: Decimal,
    pub status: OrderStatus,
    pub items: Vec<LineItem>,
}

/// Order response returned to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: i64,
    pub account_id: i64,
    pub amount: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub items: Vec<LineItem>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            account_id: order.account_id,
            amount: order.amount,
            status: order.status,
            created_at: order.created_at,
            items: order.items,
        }
    }
}
