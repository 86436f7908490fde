//! Order service - order lookups.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::Order;
use crate::errors::{AppResult, OptionExt};
use crate::infra::TransactionManager;

/// Order service trait for dependency injection.
#[async_trait]
pub trait OrderService: Send + Sync {
    async fn get_order(&self, id: i64) -> AppResult<Order>;
}

/// Concrete implementation of OrderService.
pub struct OrderManager {
    manager: Arc<dyn TransactionManager>,
}

impl OrderManager {
    pub fn new(manager: Arc<dyn TransactionManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl OrderService for OrderManager {
    async fn get_order(&self, id: i64) -> AppResult<Order> {
        self.manager.orders().find_by_id(id).await?.ok_or_not_found()
    }
}
