//! Order repository backed by the SeaORM entity API.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder,
    Set,
};
use std::sync::Arc;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use super::entities::order::{self, ActiveModel, Entity as OrderEntity};
use crate::domain::{Order, OrderDraft};
use crate::errors::AppResult;

/// Persistence operations for orders.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert a new order. The returned order echoes the draft's line items.
    async fn create(&self, draft: OrderDraft) -> AppResult<Order>;

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Order>>;

    /// Orders owned by an account, oldest first.
    async fn list_by_account(&self, account_id: i64) -> AppResult<Vec<Order>>;
}

/// Entity-API order repository over any SeaORM connection.
pub struct OrderStore<C> {
    conn: Arc<C>,
}

impl<C> OrderStore<C> {
    pub fn new(conn: Arc<C>) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl<C> OrderRepository for OrderStore<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn create(&self, draft: OrderDraft) -> AppResult<Order> {
        let active_model = ActiveModel {
            id: NotSet,
            account_id: Set(draft.account_id),
            amount: Set(draft.amount),
            status: Set(draft.status.to_string()),
            created_at: NotSet,
        };

        let model = active_model.insert(self.conn.as_ref()).await?;

        let mut created = Order::from(model);
        created.items = draft.items;
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Order>> {
        let result = OrderEntity::find_by_id(id)
            .one(self.conn.as_ref())
            .await?;

        Ok(result.map(Order::from))
    }

    async fn list_by_account(&self, account_id: i64) -> AppResult<Vec<Order>> {
        let models = OrderEntity::find()
            .filter(order::Column::AccountId.eq(account_id))
            .order_by_asc(order::Column::Id)
            .all(self.conn.as_ref())
            .await?;

        Ok(models.into_iter().map(Order::from).collect())
    }
}
