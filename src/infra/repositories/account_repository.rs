//! Account repository backed by the SeaORM entity API.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, Set,
};
use std::sync::Arc;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use super::entities::account::{self, ActiveModel, Entity as AccountEntity};
use crate::domain::{Account, AccountChanges, AccountDraft};
use crate::errors::{AppError, AppResult};

/// Persistence operations for accounts.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert a new account; the store assigns id and creation time.
    async fn create(&self, draft: AccountDraft) -> AppResult<Account>;

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Account>>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>>;

    /// Apply the present fields of `changes`. Fails with `NotFound` for an unknown id.
    async fn update(&self, id: i64, changes: AccountChanges) -> AppResult<Account>;

    /// Remove the account. Fails with `NotFound` for an unknown id.
    async fn delete(&self, id: i64) -> AppResult<()>;
}

/// Entity-API account repository over any SeaORM connection.
pub struct AccountStore<C> {
    conn: Arc<C>,
}

impl<C> AccountStore<C> {
    pub fn new(conn: Arc<C>) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl<C> AccountRepository for AccountStore<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn create(&self, draft: AccountDraft) -> AppResult<Account> {
        let active_model = ActiveModel {
            id: NotSet,
            name: Set(draft.name),
            email: Set(draft.email),
            password_hash: Set(draft.password_hash),
            role: Set(draft.role.to_string()),
            created_at: NotSet,
        };

        let model = active_model.insert(self.conn.as_ref()).await?;
        Ok(Account::from(model))
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Account>> {
        let result = AccountEntity::find_by_id(id)
            .one(self.conn.as_ref())
            .await?;

        Ok(result.map(Account::from))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let result = AccountEntity::find()
            .filter(account::Column::Email.eq(email))
            .one(self.conn.as_ref())
            .await?;

        Ok(result.map(Account::from))
    }

    async fn update(&self, id: i64, changes: AccountChanges) -> AppResult<Account> {
        let existing = AccountEntity::find_by_id(id)
            .one(self.conn.as_ref())
            .await?
            .ok_or(AppError::NotFound)?;

        if changes.is_empty() {
            return Ok(Account::from(existing));
        }

        let mut active: ActiveModel = existing.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(email) = changes.email {
            active.email = Set(email);
        }
        if let Some(hash) = changes.password_hash {
            active.password_hash = Set(hash);
        }
        if let Some(role) = changes.role {
            active.role = Set(role.to_string());
        }

        let model = active.update(self.conn.as_ref()).await?;
        Ok(Account::from(model))
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let result = AccountEntity::delete_by_id(id)
            .exec(self.conn.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }

        Ok(())
    }
}
