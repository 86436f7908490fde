//! Account service - profile reads and writes, and atomic registration
//! of an account together with its first order.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::container::parallel;
use super::validation::{validate_new_account, validate_update};
use crate::domain::{
    Account, AccountChanges, AccountDraft, AccountWithOrders, NewAccount, NewOrder, Order,
    Password, Role, UpdateAccount,
};
use crate::errors::{AppError, AppResult};
use crate::infra::{run_in_transaction, CacheAside, CacheLookup, TransactionManager};

/// Result of registering an account with its first order.
#[derive(Debug, Clone)]
pub struct Registration {
    pub account: Account,
    pub order: Order,
}

/// Account service trait for dependency injection.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Get account by id, served from the cache when possible
    async fn get_account(&self, id: i64) -> AppResult<CacheLookup<Account>>;

    /// Get account and its orders, read concurrently
    async fn get_account_with_orders(&self, id: i64) -> AppResult<AccountWithOrders>;

    async fn update_account(&self, id: i64, input: UpdateAccount) -> AppResult<Account>;

    async fn delete_account(&self, id: i64) -> AppResult<()>;

    /// Create an account and its first order in one transaction.
    ///
    /// Either both rows become durable or neither does.
    async fn register_with_order(
        &self,
        account: NewAccount,
        order: NewOrder,
    ) -> AppResult<Registration>;
}

/// Concrete implementation of AccountService.
pub struct AccountManager {
    manager: Arc<dyn TransactionManager>,
    cache: Arc<CacheAside>,
    scope_timeout: Duration,
}

impl AccountManager {
    pub fn new(
        manager: Arc<dyn TransactionManager>,
        cache: Arc<CacheAside>,
        scope_timeout: Duration,
    ) -> Self {
        Self {
            manager,
            cache,
            scope_timeout,
        }
    }
}

#[async_trait]
impl AccountService for AccountManager {
    async fn get_account(&self, id: i64) -> AppResult<CacheLookup<Account>> {
        let accounts = self.manager.accounts();
        self.cache.get_account(accounts.as_ref(), id).await
    }

    async fn get_account_with_orders(&self, id: i64) -> AppResult<AccountWithOrders> {
        let orders = self.manager.orders();
        let (lookup, orders) =
            parallel::join2(self.get_account(id), orders.list_by_account(id)).await?;

        Ok(AccountWithOrders {
            account: lookup.value,
            orders,
        })
    }

    async fn update_account(&self, id: i64, input: UpdateAccount) -> AppResult<Account> {
        validate_update(&input)?;

        let password_hash = match &input.password {
            Some(plain) => Some(Password::new(plain)?.into_string()),
            None => None,
        };
        let changes = AccountChanges {
            name: input.name,
            email: input.email,
            password_hash,
            role: input.role,
        };

        let account = self.manager.accounts().update(id, changes).await?;
        self.cache.invalidate_account(id).await;

        tracing::info!(account_id = id, "Account updated");
        Ok(account)
    }

    async fn delete_account(&self, id: i64) -> AppResult<()> {
        self.manager.accounts().delete(id).await?;
        self.cache.invalidate_account(id).await;

        tracing::info!(account_id = id, "Account deleted");
        Ok(())
    }

    async fn register_with_order(
        &self,
        account: NewAccount,
        order: NewOrder,
    ) -> AppResult<Registration> {
        validate_new_account(&account)?;
        order.validate()?;

        let draft = AccountDraft {
            name: account.name,
            email: account.email,
            password_hash: Password::new(&account.password)?.into_string(),
            role: Role::Member,
        };

        let registration = run_in_transaction(self.manager.as_ref(), self.scope_timeout, |uow| {
            Box::pin(async move {
                let account = uow.accounts()?.create(draft).await?;
                let order = uow.orders()?.create(order.for_account(account.id)).await?;
                Ok::<_, AppError>(Registration { account, order })
            })
        })
        .await?;

        tracing::info!(
            account_id = registration.account.id,
            order_id = registration.order.id,
            "Account registered with order"
        );
        Ok(registration)
    }
}
