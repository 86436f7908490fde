//! Repositories that issue hand-written SQL through the SeaORM connection.
//!
//! Selected with `REPOSITORY_BACKEND=sql`. They satisfy the same traits as
//! the entity-API stores and take part in the same transactions. Statements
//! use PostgreSQL placeholders.

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, FromQueryResult, Statement, Value};
use std::sync::Arc;

use super::entities::{account, order};
use super::{AccountRepository, OrderRepository};
use crate::domain::{Account, AccountChanges, AccountDraft, Order, OrderDraft};
use crate::errors::{AppError, AppResult};

const ACCOUNT_COLUMNS: &str = "id, name, email, password_hash, role, created_at";
const ORDER_COLUMNS: &str = "id, account_id, amount, status, created_at";

fn statement<C: ConnectionTrait>(
    conn: &C,
    sql: impl Into<String>,
    values: Vec<Value>,
) -> Statement {
    Statement::from_sql_and_values(conn.get_database_backend(), sql, values)
}

/// Raw-SQL account repository.
pub struct SqlAccountStore<C> {
    conn: Arc<C>,
}

impl<C> SqlAccountStore<C> {
    pub fn new(conn: Arc<C>) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl<C> AccountRepository for SqlAccountStore<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn create(&self, draft: AccountDraft) -> AppResult<Account> {
        let conn = self.conn.as_ref();
        let stmt = statement(
            conn,
            format!(
                "INSERT INTO account (name, email, password_hash, role) \
                 VALUES ($1, $2, $3, $4) RETURNING {}",
                ACCOUNT_COLUMNS
            ),
            vec![
                draft.name.into(),
                draft.email.into(),
                draft.password_hash.into(),
                draft.role.to_string().into(),
            ],
        );

        account::Model::find_by_statement(stmt)
            .one(conn)
            .await?
            .map(Account::from)
            .ok_or_else(|| AppError::internal("INSERT ... RETURNING produced no row"))
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Account>> {
        let conn = self.conn.as_ref();
        let stmt = statement(
            conn,
            format!("SELECT {} FROM account WHERE id = $1", ACCOUNT_COLUMNS),
            vec![id.into()],
        );

        let row = account::Model::find_by_statement(stmt).one(conn).await?;
        Ok(row.map(Account::from))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let conn = self.conn.as_ref();
        let stmt = statement(
            conn,
            format!("SELECT {} FROM account WHERE email = $1", ACCOUNT_COLUMNS),
            vec![email.into()],
        );

        let row = account::Model::find_by_statement(stmt).one(conn).await?;
        Ok(row.map(Account::from))
    }

    async fn update(&self, id: i64, changes: AccountChanges) -> AppResult<Account> {
        let conn = self.conn.as_ref();
        // Absent fields bind NULL and keep the stored value
        let stmt = statement(
            conn,
            format!(
                "UPDATE account SET \
                 name = COALESCE($1, name), \
                 email = COALESCE($2, email), \
                 password_hash = COALESCE($3, password_hash), \
                 role = COALESCE($4, role) \
                 WHERE id = $5 RETURNING {}",
                ACCOUNT_COLUMNS
            ),
            vec![
                changes.name.into(),
                changes.email.into(),
                changes.password_hash.into(),
                changes.role.map(|r| r.to_string()).into(),
                id.into(),
            ],
        );

        account::Model::find_by_statement(stmt)
            .one(conn)
            .await?
            .map(Account::from)
            .ok_or(AppError::NotFound)
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let conn = self.conn.as_ref();
        let stmt = statement(conn, "DELETE FROM account WHERE id = $1", vec![id.into()]);

        let result = conn.execute(stmt).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }

        Ok(())
    }
}

/// Raw-SQL order repository.
pub struct SqlOrderStore<C> {
    conn: Arc<C>,
}

impl<C> SqlOrderStore<C> {
    pub fn new(conn: Arc<C>) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl<C> OrderRepository for SqlOrderStore<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn create(&self, draft: OrderDraft) -> AppResult<Order> {
        let conn = self.conn.as_ref();
        let stmt = statement(
            conn,
            format!(
                "INSERT INTO \"order\" (account_id, amount, status) \
                 VALUES ($1, $2, $3) RETURNING {}",
                ORDER_COLUMNS
            ),
            vec![
                draft.account_id.into(),
                draft.amount.into(),
                draft.status.to_string().into(),
            ],
        );

        let mut created = order::Model::find_by_statement(stmt)
            .one(conn)
            .await?
            .map(Order::from)
            .ok_or_else(|| AppError::internal("INSERT ... RETURNING produced no row"))?;

        created.items = draft.items;
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Order>> {
        let conn = self.conn.as_ref();
        let stmt = statement(
            conn,
            format!("SELECT {} FROM \"order\" WHERE id = $1", ORDER_COLUMNS),
            vec![id.into()],
        );

        let row = order::Model::find_by_statement(stmt).one(conn).await?;
        Ok(row.map(Order::from))
    }

    async fn list_by_account(&self, account_id: i64) -> AppResult<Vec<Order>> {
        let conn = self.conn.as_ref();
        let stmt = statement(
            conn,
            format!(
                "SELECT {} FROM \"order\" WHERE account_id = $1 ORDER BY id",
                ORDER_COLUMNS
            ),
            vec![account_id.into()],
        );

        let rows = order::Model::find_by_statement(stmt).all(conn).await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }
}
