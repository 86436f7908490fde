//! Unit of Work pattern implementation.
//!
//! A [`UnitOfWork`] is one transactional scope: every repository reached
//! through it sees the same transaction, and the scope ends exactly once,
//! either committed or rolled back. [`run_in_transaction`] is the usual way
//! in: it opens a scope, runs the closure, and finalizes the scope according
//! to the closure's result, all under a single deadline.
//!
//! Backends plug in through two seams:
//! - [`TransactionManager`] hands out autocommit repositories and opens scopes
//! - [`ScopedTransaction`] is one open transaction with its bound repositories

use async_trait::async_trait;
use sea_orm::{
    AccessMode, ConnectionTrait, DatabaseConnection, DatabaseTransaction, IsolationLevel,
    TransactionTrait,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

use super::repositories::{
    AccountRepository, AccountStore, OrderRepository, OrderStore, SqlAccountStore, SqlOrderStore,
};
use crate::config::RepositoryBackend;
use crate::errors::{AppError, AppResult};

/// Source of repositories and transactional scopes.
#[async_trait]
pub trait TransactionManager: Send + Sync {
    /// Account repository outside any scope (each call autocommits).
    fn accounts(&self) -> Arc<dyn AccountRepository>;

    /// Order repository outside any scope (each call autocommits).
    fn orders(&self) -> Arc<dyn OrderRepository>;

    /// Open a new read-committed, read-write scope.
    ///
    /// Fails with `Connection` when the store cannot be reached.
    async fn begin(&self) -> AppResult<UnitOfWork>;
}

/// One open backend transaction and the repositories bound to it.
#[async_trait]
pub trait ScopedTransaction: Send + Sync {
    fn accounts(&self) -> &dyn AccountRepository;

    fn orders(&self) -> &dyn OrderRepository;

    async fn commit(self: Box<Self>) -> AppResult<()>;

    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// Lifecycle of a [`UnitOfWork`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    Active,
    Committed,
    RolledBack,
    /// A commit was attempted and did not complete; nothing was applied.
    Aborted,
}

/// Scope handle with a single-finalization guarantee.
pub struct UnitOfWork {
    backend: Option<Box<dyn ScopedTransaction>>,
    state: ScopeState,
}

impl UnitOfWork {
    pub fn new(backend: Box<dyn ScopedTransaction>) -> Self {
        Self {
            backend: Some(backend),
            state: ScopeState::Active,
        }
    }

    pub fn state(&self) -> ScopeState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ScopeState::Active
    }

    fn backend(&self) -> AppResult<&dyn ScopedTransaction> {
        match (&self.backend, self.state) {
            (Some(backend), ScopeState::Active) => Ok(backend.as_ref()),
            (_, state) => Err(AppError::invalid_state(format!(
                "unit of work is {:?}, repositories are no longer available",
                state
            ))),
        }
    }

    /// Account repository bound to this scope.
    pub fn accounts(&self) -> AppResult<&dyn AccountRepository> {
        Ok(self.backend()?.accounts())
    }

    /// Order repository bound to this scope.
    pub fn orders(&self) -> AppResult<&dyn OrderRepository> {
        Ok(self.backend()?.orders())
    }

    /// Make every write of this scope durable.
    ///
    /// A scope can be committed once. If the commit itself fails, or the
    /// future is dropped mid-commit, the scope ends as `Aborted` and none of
    /// its writes are applied.
    pub async fn commit(&mut self) -> AppResult<()> {
        if self.state != ScopeState::Active {
            return Err(AppError::invalid_state(format!(
                "cannot commit a unit of work that is {:?}",
                self.state
            )));
        }

        let backend = self
            .backend
            .take()
            .ok_or_else(|| AppError::invalid_state("unit of work has no open transaction"))?;
        self.state = ScopeState::Aborted;

        backend.commit().await?;
        self.state = ScopeState::Committed;
        Ok(())
    }

    /// Discard every write of this scope.
    ///
    /// Rolling back an already rolled back or aborted scope is a no-op.
    /// Rolling back a committed scope is an error.
    pub async fn rollback(&mut self) -> AppResult<()> {
        match self.state {
            ScopeState::RolledBack | ScopeState::Aborted => Ok(()),
            ScopeState::Committed => Err(AppError::invalid_state(
                "cannot roll back a committed unit of work",
            )),
            ScopeState::Active => {
                self.state = ScopeState::RolledBack;
                match self.backend.take() {
                    Some(backend) => backend.rollback().await,
                    None => Ok(()),
                }
            }
        }
    }
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("state", &self.state)
            .finish()
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        // Dropping the backend discards the transaction
        if self.state == ScopeState::Active && self.backend.is_some() {
            tracing::warn!("Unit of work dropped while active, rolling back");
        }
    }
}

/// Boxed future returned by the closure given to [`run_in_transaction`].
pub type ScopeFuture<'s, T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send + 's>>;

/// Run `work` inside a fresh scope.
///
/// Commits when `work` succeeds and returns its value. Rolls back and returns
/// the error when `work` fails. The whole call (begin, work, commit) must
/// finish within `timeout`, otherwise the scope is rolled back and
/// `AppError::Timeout` is returned.
pub async fn run_in_transaction<T, F>(
    manager: &dyn TransactionManager,
    timeout: Duration,
    work: F,
) -> AppResult<T>
where
    F: for<'s> FnOnce(&'s UnitOfWork) -> ScopeFuture<'s, T> + Send,
    T: Send,
{
    let deadline = Instant::now() + timeout;

    let mut uow = match timeout_at(deadline, manager.begin()).await {
        Ok(scope) => scope?,
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Timed out opening transaction");
            return Err(AppError::Timeout);
        }
    };

    let outcome = match timeout_at(deadline, work(&uow)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Transaction deadline exceeded");
            Err(AppError::Timeout)
        }
    };

    match outcome {
        Ok(value) => match timeout_at(deadline, uow.commit()).await {
            Ok(Ok(())) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!("Transaction commit failed: {}", e);
                Err(e)
            }
            Err(_) => {
                tracing::warn!("Transaction deadline exceeded during commit");
                Err(AppError::Timeout)
            }
        },
        Err(e) => {
            if let Err(rollback_err) = uow.rollback().await {
                tracing::error!("Transaction rollback failed: {}", rollback_err);
            }
            Err(e)
        }
    }
}

/// Build the repository pair for a connection according to the configured backend.
fn repositories_for<C>(
    conn: Arc<C>,
    backend: RepositoryBackend,
) -> (Box<dyn AccountRepository>, Box<dyn OrderRepository>)
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    match backend {
        RepositoryBackend::Orm => (
            Box::new(AccountStore::new(conn.clone())),
            Box::new(OrderStore::new(conn)),
        ),
        RepositoryBackend::Sql => (
            Box::new(SqlAccountStore::new(conn.clone())),
            Box::new(SqlOrderStore::new(conn)),
        ),
    }
}

/// SeaORM-backed transaction manager.
pub struct Persistence {
    db: Arc<DatabaseConnection>,
    backend: RepositoryBackend,
    accounts: Arc<dyn AccountRepository>,
    orders: Arc<dyn OrderRepository>,
}

impl Persistence {
    pub fn new(db: Arc<DatabaseConnection>, backend: RepositoryBackend) -> Self {
        let (accounts, orders) = repositories_for(db.clone(), backend);

        Self {
            db,
            backend,
            accounts: Arc::from(accounts),
            orders: Arc::from(orders),
        }
    }
}

#[async_trait]
impl TransactionManager for Persistence {
    fn accounts(&self) -> Arc<dyn AccountRepository> {
        self.accounts.clone()
    }

    fn orders(&self) -> Arc<dyn OrderRepository> {
        self.orders.clone()
    }

    async fn begin(&self) -> AppResult<UnitOfWork> {
        let txn = self
            .db
            .begin_with_config(
                Some(IsolationLevel::ReadCommitted),
                Some(AccessMode::ReadWrite),
            )
            .await
            .map_err(|e| {
                tracing::error!("Failed to begin transaction: {}", e);
                AppError::connection(e.to_string())
            })?;

        let txn = Arc::new(txn);
        let (accounts, orders) = repositories_for(txn.clone(), self.backend);

        Ok(UnitOfWork::new(Box::new(SeaOrmScope {
            txn,
            accounts,
            orders,
        })))
    }
}

/// An open SeaORM transaction shared by the scope's repositories.
struct SeaOrmScope {
    txn: Arc<DatabaseTransaction>,
    accounts: Box<dyn AccountRepository>,
    orders: Box<dyn OrderRepository>,
}

impl SeaOrmScope {
    /// Release the repositories and take sole ownership of the transaction.
    fn into_transaction(self) -> AppResult<DatabaseTransaction> {
        let SeaOrmScope {
            txn,
            accounts,
            orders,
        } = self;
        drop(accounts);
        drop(orders);

        Arc::try_unwrap(txn)
            .map_err(|_| AppError::invalid_state("transaction is still shared with a repository"))
    }
}

#[async_trait]
impl ScopedTransaction for SeaOrmScope {
    fn accounts(&self) -> &dyn AccountRepository {
        self.accounts.as_ref()
    }

    fn orders(&self) -> &dyn OrderRepository {
        self.orders.as_ref()
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let txn = (*self).into_transaction()?;
        txn.commit().await.map_err(AppError::from_commit)
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        let txn = (*self).into_transaction()?;
        txn.rollback().await.map_err(AppError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Account, AccountDraft, Order, OrderDraft, OrderStatus, Role};
    use crate::infra::repositories::entities::{account, order};
    use crate::infra::repositories::{MockAccountRepository, MockOrderRepository};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Calls {
        commits: AtomicUsize,
        rollbacks: AtomicUsize,
    }

    struct RecordingScope {
        calls: Arc<Calls>,
        fail_commit: bool,
        accounts: MockAccountRepository,
        orders: MockOrderRepository,
    }

    #[async_trait]
    impl ScopedTransaction for RecordingScope {
        fn accounts(&self) -> &dyn AccountRepository {
            &self.accounts
        }

        fn orders(&self) -> &dyn OrderRepository {
            &self.orders
        }

        async fn commit(self: Box<Self>) -> AppResult<()> {
            self.calls.commits.fetch_add(1, Ordering::SeqCst);
            if self.fail_commit {
                return Err(AppError::conflict("serialization failure"));
            }
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> AppResult<()> {
            self.calls.rollbacks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn scope(fail_commit: bool) -> (UnitOfWork, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let uow = UnitOfWork::new(Box::new(RecordingScope {
            calls: calls.clone(),
            fail_commit,
            accounts: MockAccountRepository::new(),
            orders: MockOrderRepository::new(),
        }));
        (uow, calls)
    }

    #[tokio::test]
    async fn test_commit_happens_once() {
        let (mut uow, calls) = scope(false);

        uow.commit().await.unwrap();
        assert_eq!(uow.state(), ScopeState::Committed);

        let second = uow.commit().await;
        assert!(matches!(second, Err(AppError::InvalidState(_))));
        assert!(matches!(uow.rollback().await, Err(AppError::InvalidState(_))));
        assert_eq!(calls.commits.load(Ordering::SeqCst), 1);
        assert_eq!(calls.rollbacks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rollback_is_idempotent() {
        let (mut uow, calls) = scope(false);

        uow.rollback().await.unwrap();
        uow.rollback().await.unwrap();

        assert_eq!(uow.state(), ScopeState::RolledBack);
        assert_eq!(calls.rollbacks.load(Ordering::SeqCst), 1);
        assert!(matches!(uow.commit().await, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_failed_commit_aborts_scope() {
        let (mut uow, calls) = scope(true);

        assert!(matches!(uow.commit().await, Err(AppError::Conflict(_))));
        assert_eq!(uow.state(), ScopeState::Aborted);

        // Nothing left to undo
        uow.rollback().await.unwrap();
        assert_eq!(calls.rollbacks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_repositories_unavailable_after_finalize() {
        let (mut uow, _calls) = scope(false);
        assert!(uow.accounts().is_ok());
        assert!(uow.is_active());

        uow.rollback().await.unwrap();
        assert!(matches!(uow.accounts(), Err(AppError::InvalidState(_))));
        assert!(matches!(uow.orders(), Err(AppError::InvalidState(_))));
    }

    fn account_row() -> account::Model {
        account::Model {
            id: 1,
            name: "Ann".to_string(),
            email: "ann@x.io".to_string(),
            password_hash: "hash".to_string(),
            role: "member".to_string(),
            created_at: Utc::now(),
        }
    }

    fn order_row() -> order::Model {
        order::Model {
            id: 10,
            account_id: 1,
            amount: Decimal::new(4250, 2),
            status: "pending".to_string(),
            created_at: Utc::now(),
        }
    }

    async fn register(persistence: &Persistence) -> AppResult<(Account, Order)> {
        run_in_transaction(persistence, Duration::from_secs(3), |uow| {
            Box::pin(async move {
                let account = uow
                    .accounts()?
                    .create(AccountDraft {
                        name: "Ann".to_string(),
                        email: "ann@x.io".to_string(),
                        password_hash: "hash".to_string(),
                        role: Role::Member,
                    })
                    .await?;
                let order = uow
                    .orders()?
                    .create(OrderDraft {
                        account_id: account.id,
                        amount: Decimal::new(4250, 2),
                        status: OrderStatus::Pending,
                        items: vec![],
                    })
                    .await?;
                Ok::<_, AppError>((account, order))
            })
        })
        .await
    }

    /// SQL text of every statement the mock connection saw, one list per transaction.
    fn statement_log(db: Arc<DatabaseConnection>) -> Vec<Vec<String>> {
        let db = Arc::into_inner(db).expect("connection still shared");
        db.into_transaction_log()
            .iter()
            .map(|txn| txn.statements().iter().map(|s| s.sql.clone()).collect())
            .collect()
    }

    async fn assert_registration_shares_one_transaction(backend: RepositoryBackend) {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[account_row()]])
                .append_query_results([[order_row()]])
                .into_connection(),
        );
        let persistence = Persistence::new(db.clone(), backend);

        let (account, order) = register(&persistence).await.unwrap();
        assert_eq!(order.account_id, account.id);
        assert_eq!(order.amount, Decimal::new(4250, 2));

        drop(persistence);
        let log = statement_log(db);
        assert_eq!(log.len(), 1, "{:?}", log);

        let sql = &log[0];
        assert_eq!(sql.len(), 4, "{:?}", sql);
        assert_eq!(sql[0], "BEGIN");
        assert!(sql[1].starts_with("INSERT INTO") && sql[1].contains("account"));
        assert!(sql[2].starts_with("INSERT INTO \"order\""));
        assert_eq!(sql[3], "COMMIT");
    }

    #[tokio::test]
    async fn test_orm_backend_registers_inside_one_transaction() {
        assert_registration_shares_one_transaction(RepositoryBackend::Orm).await;
    }

    #[tokio::test]
    async fn test_sql_backend_registers_inside_one_transaction() {
        assert_registration_shares_one_transaction(RepositoryBackend::Sql).await;
    }

    #[tokio::test]
    async fn test_failed_order_insert_rolls_back_transaction() {
        for backend in [RepositoryBackend::Orm, RepositoryBackend::Sql] {
            let db = Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[account_row()]])
                    .append_query_errors([DbErr::Custom("order insert failed".to_string())])
                    .into_connection(),
            );
            let persistence = Persistence::new(db.clone(), backend);

            let result = register(&persistence).await;
            assert!(matches!(result, Err(AppError::Database(_))));

            drop(persistence);
            let log = statement_log(db);
            assert_eq!(log.len(), 1);
            let sql = &log[0];
            assert_eq!(sql.first().map(String::as_str), Some("BEGIN"));
            assert_eq!(sql.last().map(String::as_str), Some("ROLLBACK"));
            assert!(!sql.iter().any(|s| s == "COMMIT"));
        }
    }

    #[tokio::test]
    async fn test_unscoped_reads_autocommit() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[account_row()]])
                .into_connection(),
        );
        let persistence = Persistence::new(db.clone(), RepositoryBackend::Sql);

        let found = persistence.accounts().find_by_email("ann@x.io").await.unwrap();
        assert_eq!(found.map(|a| a.id), Some(1));

        drop(persistence);
        let log = statement_log(db);
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].len(), 1);
        assert!(log[0][0].starts_with("SELECT"));
    }
}
